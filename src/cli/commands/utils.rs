use anyhow::{Context, Result};

use crate::{
    error::BackupError,
    provider::{Provider, SpotifyProvider},
    state::{credentials, Config},
};

/// Client id and secret of the registered Spotify application.
pub fn client_credentials() -> Result<(String, String)> {
    let client_id =
        std::env::var("SPOTIFY_CLIENT_ID").context("Set SPOTIFY_CLIENT_ID environment variable")?;
    let client_secret = std::env::var("SPOTIFY_CLIENT_SECRET")
        .context("Set SPOTIFY_CLIENT_SECRET environment variable")?;
    Ok((client_id, client_secret))
}

/// Build a provider from the cached token. Missing secrets or credentials
/// are authentication failures.
pub fn create_provider(config: &Config) -> Result<Box<dyn Provider>, BackupError> {
    build_provider(config, client_credentials)
}

fn build_provider(
    config: &Config,
    secrets: impl FnOnce() -> Result<(String, String)>,
) -> Result<Box<dyn Provider>, BackupError> {
    let path = config.credentials_path();
    let token = credentials::load(&path)
        .and_then(|token| {
            token.context("No credentials found. Please run 'spotify-backup auth' first.")
        })
        .map_err(BackupError::Authentication)?;

    let (client_id, client_secret) = secrets().map_err(BackupError::Authentication)?;

    Ok(Box::new(
        SpotifyProvider::new(client_id, client_secret).with_token(&token, &path),
    ))
}
