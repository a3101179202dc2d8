use crate::provider::OAuthToken;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn save(path: &Path, token: &OAuthToken) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create credentials dir {:?}", parent))?;
    }

    let json = serde_json::to_string_pretty(token).context("Failed to serialize token")?;

    fs::write(path, json).with_context(|| format!("Failed to write credentials to {:?}", path))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

pub fn load(path: &Path) -> Result<Option<OAuthToken>> {
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read credentials from {:?}", path))?;

    let token = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse credentials in {:?}", path))?;

    Ok(Some(token))
}

pub fn delete(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to delete credentials {:?}", path))?;
    }

    Ok(())
}
