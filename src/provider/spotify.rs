use crate::error::TokenError;
use crate::provider::{OAuthToken, Provider};
use crate::state::credentials;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

pub const SCOPES: [&str; 5] = [
    "playlist-read-private",
    "playlist-read-collaborative",
    "user-library-read",
    "user-top-read",
    "user-follow-read",
];

const MAX_ATTEMPTS: u32 = 5;
const MAX_RETRY_AFTER_SECS: u64 = 120;

pub struct SpotifyProvider {
    client_id: String,
    client_secret: String,
    token: Mutex<Option<OAuthToken>>,
    credentials_path: Option<PathBuf>,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct SpotifyTokenResponse {
    access_token: String,
    token_type: String,
    expires_in: u64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

impl SpotifyTokenResponse {
    fn into_oauth_token(self) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Some(now_secs() + self.expires_in),
            token_type: self.token_type,
            scope: self.scope,
        }
    }
}

#[derive(Deserialize)]
struct SpotifyError {
    error: SpotifyErrorDetails,
}

#[derive(Deserialize)]
struct SpotifyErrorDetails {
    message: String,
}

/// Parse Spotify API error response into a clean message
fn parse_spotify_error(text: &str) -> String {
    match serde_json::from_str::<SpotifyError>(text) {
        Ok(err) => err.error.message,
        Err(_) => text.trim().to_string(),
    }
}

fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Relative API paths are resolved against the API base; `next` links
/// returned by the API are already absolute.
fn resolve_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("{}{}", API_BASE, url)
    }
}

/// Seconds to wait before retrying a rate-limited request.
fn retry_after_secs(header: Option<&str>) -> u64 {
    header
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(1)
        .min(MAX_RETRY_AFTER_SECS)
}

pub fn is_token_expired(token: &OAuthToken) -> bool {
    match token.expires_at {
        Some(expires_at) => now_secs() >= expires_at.saturating_sub(60),
        None => false,
    }
}

impl SpotifyProvider {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            token: Mutex::new(None),
            credentials_path: None,
            http: reqwest::Client::new(),
        }
    }

    /// Attach a cached token. Refreshed tokens are written back to
    /// `credentials_path`.
    pub fn with_token(mut self, token: &OAuthToken, credentials_path: &Path) -> Self {
        self.token = Mutex::new(Some(token.clone()));
        self.credentials_path = Some(credentials_path.to_path_buf());
        self
    }

    fn basic_auth_header(&self) -> String {
        use base64::Engine;
        let credentials = format!("{}:{}", self.client_id, self.client_secret);
        base64::engine::general_purpose::STANDARD.encode(credentials)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<SpotifyTokenResponse> {
        let response = self
            .http
            .post(TOKEN_URL)
            .header("Authorization", format!("Basic {}", self.basic_auth_header()))
            .form(params)
            .send()
            .await
            .context("Failed to send token request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Token request failed: {}", error_text);
        }

        response
            .json()
            .await
            .context("Failed to parse token response")
    }

    /// Get access token, refreshing if expired
    async fn get_token(&self) -> Result<String> {
        let current_token = self
            .token
            .lock()
            .await
            .clone()
            .ok_or_else(|| TokenError(anyhow::anyhow!("Not authenticated with Spotify")))?;

        if !is_token_expired(&current_token) {
            return Ok(current_token.access_token);
        }

        debug!("Access token expired, refreshing");
        let new_token = self
            .refresh_token(&current_token)
            .await
            .map_err(|e| TokenError(e.context("Failed to refresh access token")))?;

        if let Some(path) = &self.credentials_path {
            credentials::save(path, &new_token)?;
        }

        let access_token = new_token.access_token.clone();
        *self.token.lock().await = Some(new_token);
        Ok(access_token)
    }
}

#[async_trait]
impl Provider for SpotifyProvider {
    async fn get_json(&self, url: &str) -> Result<Value> {
        let url = resolve_url(url);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let token = self.get_token().await?;

            debug!(url = %url, attempt, "GET");
            let response = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .send()
                .await
                .with_context(|| format!("Failed to send request to {}", url))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json()
                    .await
                    .with_context(|| format!("Failed to parse response from {}", url));
            }

            if attempt < MAX_ATTEMPTS {
                if status == StatusCode::TOO_MANY_REQUESTS {
                    let header = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok());
                    let delay = retry_after_secs(header);
                    warn!(delay, "Rate limited by Spotify, retrying");
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    continue;
                }

                if matches!(
                    status,
                    StatusCode::INTERNAL_SERVER_ERROR
                        | StatusCode::BAD_GATEWAY
                        | StatusCode::SERVICE_UNAVAILABLE
                ) {
                    let delay = 1u64 << (attempt - 1);
                    warn!(%status, delay, "Spotify server error, retrying");
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    continue;
                }
            }

            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Spotify API error {} for {}: {}",
                status,
                url,
                parse_spotify_error(&error_text)
            );
        }
    }

    async fn current_user_id(&self) -> Result<String> {
        let me = self.get_json("/me").await?;
        me.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .context("Profile response has no user id")
    }

    fn oauth_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
            AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&SCOPES.join(" ")),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthToken> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        self.token_request(&params)
            .await
            .map(|r| r.into_oauth_token())
    }

    async fn refresh_token(&self, token: &OAuthToken) -> Result<OAuthToken> {
        let refresh = token
            .refresh_token
            .as_ref()
            .context("No refresh token available")?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh.as_str()),
        ];

        let mut new_token = self.token_request(&params).await?.into_oauth_token();

        // Spotify doesn't always return a new refresh_token
        if new_token.refresh_token.is_none() {
            new_token.refresh_token = token.refresh_token.clone();
        }

        Ok(new_token)
    }
}
