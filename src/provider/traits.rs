use crate::provider::OAuthToken;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Provider: Send + Sync {
    /// GET an API resource. `url` is either a path relative to the API base
    /// (`/me/tracks?limit=50`) or an absolute `next` URL from a previous page.
    async fn get_json(&self, url: &str) -> anyhow::Result<Value>;

    /// Id of the authenticated user
    async fn current_user_id(&self) -> anyhow::Result<String>;

    // OAuth
    /// Generate OAuth authorization URL
    fn oauth_url(&self, redirect_uri: &str, state: &str) -> String;

    /// Exchange authorization code for tokens
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> anyhow::Result<OAuthToken>;

    /// Refresh an expired token
    async fn refresh_token(&self, token: &OAuthToken) -> anyhow::Result<OAuthToken>;
}
