use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::TokenError;
use crate::provider::{OAuthToken, Provider};

/// In-memory provider serving canned responses keyed by request URL.
#[derive(Default)]
pub struct FakeProvider {
    user_id: String,
    routes: HashMap<String, Value>,
    token_failures: HashSet<String>,
    user_lookup_fails: bool,
    requests: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Self::default()
        }
    }

    pub fn route(&mut self, url: &str, response: Value) -> &mut Self {
        self.routes.insert(url.to_string(), response);
        self
    }

    /// Requests to `url` fail as if the access token could not be refreshed.
    pub fn fail_auth_on(&mut self, url: &str) -> &mut Self {
        self.token_failures.insert(url.to_string());
        self
    }

    pub fn fail_user_lookup(&mut self) -> &mut Self {
        self.user_lookup_fails = true;
        self
    }

    /// Serve `items` as a chain of pages of `page_size` starting at `first_url`.
    /// `wrapper` nests each paging object under that key.
    pub fn paged(
        &mut self,
        first_url: &str,
        items: &[Value],
        page_size: usize,
        wrapper: Option<&str>,
    ) -> &mut Self {
        let page_url = |index: usize| {
            if index == 0 {
                first_url.to_string()
            } else {
                format!("https://api.test/next?from={}&page={}", first_url, index)
            }
        };

        let chunks: Vec<&[Value]> = if items.is_empty() {
            vec![items]
        } else {
            items.chunks(page_size).collect()
        };

        for (index, chunk) in chunks.iter().enumerate() {
            let next = if index + 1 < chunks.len() {
                Value::String(page_url(index + 1))
            } else {
                Value::Null
            };
            let page = json!({
                "items": chunk,
                "next": next,
                "total": items.len(),
            });
            let response = match wrapper {
                Some(key) => {
                    let mut wrapped = serde_json::Map::new();
                    wrapped.insert(key.to_string(), page);
                    Value::Object(wrapped)
                }
                None => page,
            };
            self.routes.insert(page_url(index), response);
        }
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn get_json(&self, url: &str) -> Result<Value> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        if self.token_failures.contains(url) {
            return Err(TokenError(anyhow::anyhow!("Refresh token revoked")).into());
        }
        self.routes
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Spotify API error 404 Not Found for {}", url))
    }

    async fn current_user_id(&self) -> Result<String> {
        if self.user_lookup_fails {
            anyhow::bail!("Spotify API error 401 Unauthorized for /me: Invalid access token");
        }
        Ok(self.user_id.clone())
    }

    fn oauth_url(&self, redirect_uri: &str, state: &str) -> String {
        format!("https://auth.test/?redirect_uri={}&state={}", redirect_uri, state)
    }

    async fn exchange_code(&self, _code: &str, _redirect_uri: &str) -> Result<OAuthToken> {
        anyhow::bail!("FakeProvider does not exchange codes")
    }

    async fn refresh_token(&self, _token: &OAuthToken) -> Result<OAuthToken> {
        anyhow::bail!("FakeProvider does not refresh tokens")
    }
}
