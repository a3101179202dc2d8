use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<u64>,
    pub token_type: String,
    pub scope: Option<String>,
}

/// One unit of a paginated listing: the items plus the URL of the next page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub next: Option<String>,
}

impl Page {
    /// Parse a page from a raw response. `wrapper` names the key the paging
    /// object sits under, for endpoints like `/me/following` that nest it.
    pub fn from_response(response: Value, wrapper: Option<&str>) -> anyhow::Result<Page> {
        let body = match wrapper {
            Some(key) => response
                .get(key)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Response has no '{}' object", key))?,
            None => response,
        };

        Ok(serde_json::from_value(body)?)
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some() && !self.items.is_empty()
    }
}

/// Typed accessors for the handful of fields the backup logic reads out of
/// otherwise opaque API records.
pub trait RecordExt {
    fn id(&self) -> Option<&str>;
    fn owner_id(&self) -> Option<&str>;
    fn snapshot_id(&self) -> Option<&str>;
}

impl RecordExt for Value {
    fn id(&self) -> Option<&str> {
        self.get("id").and_then(Value::as_str)
    }

    fn owner_id(&self) -> Option<&str> {
        self.get("owner")
            .and_then(|owner| owner.get("id"))
            .and_then(Value::as_str)
    }

    fn snapshot_id(&self) -> Option<&str> {
        self.get("snapshot_id").and_then(Value::as_str)
    }
}
