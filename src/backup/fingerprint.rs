use std::collections::HashMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::provider::RecordExt;

/// Cheap-to-compare marker for a playlist's content version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    /// Spotify's `snapshot_id`, which changes whenever the playlist changes.
    Snapshot(String),
    /// SHA-256 of the entry's `tracks` value, for entries without a snapshot id.
    Digest(String),
}

pub fn fingerprint(entry: &Value) -> Option<Fingerprint> {
    if let Some(snapshot_id) = entry.snapshot_id() {
        return Some(Fingerprint::Snapshot(snapshot_id.to_string()));
    }

    let tracks = entry.get("tracks")?;
    let canonical = serde_json::to_string(tracks).ok()?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hex = hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();

    Some(Fingerprint::Digest(hex))
}

/// Fingerprints of previously stored playlists, keyed by playlist id.
#[derive(Debug, Clone, Default)]
pub struct FingerprintIndex {
    entries: HashMap<String, Fingerprint>,
}

impl FingerprintIndex {
    pub fn from_entries(entries: &[Value]) -> Self {
        let entries = entries
            .iter()
            .filter_map(|entry| Some((entry.id()?.to_string(), fingerprint(entry)?)))
            .collect();
        Self { entries }
    }

    /// True when `entry` has the same identity and fingerprint as a stored one.
    pub fn is_unchanged(&self, entry: &Value) -> bool {
        match (entry.id(), fingerprint(entry)) {
            (Some(id), Some(current)) => self.entries.get(id) == Some(&current),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_id_is_preferred() {
        let entry = json!({"id": "p1", "snapshot_id": "v1", "tracks": {"items": []}});
        assert_eq!(
            fingerprint(&entry),
            Some(Fingerprint::Snapshot("v1".to_string()))
        );
    }

    #[test]
    fn test_digest_fallback_is_deterministic() {
        let a = json!({"id": "p1", "tracks": {"items": [{"track": {"id": "t1"}}]}});
        let b = json!({"name": "renamed", "id": "p1", "tracks": {"items": [{"track": {"id": "t1"}}]}});
        let c = json!({"id": "p1", "tracks": {"items": [{"track": {"id": "t2"}}]}});

        let fa = fingerprint(&a).unwrap();
        assert!(matches!(&fa, Fingerprint::Digest(hex) if hex.len() == 64));
        assert_eq!(fa, fingerprint(&b).unwrap());
        assert_ne!(fa, fingerprint(&c).unwrap());
    }

    #[test]
    fn test_no_fingerprint_without_snapshot_or_tracks() {
        assert_eq!(fingerprint(&json!({"id": "p1"})), None);
    }

    #[test]
    fn test_index_detects_unchanged_entries() {
        let stored = vec![
            json!({"id": "p1", "snapshot_id": "v1"}),
            json!({"id": "p2", "snapshot_id": "v7"}),
            json!({"snapshot_id": "orphan"}),
        ];
        let index = FingerprintIndex::from_entries(&stored);
        assert_eq!(index.len(), 2);

        assert!(index.is_unchanged(&json!({"id": "p1", "snapshot_id": "v1", "name": "new name"})));
        assert!(!index.is_unchanged(&json!({"id": "p2", "snapshot_id": "v8"})));
        assert!(!index.is_unchanged(&json!({"id": "p3", "snapshot_id": "v1"})));
        assert!(!index.is_unchanged(&json!({"id": "p1"})));
    }
}
