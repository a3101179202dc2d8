use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backup::{fingerprint, Category};
use crate::error::BackupError;
use crate::provider::RecordExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Read a previous backup. A missing file is `Ok(None)`; anything that is
/// not a JSON array is an error.
pub fn load_existing(path: &Path) -> Result<Option<Vec<Value>>> {
    if !path.exists() {
        return Ok(None);
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read backup {:?}", path))?;
    let items = serde_json::from_str(&content)
        .with_context(|| format!("Backup {:?} is not a JSON array", path))?;

    Ok(Some(items))
}

/// Like [`load_existing`], but an unreadable backup is logged and treated as
/// absent so that it gets overwritten.
pub fn read_prior(path: &Path) -> Option<Vec<Value>> {
    match load_existing(path) {
        Ok(items) => items,
        Err(e) => {
            warn!("Ignoring previous backup: {:#}", e);
            None
        }
    }
}

/// Merge freshly collected playlists with the stored ones.
///
/// Output order follows `fresh`. A playlist whose id and fingerprint match a
/// stored entry keeps the stored entry verbatim; new or changed playlists use
/// the fresh entry; stored playlists missing from `fresh` are dropped.
pub fn merge_playlists(fresh: Vec<Value>, prior: &[Value]) -> Vec<Value> {
    let stored: HashMap<&str, &Value> = prior
        .iter()
        .filter_map(|entry| Some((entry.id()?, entry)))
        .collect();

    fresh
        .into_iter()
        .map(|entry| {
            let kept = entry
                .id()
                .and_then(|id| stored.get(id))
                .filter(|old| {
                    let current = fingerprint(&entry);
                    current.is_some() && fingerprint(old) == current
                });

            match kept {
                Some(old) => (*old).clone(),
                None => entry,
            }
        })
        .collect()
}

pub fn render(items: &[Value]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(items).context("Failed to serialize backup")?;
    json.push('\n');
    Ok(json)
}

/// Replace `path` with `contents` via a temporary file in the same directory,
/// so an interrupted write never leaves a truncated backup behind.
pub fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {:?}", dir))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".spotify-backup")
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;

    tmp.write_all(contents.as_bytes())
        .context("Failed to write temporary file")?;
    tmp.as_file()
        .sync_all()
        .context("Failed to flush temporary file")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {:?}", path))?;

    Ok(())
}

/// Write `items` to `path` unless the file already holds exactly that content.
pub fn write_if_changed(path: &Path, items: &[Value]) -> Result<WriteOutcome> {
    let rendered = render(items)?;

    if let Ok(existing) = fs::read_to_string(path) {
        if existing == rendered {
            debug!(path = ?path, "Backup unchanged");
            return Ok(WriteOutcome::Unchanged);
        }
    }

    atomic_write(path, &rendered)?;
    Ok(WriteOutcome::Written)
}

/// Merge (for playlists) and write one category's backup.
pub fn persist(
    category: &Category,
    path: &Path,
    fresh: Vec<Value>,
    prior: Option<&[Value]>,
) -> Result<WriteOutcome, BackupError> {
    let items = if category.is_playlist() {
        merge_playlists(fresh, prior.unwrap_or_default())
    } else {
        fresh
    };

    write_if_changed(path, &items).map_err(|e| BackupError::persist(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::category::TimeRange;
    use serde_json::json;
    use tempfile::TempDir;

    fn mtime(path: &Path) -> std::time::SystemTime {
        fs::metadata(path).unwrap().modified().unwrap()
    }

    fn stored(path: &Path) -> Vec<Value> {
        load_existing(path).unwrap().unwrap()
    }

    #[test]
    fn test_merge_keeps_unchanged_entry_verbatim() {
        let prior = vec![json!({
            "id": "p1",
            "snapshot_id": "v1",
            "name": "Road trip",
            "tracks": {"items": [{"track": {"id": "t1"}}, {"track": {"id": "t2"}}]}
        })];
        let fresh = vec![json!({
            "id": "p1",
            "snapshot_id": "v1",
            "name": "Road trip",
            "followers": {"total": 12},
            "tracks": {"items": [{"track": {"id": "t2"}}, {"track": {"id": "t1"}}]}
        })];

        assert_eq!(merge_playlists(fresh, &prior), prior);
    }

    #[test]
    fn test_merge_takes_changed_and_new_entries() {
        let prior = vec![json!({"id": "p1", "snapshot_id": "v1", "name": "old"})];
        let fresh = vec![
            json!({"id": "p1", "snapshot_id": "v2", "name": "new"}),
            json!({"id": "p3", "snapshot_id": "v1"}),
        ];

        assert_eq!(merge_playlists(fresh.clone(), &prior), fresh);
    }

    #[test]
    fn test_merge_drops_removed_playlists() {
        let prior = vec![
            json!({"id": "p1", "snapshot_id": "v1"}),
            json!({"id": "p2", "snapshot_id": "v1"}),
        ];
        let fresh = vec![json!({"id": "p1", "snapshot_id": "v1"})];

        assert_eq!(
            merge_playlists(fresh, &prior),
            vec![json!({"id": "p1", "snapshot_id": "v1"})]
        );
    }

    #[test]
    fn test_merge_follows_fresh_order() {
        let prior = vec![
            json!({"id": "p1", "snapshot_id": "v1"}),
            json!({"id": "p2", "snapshot_id": "v1"}),
        ];
        let fresh = vec![
            json!({"id": "p2", "snapshot_id": "v1"}),
            json!({"id": "p1", "snapshot_id": "v1"}),
        ];

        let ids: Vec<String> = merge_playlists(fresh, &prior)
            .iter()
            .filter_map(|p| p.id().map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["p2", "p1"]);
    }

    #[test]
    fn test_end_to_end_removed_playlist_rewrites_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("playlists.json");

        let prior = vec![
            json!({"id": "p1", "snapshot": "v1", "snapshot_id": "v1"}),
            json!({"id": "p2", "snapshot": "v1", "snapshot_id": "v1"}),
        ];
        atomic_write(&path, &render(&prior).unwrap()).unwrap();

        let fresh = vec![json!({"id": "p1", "snapshot": "v1", "snapshot_id": "v1"})];
        let existing = read_prior(&path);
        let outcome = persist(
            &Category::CreatedPlaylists,
            &path,
            fresh.clone(),
            existing.as_deref(),
        )
        .unwrap();

        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(stored(&path), fresh);
    }

    #[test]
    fn test_idempotent_write_for_playlists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("playlists.json");
        let fresh = vec![json!({"id": "p1", "snapshot_id": "v1", "tracks": {"items": []}})];

        let first = persist(&Category::CreatedPlaylists, &path, fresh.clone(), None).unwrap();
        assert_eq!(first, WriteOutcome::Written);
        let written_at = mtime(&path);

        let existing = read_prior(&path);
        let second = persist(
            &Category::CreatedPlaylists,
            &path,
            fresh,
            existing.as_deref(),
        )
        .unwrap();
        assert_eq!(second, WriteOutcome::Unchanged);
        assert_eq!(mtime(&path), written_at);
    }

    #[test]
    fn test_idempotent_write_for_snapshots() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("saved_tracks.json");
        let fresh = vec![json!({"added_at": "2024-01-01T00:00:00Z", "track": {"id": "t1"}})];

        assert_eq!(
            persist(&Category::SavedTracks, &path, fresh.clone(), None).unwrap(),
            WriteOutcome::Written
        );
        let written_at = mtime(&path);

        assert_eq!(
            persist(&Category::SavedTracks, &path, fresh, None).unwrap(),
            WriteOutcome::Unchanged
        );
        assert_eq!(mtime(&path), written_at);
    }

    #[test]
    fn test_snapshot_categories_are_replaced_wholesale() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("top_artists_long_term.json");
        let prior = vec![json!({"id": "a1"}), json!({"id": "a2"})];
        atomic_write(&path, &render(&prior).unwrap()).unwrap();

        let fresh = vec![json!({"id": "a2"})];
        let outcome = persist(
            &Category::TopArtists(TimeRange::LongTerm),
            &path,
            fresh.clone(),
            Some(prior.as_slice()),
        )
        .unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(stored(&path), fresh);
    }

    #[test]
    fn test_empty_collection_writes_empty_array() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("saved_shows.json");

        let outcome = persist(&Category::SavedShows, &path, Vec::new(), None).unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]\n");
    }

    #[test]
    fn test_corrupt_prior_is_ignored_and_overwritten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("playlists.json");
        fs::write(&path, "{\"truncated\": ").unwrap();

        assert!(load_existing(&path).is_err());
        assert!(read_prior(&path).is_none());

        let fresh = vec![json!({"id": "p1", "snapshot_id": "v1"})];
        let outcome = persist(&Category::CreatedPlaylists, &path, fresh.clone(), None).unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(stored(&path), fresh);
    }

    #[test]
    fn test_atomic_write_creates_directories_and_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("backup").join("saved_albums.json");

        atomic_write(&path, "[]\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]\n");

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_failure_is_a_persist_error() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("readonly");
        fs::create_dir(&dir).unwrap();
        let path = dir.join("saved_tracks.json");
        fs::write(&path, "[]\n").unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();

        // root ignores directory permissions
        let probe = dir.join("probe");
        if fs::write(&probe, "").is_ok() {
            let _ = fs::remove_file(&probe);
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = persist(&Category::SavedTracks, &path, vec![json!({"id": "t1"})], None);
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(BackupError::Persist { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]\n");
    }
}
