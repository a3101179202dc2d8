pub mod category;
pub mod collector;
mod fingerprint;
pub mod persister;

use std::path::Path;

pub use category::{Category, OwnerFilter, Source};
pub use collector::Collector;
pub use fingerprint::{fingerprint, FingerprintIndex};
pub use persister::WriteOutcome;

use tracing::{debug, error, info, warn};

use crate::error::BackupError;

/// What happened to one category during a run.
#[derive(Debug)]
pub enum CategoryOutcome {
    Written,
    Unchanged,
    Failed(BackupError),
}

impl CategoryOutcome {
    pub fn label(&self) -> String {
        match self {
            CategoryOutcome::Written => "written".to_string(),
            CategoryOutcome::Unchanged => "unchanged".to_string(),
            CategoryOutcome::Failed(e) => format!("failed: {}", e),
        }
    }
}

/// Collect one category and write it to `path`, merging with the previous
/// backup for playlists.
pub async fn backup_category(
    collector: &Collector<'_>,
    category: &Category,
    path: &Path,
) -> Result<WriteOutcome, BackupError> {
    let prior = persister::read_prior(path);

    let known = match (&prior, category.is_playlist()) {
        (Some(entries), true) => FingerprintIndex::from_entries(entries),
        _ => FingerprintIndex::default(),
    };
    if !known.is_empty() {
        debug!(category = %category, playlists = known.len(), "Loaded stored fingerprints");
    }

    let fresh = collector.collect(category, &known).await?;
    persister::persist(category, path, fresh, prior.as_deref())
}

/// Back up every category in order. A failing category is logged and
/// recorded and the remaining categories still run, except after an
/// authentication failure, which ends the run.
pub async fn run(
    collector: &Collector<'_>,
    categories: &[Category],
    backup_dir: &Path,
) -> Vec<(Category, CategoryOutcome)> {
    let mut outcomes = Vec::with_capacity(categories.len());

    for category in categories {
        let path = backup_dir.join(category.file_name());
        let outcome = match backup_category(collector, category, &path).await {
            Ok(WriteOutcome::Written) => {
                info!(category = %category, path = ?path, "Backup written");
                CategoryOutcome::Written
            }
            Ok(WriteOutcome::Unchanged) => {
                info!(category = %category, "Backup unchanged");
                CategoryOutcome::Unchanged
            }
            Err(e) => {
                error!(category = %category, "{}", e);
                CategoryOutcome::Failed(e)
            }
        };
        let abort = matches!(outcome, CategoryOutcome::Failed(BackupError::Authentication(_)));
        outcomes.push((*category, outcome));

        if abort {
            warn!("Stopping backup, no usable access token");
            break;
        }
    }

    outcomes
}
