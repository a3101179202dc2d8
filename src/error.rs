use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    /// Credentials missing, invalid, or the refresh failed. Aborts the run.
    #[error("authentication failed: {0:#}")]
    Authentication(anyhow::Error),

    /// A category's paginated retrieval failed. Only that category is skipped.
    #[error("failed to fetch {category}: {source:#}")]
    Fetch {
        category: String,
        source: anyhow::Error,
    },

    /// The category's output file could not be written; it keeps its previous content.
    #[error("failed to write {path:?}: {source:#}")]
    Persist {
        path: PathBuf,
        source: anyhow::Error,
    },
}

/// No usable access token: none cached, or the refresh was rejected.
#[derive(Debug, Error)]
#[error("{0:#}")]
pub struct TokenError(pub anyhow::Error);

impl TokenError {
    /// True when `err` or anything in its context chain is a `TokenError`.
    pub fn caused(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| cause.is::<TokenError>())
    }
}

impl BackupError {
    /// Classify a collection failure. Token failures abort the run, anything
    /// else only fails `category`.
    pub fn from_collect(category: impl ToString, source: anyhow::Error) -> Self {
        if TokenError::caused(&source) {
            BackupError::Authentication(source)
        } else {
            BackupError::fetch(category, source)
        }
    }

    pub fn fetch(category: impl ToString, source: anyhow::Error) -> Self {
        BackupError::Fetch {
            category: category.to_string(),
            source,
        }
    }

    pub fn persist(path: impl Into<PathBuf>, source: anyhow::Error) -> Self {
        BackupError::Persist {
            path: path.into(),
            source,
        }
    }
}
