use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backup::{Category, CategoryOutcome};

/// One line of the run journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEntry {
    pub timestamp: DateTime<Utc>,
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_categories: Vec<String>,
}

impl RunEntry {
    pub fn from_outcomes(outcomes: &[(Category, CategoryOutcome)]) -> Self {
        let mut entry = RunEntry {
            timestamp: Utc::now(),
            written: 0,
            unchanged: 0,
            failed: 0,
            failed_categories: Vec::new(),
        };

        for (category, outcome) in outcomes {
            match outcome {
                CategoryOutcome::Written => entry.written += 1,
                CategoryOutcome::Unchanged => entry.unchanged += 1,
                CategoryOutcome::Failed(_) => {
                    entry.failed += 1;
                    entry.failed_categories.push(category.name());
                }
            }
        }

        entry
    }

    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn append(path: &Path, entry: &RunEntry) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open journal {:?}", path))?;

        let line = serde_json::to_string(entry).context("Failed to serialize journal entry")?;

        writeln!(file, "{}", line).context("Failed to write to journal")
    }

    pub fn read_all(path: &Path) -> anyhow::Result<Vec<RunEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read journal {:?}", path))?;

        content
            .lines()
            .filter(|ln| !ln.trim().is_empty())
            .map(|ln| {
                serde_json::from_str(ln)
                    .with_context(|| format!("Failed to parse journal line: {}", ln))
            })
            .collect()
    }
}
