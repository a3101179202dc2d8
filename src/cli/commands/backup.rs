use anyhow::Result;
use tracing::{info, warn};

use crate::backup::{self, Category, CategoryOutcome, Collector};
use crate::cli::commands::utils::create_provider;
use crate::error::BackupError;
use crate::provider::Provider;
use crate::state::{Config, RunEntry};

/// Back up every selected category. Returns `Ok(false)` when at least one
/// category failed; authentication failures abort before anything runs.
pub async fn run(config: &Config) -> Result<bool> {
    let categories = config.selected_categories()?;
    let provider = create_provider(config)?;
    run_with(provider.as_ref(), config, &categories).await
}

pub async fn run_with(
    provider: &dyn Provider,
    config: &Config,
    categories: &[Category],
) -> Result<bool> {
    let user_id = provider
        .current_user_id()
        .await
        .map_err(BackupError::Authentication)?;
    info!(user = %user_id, categories = categories.len(), "Starting backup");

    let collector = Collector::new(provider, user_id, config.page_limit());
    let outcomes = backup::run(&collector, categories, &config.backup_dir).await;

    print_summary(&outcomes);

    let entry = RunEntry::from_outcomes(&outcomes);
    if let Err(e) = RunEntry::append(&config.journal_path(), &entry) {
        warn!("Failed to record run in journal: {:#}", e);
    }

    Ok(entry.succeeded())
}

fn print_summary(outcomes: &[(Category, CategoryOutcome)]) {
    let width = outcomes
        .iter()
        .map(|(category, _)| category.name().len())
        .max()
        .unwrap_or(0);

    for (category, outcome) in outcomes {
        println!("{:<width$}  {}", category.name(), outcome.label(), width = width);
    }
}
