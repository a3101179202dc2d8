use anyhow::Result;

use crate::backup::Category;
use crate::state::{Config, RunEntry};

pub async fn log(config: &Config) -> Result<()> {
    let entries = RunEntry::read_all(&config.journal_path())?;

    if entries.is_empty() {
        println!("No backup runs recorded yet.");
        return Ok(());
    }

    for entry in entries.iter().rev() {
        println!(
            "{}  written: {}  unchanged: {}  failed: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            entry.written,
            entry.unchanged,
            entry.failed
        );
        if !entry.failed_categories.is_empty() {
            println!("    failed: {}", entry.failed_categories.join(", "));
        }
    }

    Ok(())
}

pub async fn categories(config: &Config) -> Result<()> {
    let selected = config.selected_categories()?;

    for category in Category::all() {
        let marker = if selected.contains(&category) { "*" } else { " " };
        println!(
            "{} {:<26} {}",
            marker,
            category.name(),
            config.category_path(&category).display()
        );
    }

    Ok(())
}
