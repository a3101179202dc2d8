use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::backup::Category;

pub const APP_DIR: &str = "spotify-backup";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
pub const MAX_PAGE_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory receiving one JSON file per category
    pub backup_dir: PathBuf,
    /// Directory holding the credential cache and the run journal
    pub state_dir: PathBuf,
    pub redirect_uri: String,
    pub page_limit: u32,
    /// Category names to back up; all categories when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from("backup"),
            state_dir: default_state_dir(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            page_limit: MAX_PAGE_LIMIT,
            categories: None,
        }
    }
}

/// `$XDG_CONFIG_HOME/spotify-backup` on Linux, the platform config dir elsewhere.
pub fn default_state_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML from {:?}", path))
    }

    /// Load the explicitly given config file, or the default one if present,
    /// or fall back to defaults.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let path = default_state_dir().join("config.toml");
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.state_dir.join("token.json")
    }

    pub fn journal_path(&self) -> PathBuf {
        self.state_dir.join("journal.log")
    }

    pub fn category_path(&self, category: &Category) -> PathBuf {
        self.backup_dir.join(category.file_name())
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit.clamp(1, MAX_PAGE_LIMIT)
    }

    /// Categories selected for this run, in the order first named. Repeated
    /// names are backed up once.
    pub fn selected_categories(&self) -> anyhow::Result<Vec<Category>> {
        let Some(names) = &self.categories else {
            return Ok(Category::all());
        };

        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let category = name.parse::<Category>()?;
            if !selected.contains(&category) {
                selected.push(category);
            }
        }
        Ok(selected)
    }
}
