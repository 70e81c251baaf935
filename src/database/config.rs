//! Database Configuration
//!
//! Where collection files live and how they are formatted.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable naming the data directory
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable toggling indented output
pub const PRETTY_ENV: &str = "DOCSTORE_PRETTY";

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding one file per collection (default: "./data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Write indented JSON (default: true)
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_pretty() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            pretty: default_pretty(),
        }
    }
}

impl DatabaseConfig {
    /// Create a config rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Read `DATA_DIR` and `DOCSTORE_PRETTY`, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup(PRETTY_ENV) {
            config.pretty = !matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
        config
    }

    /// Compact output
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    /// File backing the named collection
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
