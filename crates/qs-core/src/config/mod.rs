//! Application settings
//!
//! Read once at bootstrap from a JSON file. Every field is optional; missing
//! fields take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::query::CodecConfig;

/// Errors raised while loading settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Root settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Show the one-time development mode notice
    pub dev_mode: bool,

    /// Query-string codec
    pub codec: CodecConfig,

    /// List screen defaults
    pub table: TableSettings,

    /// Session store
    pub session: SessionSettings,
}

/// Defaults for paginated, sortable lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub default_page_size: u32,

    /// Column sorted descending when the URL names no sort
    pub default_sort_field: String,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            default_sort_field: "createdAt".to_string(),
        }
    }
}

/// Session store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Maximum number of recently viewed products kept
    pub recently_viewed_limit: usize,

    /// Directory for persisted session data; in-memory when unset
    pub storage_dir: Option<PathBuf>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            recently_viewed_limit: 20,
            storage_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path` when given and present, defaults otherwise.
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::load_from(path),
            Some(path) => {
                info!(path = %path.display(), "settings file not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}
