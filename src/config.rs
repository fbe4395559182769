//! Configuration loading.
//!
//! Looks for `queryable.toml` under the user config dir (`~/.config/qail/`
//! on Linux). `QAIL_DATABASE_URL` overrides the file's `database_url`.
//!
//! ```toml
//! database_url = "postgres://localhost/app"
//! log_args = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

pub const DATABASE_URL_ENV: &str = "QAIL_DATABASE_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Connection URL (`postgres://...`, `sqlite://...`, `sqlite::memory:`).
    #[serde(default)]
    pub database_url: Option<String>,

    /// Include bound arguments in statement logs.
    #[serde(default)]
    pub log_args: bool,
}

impl Config {
    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qail").join("queryable.toml"))
    }

    pub fn from_toml_str(content: &str) -> QueryResult<Self> {
        toml::from_str(content).map_err(|e| QueryError::Config(e.to_string()))
    }

    pub fn from_path(path: &Path) -> QueryResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// File at [`Config::default_path`] if present, then the env override.
    pub fn load() -> QueryResult<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_path(&path)?,
            _ => Self::default(),
        };
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            config.database_url = Some(url);
        }
        Ok(config)
    }

    pub fn require_database_url(&self) -> QueryResult<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            QueryError::Config(format!(
                "no database_url configured. Set it in queryable.toml or via {}",
                DATABASE_URL_ENV
            ))
        })
    }
}
