//! Database location and connection bootstrap.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use serde::Deserialize;
use tracing::info;

use crate::error::{HelperError, Result};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Where the database lives.
///
/// ```toml
/// path = "/var/lib/app"
/// filename = "app.db"
/// busy_timeout_ms = 2000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DbConfig {
    /// Directory holding the database file. Created on open.
    pub path: PathBuf,
    pub filename: String,
    /// How long SQLite itself waits on a locked file before reporting busy.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filename: filename.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn database_file(&self) -> PathBuf {
        self.path.join(&self.filename)
    }
}

/// Creates the database directory if needed and opens the file.
pub fn open_connection(config: &DbConfig) -> Result<Connection> {
    ensure_dir(&config.path)?;
    let file = config.database_file();
    let open_err = |source| HelperError::Open {
        path: file.clone(),
        source,
    };
    let connection = Connection::open(&file).map_err(open_err)?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(open_err)?;
    info!(path = %file.display(), "opened database");
    Ok(connection)
}

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| HelperError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
