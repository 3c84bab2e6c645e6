//! Store location configuration.
//!
//! # Responsibility
//! - Resolve the SQLite file location from one external setting.
//! - Prepare the default location on first run.
//!
//! # Invariants
//! - A blank setting behaves like an unset one.
//! - The resolved store path is absolute.
//! - Preparing an existing store file never truncates it.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable selecting the store file.
pub const DB_PATH_ENV: &str = "TODO_DB_PATH";

const APP_DIR_NAME: &str = "todo-app";
const DB_FILE_NAME: &str = "tasks.db";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug)]
pub enum ConfigError {
    CreateDir { path: PathBuf, source: io::Error },
    CreateFile { path: PathBuf, source: io::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateDir { path, source } => {
                write!(f, "failed to create store directory `{}`: {source}", path.display())
            }
            Self::CreateFile { path, source } => {
                write!(f, "failed to create store file `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } | Self::CreateFile { source, .. } => Some(source),
        }
    }
}

/// Where the task store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    db_path: PathBuf,
}

impl StoreConfig {
    /// Relative paths are resolved against the current directory.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: absolutize(db_path.into()),
        }
    }

    /// Reads [`DB_PATH_ENV`], falling back to [`StoreConfig::default_db_path`].
    pub fn from_env() -> Self {
        Self::from_setting(std::env::var(DB_PATH_ENV).ok().as_deref())
    }

    pub fn from_setting(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if !value.is_empty() => Self::new(value),
            _ => Self::new(Self::default_db_path()),
        }
    }

    /// `<user cache dir>/todo-app/tasks.db`, or the temp dir when the
    /// platform reports no cache dir.
    pub fn default_db_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR_NAME)
            .join(DB_FILE_NAME)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Log directory next to the store file.
    pub fn default_log_dir(&self) -> PathBuf {
        self.db_path
            .parent()
            .map_or_else(std::env::temp_dir, Path::to_path_buf)
            .join(LOG_DIR_NAME)
    }

    /// Creates the parent directory and an empty store file when missing.
    pub fn ensure_store_file(&self) -> Result<&Path, ConfigError> {
        if let Some(parent) = self.db_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.db_path)
            .map_err(|source| ConfigError::CreateFile {
                path: self.db_path.clone(),
                source,
            })?;

        Ok(&self.db_path)
    }
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&path))
        .unwrap_or(path)
}
