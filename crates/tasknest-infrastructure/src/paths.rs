//! Unified path management for tasknest files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/tasknest/          # Config directory (platform specific)
//! ├── config.toml              # Application configuration
//! └── state/                   # Local store snapshots
//!     ├── auth-storage.json
//!     ├── task-storage.json
//!     └── identity-credentials.json
//! ```

use std::path::{Path, PathBuf};

use tasknest_core::error::{Result, TasknestError};

const APP_DIR_NAME: &str = "tasknest";

/// Resolves every tasknest path from a single base directory.
///
/// Without an explicit base, the platform config directory is used
/// (`~/.config/tasknest` on Linux, `~/Library/Application Support/tasknest`
/// on macOS, `%APPDATA%\tasknest` on Windows).
#[derive(Debug, Clone)]
pub struct TasknestPaths {
    base_dir: Option<PathBuf>,
}

impl TasknestPaths {
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            base_dir: base_dir.map(Path::to_path_buf),
        }
    }

    /// Returns the tasknest configuration directory.
    pub fn config_dir(&self) -> Result<PathBuf> {
        match &self.base_dir {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or_else(|| TasknestError::config("Cannot find config directory")),
        }
    }

    /// Returns the path to `config.toml`.
    pub fn config_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the directory holding store snapshots.
    pub fn state_dir(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("state"))
    }
}

impl Default for TasknestPaths {
    fn default() -> Self {
        Self::new(None)
    }
}
