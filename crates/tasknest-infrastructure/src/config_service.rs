//! Configuration service implementation.
//!
//! Loads the root configuration from `config.toml` under the tasknest config
//! directory, writing a default file on first use. Environment variables
//! override the Firebase credentials from the file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tasknest_core::config::RootConfig;
use tasknest_core::error::Result;

use crate::paths::TasknestPaths;
use crate::storage::AtomicFile;

pub const ENV_API_KEY: &str = "TASKNEST_FIREBASE_API_KEY";
pub const ENV_PROJECT_ID: &str = "TASKNEST_FIREBASE_PROJECT_ID";

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: TasknestPaths,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Creates a service rooted at `base_dir`, or at the platform config
    /// directory when `None`.
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            paths: TasknestPaths::new(base_dir),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn paths(&self) -> &TasknestPaths {
        &self.paths
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        self.paths.config_file()
    }

    /// Gets the root configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<RootConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = read_lock.as_ref() {
                return Ok(cached.clone());
            }
        }

        let mut loaded = self.load_config()?;
        apply_env_overrides(&mut loaded, |name| std::env::var(name).ok());

        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(loaded.clone());

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    /// Resolves the snapshot directory, honoring `storage.state_dir`.
    pub fn state_dir(&self) -> Result<PathBuf> {
        match self.get_config()?.storage.state_dir {
            Some(dir) => Ok(dir),
            None => self.paths.state_dir(),
        }
    }

    fn load_config(&self) -> Result<RootConfig> {
        let file = AtomicFile::<RootConfig>::toml(self.config_path()?);

        match file.load()? {
            Some(config) => Ok(config),
            None => {
                let default_config = RootConfig::default();
                file.save(&default_config)?;
                tracing::info!("Created default config at {:?}", file.path());
                Ok(default_config)
            }
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new(None)
    }
}

fn apply_env_overrides(config: &mut RootConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(api_key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
        config.firebase.api_key = api_key;
    }
    if let Some(project_id) = lookup(ENV_PROJECT_ID).filter(|v| !v.trim().is_empty()) {
        config.firebase.project_id = project_id;
    }
}
