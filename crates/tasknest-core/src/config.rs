//! Configuration model.
//!
//! Loaded from `config.toml` by the infrastructure `ConfigService`. Every
//! field has a default so a partial file is always readable.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TasknestError};

pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_SECURE_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com/v1";
pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    pub firebase: FirebaseConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for the Firebase project backing identity and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub identity_endpoint: String,
    pub secure_token_endpoint: String,
    pub firestore_endpoint: String,
    /// Where verification and password reset links send the user afterwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_url: Option<String>,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            project_id: String::new(),
            identity_endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            secure_token_endpoint: DEFAULT_SECURE_TOKEN_ENDPOINT.to_string(),
            firestore_endpoint: DEFAULT_FIRESTORE_ENDPOINT.to_string(),
            continue_url: None,
        }
    }
}

impl FirebaseConfig {
    /// Fails unless the fields needed to reach the project are set.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(TasknestError::config("firebase.api_key is not set"));
        }
        if self.project_id.trim().is_empty() {
            return Err(TasknestError::config("firebase.project_id is not set"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the directory holding local snapshots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
