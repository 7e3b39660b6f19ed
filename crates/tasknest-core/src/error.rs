//! Error types for tasknest.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for every tasknest crate.
///
/// Remote failures collapse into two kinds: `Identity` for anything coming
/// back from the identity service and `Storage` for anything coming back from
/// the document store. The remaining variants cover local concerns
/// (configuration, files, validation of user input).
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TasknestError {
    /// Identity boundary failure (bad credentials, unknown account, weak
    /// password, invalid verification code, missing remote session, ...).
    #[error("{message}")]
    Identity { code: String, message: String },

    /// Document store failure (write failure, not-found on update/delete).
    #[error("Storage error: {0}")]
    Storage(String),

    /// A task draft or update broke one of the task field rules.
    #[error("{message}")]
    Validation { field: String, message: String },

    /// The operation needs an authenticated session and there is none.
    #[error("No user logged in")]
    NotAuthenticated,

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TasknestError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an Identity error from a service code and a readable message.
    pub fn identity(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Identity {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates a Validation error for the given field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this error came from the identity boundary
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity { .. } | Self::NotAuthenticated)
    }

    /// Check if this error came from the document store boundary
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns the identity service code, if this is an identity error.
    pub fn identity_code(&self) -> Option<&str> {
        match self {
            Self::Identity { code, .. } => Some(code),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for TasknestError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for TasknestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TasknestError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for TasknestError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, TasknestError>`.
pub type Result<T> = std::result::Result<T, TasknestError>;
