//! Result shape handed back to the presentation layer.

use serde::Serialize;
use tasknest_core::error::{Result, TasknestError};

/// `{ success, data?, error? }` for one user action.
///
/// Failures are reported once and dropped; nothing retries them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Identity error code, when the failure came from the identity service.
    #[serde(skip)]
    pub code: Option<String>,
}

impl<T> ActionOutcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn failed(err: &TasknestError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            code: err.identity_code().map(str::to_string),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Drops the payload, keeping success and error.
    pub fn discard(self) -> ActionOutcome<()> {
        ActionOutcome {
            success: self.success,
            data: self.success.then_some(()),
            error: self.error,
            code: self.code,
        }
    }
}

impl<T> From<Result<T>> for ActionOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failed(&err),
        }
    }
}
