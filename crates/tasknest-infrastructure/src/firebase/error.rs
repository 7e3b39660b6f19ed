//! Mapping of Firebase REST error bodies onto [`TasknestError`].

use reqwest::StatusCode;
use serde::Deserialize;
use tasknest_core::error::TasknestError;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn error_message(body: &str) -> Option<(String, Option<String>)> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| (envelope.error.message, envelope.error.status))
}

/// Builds an identity error from an Identity Toolkit / Secure Token response.
///
/// The service reports errors as `{"error": {"message": "CODE"}}`, sometimes
/// with a detail suffix (`"WEAK_PASSWORD : Password should be ..."`).
pub(crate) fn identity_error(status: StatusCode, body: &str) -> TasknestError {
    let raw = error_message(body)
        .map(|(message, _)| message)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    let (code, detail) = match raw.split_once(" : ") {
        Some((code, detail)) => (code.trim().to_string(), Some(detail.trim().to_string())),
        None => (raw.trim().to_string(), None),
    };

    let message = friendly_identity_message(&code)
        .map(str::to_string)
        .or(detail)
        .unwrap_or_else(|| code.replace('_', " ").to_lowercase());

    TasknestError::identity(code, message)
}

/// Builds an identity error for a known service error code.
pub(crate) fn identity_code_error(code: &str) -> TasknestError {
    let message = friendly_identity_message(code)
        .map(str::to_string)
        .unwrap_or_else(|| code.replace('_', " ").to_lowercase());
    TasknestError::identity(code, message)
}

fn friendly_identity_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "EMAIL_EXISTS" => "An account with this email already exists",
        "INVALID_EMAIL" => "The email address is badly formatted",
        "WEAK_PASSWORD" => "Password should be at least 6 characters",
        "MISSING_PASSWORD" => "Password is required",
        "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => "User account not found",
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => "Invalid email or password",
        "USER_DISABLED" => "This account has been disabled",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts, try again later",
        "INVALID_OOB_CODE" => "The verification link is invalid or has expired",
        "EXPIRED_OOB_CODE" => "The verification link has expired. Please request a new one",
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "INVALID_ID_TOKEN" => {
            "Your session has expired. Please sign in again"
        }
        "OPERATION_NOT_ALLOWED" => "Email/password sign-in is disabled for this project",
        _ => return None,
    };
    Some(message)
}

/// Builds a storage error from a Firestore response.
pub(crate) fn storage_error(status: StatusCode, body: &str) -> TasknestError {
    if status == StatusCode::NOT_FOUND {
        return TasknestError::storage("No document to update or delete: it may have been removed");
    }

    let detail = match error_message(body) {
        Some((message, Some(status_name))) if !message.is_empty() => {
            format!("{} ({})", message, status_name)
        }
        Some((message, _)) if !message.is_empty() => message,
        _ => format!("HTTP {}", status.as_u16()),
    };
    TasknestError::storage(detail)
}

/// Identity error code for failures that never reached the service.
pub(crate) const NETWORK_ERROR: &str = "NETWORK_ERROR";

/// Wraps a transport failure such as a refused connection or a timeout.
pub(crate) fn transport_identity_error(err: reqwest::Error) -> TasknestError {
    TasknestError::identity(NETWORK_ERROR, format!("Identity service unreachable: {}", err))
}

/// Identity error code for a successful status whose body could not be read
/// as the expected reply.
pub(crate) const INVALID_RESPONSE: &str = "INVALID_RESPONSE";

/// Wraps a failure while reading a successful response body.
pub(crate) fn response_identity_error(err: reqwest::Error) -> TasknestError {
    if err.is_decode() {
        TasknestError::identity(
            INVALID_RESPONSE,
            format!("Unexpected reply from the identity service: {}", err),
        )
    } else {
        transport_identity_error(err)
    }
}

pub(crate) fn transport_storage_error(err: reqwest::Error) -> TasknestError {
    TasknestError::storage(format!("Document store unreachable: {}", err))
}
