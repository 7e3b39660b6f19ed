//! Remote identity boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::event::AuthSubscription;

/// The user behind a remote identity session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub user_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

/// Contract for the remote identity service.
///
/// Every failure is reported as [`TasknestError::Identity`] (or
/// [`TasknestError::NotAuthenticated`] when a remote session is required and
/// missing). Implementations publish an [`AuthEvent`] on every remote session
/// transition so that subscribers can reconcile local state.
///
/// [`TasknestError::Identity`]: crate::TasknestError::Identity
/// [`TasknestError::NotAuthenticated`]: crate::TasknestError::NotAuthenticated
/// [`AuthEvent`]: super::AuthEvent
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Creates an account, records the display name and sends a verification
    /// email. The returned user is never verified.
    ///
    /// Once the account exists its session is started, so an error from a
    /// later step leaves [`current_user`](AuthGateway::current_user) set.
    async fn register(&self, email: &str, password: &str, display_name: &str)
    -> Result<RemoteUser>;

    /// Signs in and returns the user with the current verification flag.
    async fn login(&self, email: &str, password: &str) -> Result<RemoteUser>;

    /// Ends the remote session. Calling it without a session succeeds.
    async fn logout(&self) -> Result<()>;

    /// Sends a password reset email.
    async fn request_password_reset(&self, email: &str) -> Result<()>;

    /// Sends another verification email to the signed-in user.
    async fn resend_verification(&self) -> Result<()>;

    /// Re-reads the verification flag of the current remote session.
    async fn refresh_verification_status(&self) -> Result<bool>;

    /// Consumes an out-of-band verification code from a verification email.
    async fn apply_verification_code(&self, code: &str) -> Result<()>;

    /// The user of the current remote session, if any.
    async fn current_user(&self) -> Option<RemoteUser>;

    /// Registers for remote session transitions.
    fn subscribe(&self) -> AuthSubscription;
}
