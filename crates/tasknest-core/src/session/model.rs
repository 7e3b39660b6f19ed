//! Session domain model.

use serde::{Deserialize, Serialize};

/// The authenticated-user context held client-side.
///
/// When `is_authenticated` is false, `user_id`/`email` are `None` and
/// `is_email_verified` is false. The store keeps that shape; it does not
/// validate values handed to it beyond that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Session {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub is_authenticated: bool,
    pub is_email_verified: bool,
}

/// Where a session sits in the `Anonymous -> Unverified -> Verified` lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Anonymous,
    Unverified,
    Verified,
}

impl Session {
    /// The empty, signed-out session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated session for `user_id`.
    pub fn authenticated(
        user_id: impl Into<String>,
        email: impl Into<String>,
        is_email_verified: bool,
    ) -> Self {
        Self {
            user_id: Some(user_id.into()),
            email: Some(email.into()),
            is_authenticated: true,
            is_email_verified,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match (self.is_authenticated, self.is_email_verified) {
            (false, _) => SessionPhase::Anonymous,
            (true, false) => SessionPhase::Unverified,
            (true, true) => SessionPhase::Verified,
        }
    }

    /// True once the user is signed in and the email is verified.
    pub fn can_access_tasks(&self) -> bool {
        self.phase() == SessionPhase::Verified
    }
}
