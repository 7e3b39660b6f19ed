//! Auth use cases.
//!
//! Each operation calls the [`AuthGateway`] and, on success only, applies
//! the result to [`AuthState`] (and [`TaskState`] on logout). A failed call
//! leaves both stores untouched.

use std::sync::Arc;

use tasknest_core::error::{Result, TasknestError};
use tasknest_core::session::{AuthEvent, AuthGateway, AuthState, Session};
use tasknest_core::task::TaskState;
use tokio::sync::RwLock;

use crate::auth_listener::apply_auth_event;
use crate::outcome::ActionOutcome;

pub struct AuthUseCase {
    gateway: Arc<dyn AuthGateway>,
    auth: Arc<RwLock<AuthState>>,
    tasks: Arc<RwLock<TaskState>>,
}

impl AuthUseCase {
    pub fn new(
        gateway: Arc<dyn AuthGateway>,
        auth: Arc<RwLock<AuthState>>,
        tasks: Arc<RwLock<TaskState>>,
    ) -> Self {
        Self {
            gateway,
            auth,
            tasks,
        }
    }

    /// Current session snapshot.
    pub async fn session(&self) -> Session {
        self.auth.read().await.session().clone()
    }

    /// Creates an account and signs it in, unverified.
    ///
    /// A registration that fails after the account was created (say, the
    /// verification email could not be sent) still reports the failure, but
    /// the session the gateway started is taken over locally.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> ActionOutcome<Session> {
        let result: Result<Session> = async {
            let user = self
                .gateway
                .register(email.trim(), password, display_name.trim())
                .await?;
            apply_auth_event(&self.auth, &self.tasks, &AuthEvent::SignedIn { user }).await;
            Ok(self.session().await)
        }
        .await;

        if result.is_err() {
            if let Some(user) = self.gateway.current_user().await {
                apply_auth_event(&self.auth, &self.tasks, &AuthEvent::SignedIn { user }).await;
            }
        }
        Self::report("register", result)
    }

    /// Signs in, taking the verification flag from the remote account.
    pub async fn login(&self, email: &str, password: &str) -> ActionOutcome<Session> {
        let result: Result<Session> = async {
            let user = self.gateway.login(email.trim(), password).await?;
            apply_auth_event(&self.auth, &self.tasks, &AuthEvent::SignedIn { user }).await;
            Ok(self.session().await)
        }
        .await;
        Self::report("login", result)
    }

    /// Ends the session and drops the local task list.
    pub async fn logout(&self) -> ActionOutcome<()> {
        let result: Result<()> = async {
            self.gateway.logout().await?;
            apply_auth_event(&self.auth, &self.tasks, &AuthEvent::SignedOut).await;
            Ok(())
        }
        .await;
        Self::report("logout", result)
    }

    pub async fn request_password_reset(&self, email: &str) -> ActionOutcome<()> {
        let result = self.gateway.request_password_reset(email.trim()).await;
        Self::report("password reset", result)
    }

    pub async fn resend_verification(&self) -> ActionOutcome<()> {
        let result = self.gateway.resend_verification().await;
        Self::report("resend verification", result)
    }

    /// Re-reads the verification flag and stores it.
    ///
    /// On failure the session stays as it was, so an unverified session
    /// stays unverified.
    pub async fn check_verification(&self) -> ActionOutcome<bool> {
        let result: Result<bool> = async {
            if !self.auth.read().await.is_authenticated() {
                return Err(TasknestError::NotAuthenticated);
            }
            let verified = self.gateway.refresh_verification_status().await?;
            self.auth.write().await.set_email_verified(verified);
            Ok(verified)
        }
        .await;
        Self::report("verification check", result)
    }

    /// Consumes a code from a verification email.
    ///
    /// The code may belong to another account, so the local flag is taken
    /// from the gateway's view of the signed-in user afterwards.
    pub async fn apply_verification_code(&self, code: &str) -> ActionOutcome<()> {
        let result: Result<()> = async {
            let code = code.trim();
            if code.is_empty() {
                return Err(TasknestError::identity(
                    "INVALID_OOB_CODE",
                    "The verification link is invalid or has expired",
                ));
            }
            self.gateway.apply_verification_code(code).await?;

            let current = self.gateway.current_user().await;
            let mut auth = self.auth.write().await;
            if let Some(user) = current.filter(|user| auth.user_id() == Some(user.user_id.as_str())) {
                auth.set_email_verified(user.email_verified);
            }
            Ok(())
        }
        .await;
        Self::report("apply verification code", result)
    }

    fn report<T>(action: &str, result: Result<T>) -> ActionOutcome<T> {
        if let Err(e) = &result {
            tracing::warn!("{} failed: {}", action, e);
        }
        result.into()
    }
}
