use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tasknest_core::error::{Result, TasknestError};
use tasknest_core::session::{AuthEvent, AuthEventBus, AuthGateway, AuthSubscription, RemoteUser};
use uuid::Uuid;

use crate::firebase::identity_code_error;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentEmailKind {
    Verification,
    PasswordReset,
}

/// An out-of-band email the gateway would have sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub kind: SentEmailKind,
    pub email: String,
    /// The code embedded in the email link.
    pub code: String,
}

#[derive(Debug, Clone)]
struct Account {
    user_id: String,
    email: String,
    password: String,
    display_name: String,
    email_verified: bool,
}

impl Account {
    fn user(&self) -> RemoteUser {
        RemoteUser {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            display_name: Some(self.display_name.clone()),
            email_verified: self.email_verified,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// Keyed by lowercased email.
    accounts: HashMap<String, Account>,
    /// Lowercased email of the signed-in account.
    current: Option<String>,
    /// Outstanding verification codes, code -> lowercased email.
    codes: HashMap<String, String>,
    outbox: Vec<SentEmail>,
    fail_next: Option<TasknestError>,
    fail_next_email: Option<TasknestError>,
}

/// [`AuthGateway`] keeping accounts in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuthGateway {
    inner: Mutex<Inner>,
    events: AuthEventBus,
}

impl InMemoryAuthGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next gateway call fail with `err`.
    pub fn fail_next(&self, err: TasknestError) {
        self.lock().fail_next = Some(err);
    }

    /// Makes the next verification email fail with `err`. A registration
    /// hitting it still creates the account and signs it in.
    pub fn fail_next_email(&self, err: TasknestError) {
        self.lock().fail_next_email = Some(err);
    }

    /// Every email sent so far, oldest first.
    pub fn sent_emails(&self) -> Vec<SentEmail> {
        self.lock().outbox.clone()
    }

    /// Marks an account verified as if its owner followed the email link in
    /// another client.
    pub fn verify_email(&self, email: &str) -> bool {
        let mut inner = self.lock();
        match inner.accounts.get_mut(&email.to_lowercase()) {
            Some(account) => {
                account.email_verified = true;
                true
            }
            None => false,
        }
    }

    /// Drops the remote session without any call from the application, the
    /// way an expired or revoked token does.
    pub fn expire_session(&self) {
        let had_session = self.lock().current.take().is_some();
        if had_session {
            self.events.publish(AuthEvent::SignedOut);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_injected(inner: &mut Inner) -> Result<()> {
        match inner.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn send(inner: &mut Inner, kind: SentEmailKind, email: &str) {
        let code = Uuid::new_v4().simple().to_string();
        if kind == SentEmailKind::Verification {
            inner.codes.insert(code.clone(), email.to_lowercase());
        }
        inner.outbox.push(SentEmail {
            kind,
            email: email.to_string(),
            code,
        });
    }

    fn current_account(inner: &Inner) -> Result<&Account> {
        inner
            .current
            .as_ref()
            .and_then(|key| inner.accounts.get(key))
            .ok_or(TasknestError::NotAuthenticated)
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && domain.contains('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[async_trait]
impl AuthGateway for InMemoryAuthGateway {
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<RemoteUser> {
        let (user, email_failure) = {
            let mut inner = self.lock();
            Self::check_injected(&mut inner)?;

            if !is_valid_email(email) {
                return Err(identity_code_error("INVALID_EMAIL"));
            }
            if password.is_empty() {
                return Err(identity_code_error("MISSING_PASSWORD"));
            }
            if password.len() < MIN_PASSWORD_LEN {
                return Err(identity_code_error("WEAK_PASSWORD"));
            }
            let key = email.to_lowercase();
            if inner.accounts.contains_key(&key) {
                return Err(identity_code_error("EMAIL_EXISTS"));
            }

            let account = Account {
                user_id: Uuid::new_v4().simple().to_string(),
                email: email.to_string(),
                password: password.to_string(),
                display_name: display_name.to_string(),
                email_verified: false,
            };
            let user = account.user();
            inner.accounts.insert(key.clone(), account);
            inner.current = Some(key);
            let email_failure = inner.fail_next_email.take();
            if email_failure.is_none() {
                Self::send(&mut inner, SentEmailKind::Verification, email);
            }
            (user, email_failure)
        };

        self.events.publish(AuthEvent::SignedIn { user: user.clone() });
        match email_failure {
            Some(err) => Err(err),
            None => Ok(user),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<RemoteUser> {
        let user = {
            let mut inner = self.lock();
            Self::check_injected(&mut inner)?;

            if !is_valid_email(email) {
                return Err(identity_code_error("INVALID_EMAIL"));
            }
            let key = email.to_lowercase();
            let user = match inner.accounts.get(&key) {
                Some(account) if account.password == password => account.user(),
                _ => return Err(identity_code_error("INVALID_LOGIN_CREDENTIALS")),
            };
            inner.current = Some(key);
            user
        };

        self.events.publish(AuthEvent::SignedIn { user: user.clone() });
        Ok(user)
    }

    async fn logout(&self) -> Result<()> {
        let had_session = {
            let mut inner = self.lock();
            Self::check_injected(&mut inner)?;
            inner.current.take().is_some()
        };

        if had_session {
            self.events.publish(AuthEvent::SignedOut);
        }
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<()> {
        let mut inner = self.lock();
        Self::check_injected(&mut inner)?;

        if !is_valid_email(email) {
            return Err(identity_code_error("INVALID_EMAIL"));
        }
        if !inner.accounts.contains_key(&email.to_lowercase()) {
            return Err(identity_code_error("EMAIL_NOT_FOUND"));
        }
        Self::send(&mut inner, SentEmailKind::PasswordReset, email);
        Ok(())
    }

    async fn resend_verification(&self) -> Result<()> {
        let mut inner = self.lock();
        Self::check_injected(&mut inner)?;
        if let Some(err) = inner.fail_next_email.take() {
            return Err(err);
        }

        let email = Self::current_account(&inner)?.email.clone();
        Self::send(&mut inner, SentEmailKind::Verification, &email);
        Ok(())
    }

    async fn refresh_verification_status(&self) -> Result<bool> {
        let mut inner = self.lock();
        Self::check_injected(&mut inner)?;
        Ok(Self::current_account(&inner)?.email_verified)
    }

    async fn apply_verification_code(&self, code: &str) -> Result<()> {
        let mut inner = self.lock();
        Self::check_injected(&mut inner)?;

        let key = inner
            .codes
            .remove(code)
            .ok_or_else(|| identity_code_error("INVALID_OOB_CODE"))?;
        match inner.accounts.get_mut(&key) {
            Some(account) => {
                account.email_verified = true;
                Ok(())
            }
            None => Err(identity_code_error("USER_NOT_FOUND")),
        }
    }

    async fn current_user(&self) -> Option<RemoteUser> {
        let inner = self.lock();
        Self::current_account(&inner).ok().map(Account::user)
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_signs_in_unverified_and_sends_email() {
        let gateway = InMemoryAuthGateway::new();
        let mut events = gateway.subscribe();

        let user = gateway.register("a@example.com", "secret1", "Ann").await.unwrap();

        assert!(!user.email_verified);
        assert_eq!(events.try_next(), Some(AuthEvent::SignedIn { user: user.clone() }));
        let sent = gateway.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, SentEmailKind::Verification);
    }

    #[tokio::test]
    async fn test_failed_verification_email_still_signs_in() {
        let gateway = InMemoryAuthGateway::new();
        let mut events = gateway.subscribe();
        gateway.fail_next_email(TasknestError::identity("NETWORK_ERROR", "offline"));

        let err = gateway.register("a@example.com", "secret1", "Ann").await.unwrap_err();

        assert_eq!(err.identity_code(), Some("NETWORK_ERROR"));
        assert!(gateway.sent_emails().is_empty());
        let user = gateway.current_user().await.unwrap();
        assert_eq!(user.email, "a@example.com");
        assert_eq!(events.try_next(), Some(AuthEvent::SignedIn { user }));
    }

    #[tokio::test]
    async fn test_register_rejections() {
        let gateway = InMemoryAuthGateway::new();
        gateway.register("a@example.com", "secret1", "Ann").await.unwrap();

        let cases = [
            ("not-an-email", "secret1", "INVALID_EMAIL"),
            ("b@example.com", "123", "WEAK_PASSWORD"),
            ("A@Example.com", "secret1", "EMAIL_EXISTS"),
        ];
        for (email, password, code) in cases {
            let err = gateway.register(email, password, "X").await.unwrap_err();
            assert_eq!(err.identity_code(), Some(code), "{email}");
        }
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let gateway = InMemoryAuthGateway::new();
        gateway.register("a@example.com", "secret1", "Ann").await.unwrap();
        gateway.logout().await.unwrap();

        let err = gateway.login("a@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.identity_code(), Some("INVALID_LOGIN_CREDENTIALS"));
        assert_eq!(gateway.current_user().await, None);

        let user = gateway.login("a@example.com", "secret1").await.unwrap();
        assert_eq!(gateway.current_user().await, Some(user));
    }

    #[tokio::test]
    async fn test_verification_code_flow() {
        let gateway = InMemoryAuthGateway::new();
        gateway.register("a@example.com", "secret1", "Ann").await.unwrap();
        let code = gateway.sent_emails()[0].code.clone();

        assert!(!gateway.refresh_verification_status().await.unwrap());
        gateway.apply_verification_code(&code).await.unwrap();
        assert!(gateway.refresh_verification_status().await.unwrap());

        let err = gateway.apply_verification_code(&code).await.unwrap_err();
        assert_eq!(err.identity_code(), Some("INVALID_OOB_CODE"));
    }

    #[tokio::test]
    async fn test_session_required_calls() {
        let gateway = InMemoryAuthGateway::new();
        assert_eq!(
            gateway.resend_verification().await.unwrap_err(),
            TasknestError::NotAuthenticated
        );
        assert_eq!(
            gateway.refresh_verification_status().await.unwrap_err(),
            TasknestError::NotAuthenticated
        );
    }

    #[tokio::test]
    async fn test_expire_session_publishes_signed_out() {
        let gateway = InMemoryAuthGateway::new();
        gateway.register("a@example.com", "secret1", "Ann").await.unwrap();
        let mut events = gateway.subscribe();

        gateway.expire_session();
        gateway.expire_session();

        assert_eq!(events.try_next(), Some(AuthEvent::SignedOut));
        assert_eq!(events.try_next(), None);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let gateway = InMemoryAuthGateway::new();
        gateway.fail_next(TasknestError::identity("NETWORK_ERROR", "offline"));

        assert!(gateway.login("a@example.com", "secret1").await.is_err());
        assert_eq!(
            gateway
                .request_password_reset("nobody@example.com")
                .await
                .unwrap_err()
                .identity_code(),
            Some("EMAIL_NOT_FOUND")
        );
    }
}
