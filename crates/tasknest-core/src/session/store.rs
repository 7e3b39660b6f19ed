//! Local session store.

use std::sync::Arc;

use crate::persistence::{AUTH_SNAPSHOT_KEY, PersistHook, SnapshotStore};

use super::model::{Session, SessionPhase};

/// Client-side holder of the current [`Session`].
///
/// Every mutation is written through the store's [`PersistHook`] before the
/// method returns. The store is single-writer; callers that share it across
/// tasks wrap it in a lock.
#[derive(Debug)]
pub struct AuthState {
    session: Session,
    hook: PersistHook,
}

impl AuthState {
    /// Creates an empty store that is not backed by durable storage.
    pub fn in_memory() -> Self {
        Self {
            session: Session::anonymous(),
            hook: PersistHook::detached(AUTH_SNAPSHOT_KEY),
        }
    }

    /// Restores the last persisted session from `store`.
    pub fn restore(store: Arc<dyn SnapshotStore>) -> Self {
        let hook = PersistHook::new(AUTH_SNAPSHOT_KEY, store);
        let session: Session = hook.restore();
        Self { session, hook }
    }

    /// Replaces the session wholesale and marks it authenticated.
    pub fn set_auth(
        &mut self,
        user_id: impl Into<String>,
        email: impl Into<String>,
        is_email_verified: bool,
    ) {
        self.session = Session::authenticated(user_id, email, is_email_verified);
        self.save();
    }

    /// Resets the session to its empty form and drops the stored snapshot.
    pub fn clear_auth(&mut self) {
        self.session = Session::anonymous();
        self.hook.clear();
    }

    /// Flips only the verification bit.
    pub fn set_email_verified(&mut self, is_email_verified: bool) {
        self.session.is_email_verified = is_email_verified;
        self.save();
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.user_id.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.session.email.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated
    }

    pub fn is_email_verified(&self) -> bool {
        self.session.is_email_verified
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    fn save(&self) {
        self.hook.persist(&self.session);
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::test_support::MapSnapshotStore;

    #[test]
    fn test_set_then_clear_returns_to_empty_form() {
        let mut state = AuthState::in_memory();
        state.set_auth("u1", "u1@example.com", true);
        state.clear_auth();

        assert_eq!(state.user_id(), None);
        assert_eq!(state.email(), None);
        assert!(!state.is_authenticated());
        assert!(!state.is_email_verified());
        assert_eq!(state.session(), &Session::anonymous());
    }

    #[test]
    fn test_set_email_verified_only_touches_flag() {
        let mut state = AuthState::in_memory();
        state.set_auth("u1", "u1@example.com", false);
        assert_eq!(state.phase(), SessionPhase::Unverified);

        state.set_email_verified(true);

        assert_eq!(state.user_id(), Some("u1"));
        assert_eq!(state.email(), Some("u1@example.com"));
        assert!(state.is_authenticated());
        assert!(state.is_email_verified());
        assert_eq!(state.phase(), SessionPhase::Verified);
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let store = Arc::new(MapSnapshotStore::default());
        let mut state = AuthState::restore(store.clone());

        state.set_auth("u1", "u1@example.com", false);
        assert_eq!(
            store.get(AUTH_SNAPSHOT_KEY).unwrap()["userId"],
            serde_json::json!("u1")
        );

        state.set_email_verified(true);
        assert_eq!(
            store.get(AUTH_SNAPSHOT_KEY).unwrap()["isEmailVerified"],
            serde_json::json!(true)
        );

        state.clear_auth();
        assert!(store.get(AUTH_SNAPSHOT_KEY).is_none());
        assert!(!AuthState::restore(store).is_authenticated());
    }

    #[test]
    fn test_restore_survives_reload() {
        let store = Arc::new(MapSnapshotStore::default());
        {
            let mut state = AuthState::restore(store.clone());
            state.set_auth("u9", "u9@example.com", true);
        }

        let reloaded = AuthState::restore(store);
        assert_eq!(reloaded.user_id(), Some("u9"));
        assert!(reloaded.is_email_verified());
    }
}
