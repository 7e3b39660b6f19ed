//! Reconciles the local stores with remote auth changes.

use std::sync::Arc;

use tasknest_core::session::{AuthEvent, AuthState, AuthSubscription};
use tasknest_core::task::TaskState;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Applies `event` to the stores exactly as a login or logout would.
///
/// A sign-in replaces the session wholesale, verification flag included. A
/// sign-in for a different user than the one held locally also drops the
/// local task list, since it belongs to someone else.
pub async fn apply_auth_event(
    auth: &RwLock<AuthState>,
    tasks: &RwLock<TaskState>,
    event: &AuthEvent,
) {
    match event {
        AuthEvent::SignedIn { user } => {
            let mut auth = auth.write().await;
            let same_user = auth.user_id() == Some(user.user_id.as_str());
            auth.set_auth(&user.user_id, &user.email, user.email_verified);
            drop(auth);

            if !same_user {
                tasks.write().await.clear_tasks();
            }
        }
        AuthEvent::SignedOut => {
            auth.write().await.clear_auth();
            tasks.write().await.clear_tasks();
        }
    }
}

/// Background consumer of an [`AuthSubscription`].
#[derive(Debug)]
pub struct AuthListener {
    handle: JoinHandle<()>,
}

impl AuthListener {
    /// Spawns a task that applies every event from `subscription` until the
    /// bus closes or [`stop`](AuthListener::stop) is called.
    pub fn spawn(
        mut subscription: AuthSubscription,
        auth: Arc<RwLock<AuthState>>,
        tasks: Arc<RwLock<TaskState>>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                tracing::debug!("Auth event: {:?}", event);
                apply_auth_event(&auth, &tasks, &event).await;
            }
            tracing::debug!("Auth event bus closed, listener exiting");
        });
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}
