//! Wiring of stores, gateways and use cases.

use std::sync::Arc;

use anyhow::{Context, Result};
use tasknest_core::config::RootConfig;
use tasknest_core::persistence::SnapshotStore;
use tasknest_core::session::{AuthEvent, AuthGateway, AuthState};
use tasknest_core::task::{TaskGateway, TaskState};
use tasknest_infrastructure::{
    ConfigService, FirebaseIdentity, FirestoreTaskGateway, InMemoryAuthGateway,
    InMemoryTaskGateway, JsonFileSnapshotStore,
};
use tokio::sync::RwLock;

use crate::auth_listener::{AuthListener, apply_auth_event};
use crate::auth_usecase::AuthUseCase;
use crate::task_usecase::TaskUseCase;

/// Everything a front end needs, built once at startup.
pub struct AppContext {
    pub config: RootConfig,
    pub auth_state: Arc<RwLock<AuthState>>,
    pub task_state: Arc<RwLock<TaskState>>,
    pub auth: AuthUseCase,
    pub tasks: TaskUseCase,
    auth_gateway: Arc<dyn AuthGateway>,
}

impl AppContext {
    /// Builds a Firebase-backed context whose stores persist under the
    /// configured state directory, then reconciles the stored session with
    /// the remote one saved last time.
    pub async fn firebase(config_service: &ConfigService) -> Result<Self> {
        let config = config_service.get_config()?;
        let state_dir = config_service.state_dir()?;
        tracing::debug!("Using state directory {:?}", state_dir);
        let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileSnapshotStore::new(state_dir));

        let identity = Arc::new(
            FirebaseIdentity::new(config.firebase.clone())
                .with_context(|| {
                    format!(
                        "Firebase is not configured; edit {:?} or set the TASKNEST_FIREBASE_* variables",
                        config_service.config_path().unwrap_or_default()
                    )
                })?
                .with_snapshot_store(store.clone()),
        );
        let task_gateway = Arc::new(FirestoreTaskGateway::new(&config.firebase, identity.clone()));

        let context = Self::assemble(config, Some(store), identity.clone(), task_gateway);

        match identity.restore_session().await {
            Some(user) => {
                apply_auth_event(
                    &context.auth_state,
                    &context.task_state,
                    &AuthEvent::SignedIn { user },
                )
                .await;
            }
            None if identity.current_user().await.is_none() => {
                if context.auth_state.read().await.is_authenticated() {
                    tracing::info!("Remote session is gone, signing out locally");
                    apply_auth_event(&context.auth_state, &context.task_state, &AuthEvent::SignedOut)
                        .await;
                }
            }
            None => tracing::warn!("Identity service unreachable, keeping the local session"),
        }

        Ok(context)
    }

    /// Builds a context on in-memory gateways and unpersisted stores.
    pub fn in_memory() -> Self {
        Self::assemble(
            RootConfig::default(),
            None,
            Arc::new(InMemoryAuthGateway::new()),
            Arc::new(InMemoryTaskGateway::new()),
        )
    }

    /// Assembles a context from explicit gateways. Stores are restored from
    /// `store` when given.
    pub fn assemble(
        config: RootConfig,
        store: Option<Arc<dyn SnapshotStore>>,
        auth_gateway: Arc<dyn AuthGateway>,
        task_gateway: Arc<dyn TaskGateway>,
    ) -> Self {
        let (auth_state, task_state) = match store {
            Some(store) => (AuthState::restore(store.clone()), TaskState::restore(store)),
            None => (AuthState::in_memory(), TaskState::in_memory()),
        };
        let auth_state = Arc::new(RwLock::new(auth_state));
        let task_state = Arc::new(RwLock::new(task_state));

        Self {
            config,
            auth: AuthUseCase::new(auth_gateway.clone(), auth_state.clone(), task_state.clone()),
            tasks: TaskUseCase::new(task_gateway, auth_state.clone(), task_state.clone()),
            auth_state,
            task_state,
            auth_gateway,
        }
    }

    /// Starts applying auth changes from the gateway to the stores.
    pub fn listen(&self) -> AuthListener {
        AuthListener::spawn(
            self.auth_gateway.subscribe(),
            self.auth_state.clone(),
            self.task_state.clone(),
        )
    }
}
