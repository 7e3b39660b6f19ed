//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: the client-held [`Session`] and its [`SessionPhase`]
//! - `store`: [`AuthState`], the persisted local session store
//! - `event`: auth-change notifications ([`AuthEvent`], [`AuthEventBus`])
//! - `gateway`: the [`AuthGateway`] contract for the remote identity service

mod event;
mod gateway;
mod model;
mod store;

pub use event::{AuthEvent, AuthEventBus, AuthSubscription};
pub use gateway::{AuthGateway, RemoteUser};
pub use model::{Session, SessionPhase};
pub use store::AuthState;
