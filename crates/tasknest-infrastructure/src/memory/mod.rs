//! In-process gateways.
//!
//! Behave like the Firebase adapters, including their error codes and auth
//! events, without any network. Used for offline runs and application tests.

mod auth;
mod tasks;

pub use auth::{InMemoryAuthGateway, SentEmail, SentEmailKind};
pub use tasks::InMemoryTaskGateway;
