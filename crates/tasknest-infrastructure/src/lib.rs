//! Infrastructure adapters for tasknest.
//!
//! Files and configuration on the local side, Firebase REST clients on the
//! remote side, and in-memory stand-ins for both gateways.

pub mod config_service;
pub mod firebase;
pub mod memory;
pub mod paths;
pub mod snapshot_store;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::firebase::{FirebaseIdentity, FirestoreTaskGateway, IdTokenSource};
pub use crate::memory::{InMemoryAuthGateway, InMemoryTaskGateway};
pub use crate::paths::TasknestPaths;
pub use crate::snapshot_store::{InMemorySnapshotStore, JsonFileSnapshotStore};
