//! Core domain for tasknest.
//!
//! Holds the session and task models, the two client-side stores that the
//! application mutates, and the gateway traits through which the remote
//! identity service and document store are reached. Nothing in this crate
//! performs network or file I/O; adapters live in `tasknest-infrastructure`.

pub mod config;
pub mod error;
pub mod persistence;
pub mod session;
pub mod task;

pub use error::{Result, TasknestError};
