//! Task domain module.
//!
//! # Module Structure
//!
//! - `model`: [`Task`], [`TaskStatus`], and the input shapes [`TaskDraft`] / [`TaskUpdate`]
//! - `view`: derived projections over a task list ([`TaskFilter`], [`TaskQuery`], [`TaskStats`])
//! - `store`: [`TaskState`], the persisted local task store
//! - `gateway`: the [`TaskGateway`] contract for the remote document store

mod gateway;
mod model;
mod store;
mod view;

pub use gateway::TaskGateway;
pub use model::{
    DESCRIPTION_MAX_LEN, NAME_MAX_LEN, NAME_MIN_LEN, Task, TaskDraft, TaskStatus, TaskUpdate,
};
pub use store::{TaskSnapshot, TaskState};
pub use view::{TaskFilter, TaskQuery, TaskStats};
