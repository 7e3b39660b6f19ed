//! Application layer for tasknest.
//!
//! Each use case pairs one gateway call with the matching local store update
//! and reports the result as an [`ActionOutcome`]. [`AuthListener`] keeps the
//! stores in line with auth changes that happen outside any use case, and
//! [`AppContext`] wires everything together.

pub mod auth_listener;
pub mod auth_usecase;
pub mod bootstrap;
pub mod outcome;
pub mod task_usecase;

pub use auth_listener::AuthListener;
pub use auth_usecase::AuthUseCase;
pub use bootstrap::AppContext;
pub use outcome::ActionOutcome;
pub use task_usecase::TaskUseCase;
