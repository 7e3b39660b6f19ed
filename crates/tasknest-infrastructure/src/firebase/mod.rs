//! Firebase REST adapters.
//!
//! [`FirebaseIdentity`] talks to the Identity Toolkit and Secure Token
//! endpoints and owns the remote session. [`FirestoreTaskGateway`] reads and
//! writes the `tasks` collection using the ID tokens handed out by an
//! [`IdTokenSource`], normally the same `FirebaseIdentity`.

mod documents;
mod error;
mod identity;
mod task_gateway;

pub(crate) use error::identity_code_error;
pub use identity::{FirebaseIdentity, IDENTITY_CREDENTIALS_KEY, IdTokenSource};
pub use task_gateway::FirestoreTaskGateway;
