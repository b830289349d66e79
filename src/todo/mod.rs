//! Scope-gated todo store.
//!
//! [`TodoStore`] owns the todo items; [`scope`] decides whether a caller may
//! run an operation. Callers pass their granted [`ScopeSet`] explicitly to
//! every store method.

mod model;
pub mod scope;
mod store;

use thiserror::Error;

pub use model::{TodoItem, TodoPatch};
pub use scope::{Operation, READ_SCOPE, ScopeSet, WRITE_SCOPE, check_scope};
pub use store::TodoStore;

/// Errors returned by scope checks and store operations.
///
/// Both kinds are caller errors: the server keeps running and the message is
/// returned to the client as a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    /// The caller lacks the scope the operation requires
    #[error("Insufficient permissions: `{0}` scope required.")]
    InsufficientScope(String),

    /// No todo with this id exists
    #[error("Todo `{0}` not found.")]
    NotFound(String),
}

impl TodoError {
    /// Machine-readable kind tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientScope(_) => "insufficient_scope",
            Self::NotFound(_) => "not_found",
        }
    }
}
