//! Scope gate for todo operations.
//!
//! Every operation requires exactly one scope, declared statically by
//! [`Operation::required_scope`]. Reads need [`READ_SCOPE`], anything that
//! mutates the store needs [`WRITE_SCOPE`].

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::TodoError;

/// Scope required to read todos
pub const READ_SCOPE: &str = "todo:read";

/// Scope required to create, update or delete todos
pub const WRITE_SCOPE: &str = "todo:write";

/// Set of scopes granted to the caller of a single tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(HashSet<String>);

impl ScopeSet {
    /// Create an empty scope set (grants nothing).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an OAuth `scope` claim (space-delimited, RFC 6749 section 3.3).
    #[must_use]
    pub fn from_space_delimited(raw: &str) -> Self {
        raw.split_whitespace().collect()
    }

    /// Whether `scope` was granted.
    #[must_use]
    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    /// Add a scope.
    pub fn insert(&mut self, scope: impl Into<String>) {
        self.0.insert(scope.into());
    }

    /// Number of granted scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no scope was granted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate granted scopes (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Granted scopes sorted, for logs and diagnostics.
    #[must_use]
    pub fn sorted(&self) -> Vec<&str> {
        let mut scopes: Vec<&str> = self.iter().collect();
        scopes.sort_unstable();
        scopes
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sorted().join(" "))
    }
}

/// Check that `required` is among the `granted` scopes.
///
/// Pure predicate: no locking, no side effects.
pub fn check_scope(required: &str, granted: &ScopeSet) -> Result<(), TodoError> {
    if granted.contains(required) {
        Ok(())
    } else {
        Err(TodoError::InsufficientScope(required.to_string()))
    }
}

/// The five store operations, each bound to one tool and one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a todo
    Create,
    /// List todos
    List,
    /// Fetch one todo
    Get,
    /// Partially update one todo
    Update,
    /// Remove one todo
    Delete,
}

impl Operation {
    /// All operations, in the order tools are advertised.
    pub const ALL: [Self; 5] = [
        Self::Create,
        Self::List,
        Self::Get,
        Self::Update,
        Self::Delete,
    ];

    /// Scope the caller must hold.
    #[must_use]
    pub const fn required_scope(self) -> &'static str {
        match self {
            Self::List | Self::Get => READ_SCOPE,
            Self::Create | Self::Update | Self::Delete => WRITE_SCOPE,
        }
    }

    /// MCP tool name exposing this operation.
    #[must_use]
    pub const fn tool_name(self) -> &'static str {
        match self {
            Self::Create => "create_todo",
            Self::List => "list_todos",
            Self::Get => "get_todo",
            Self::Update => "update_todo",
            Self::Delete => "delete_todo",
        }
    }

    /// Resolve a tool name back to its operation.
    #[must_use]
    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.tool_name() == name)
    }

    /// Whether the operation leaves the store untouched.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::List | Self::Get)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}
