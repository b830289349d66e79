//! Todo entity and partial-update patch

use serde::{Deserialize, Serialize};

/// A todo item held in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Generated identifier (UUID v4), immutable
    pub id: String,
    /// Display title; empty strings are accepted
    pub title: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Completion flag
    #[serde(default)]
    pub completed: bool,
}

impl TodoItem {
    /// Build an open (not completed) item.
    pub fn new(id: String, title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description,
            completed: false,
        }
    }
}

/// Fields supplied to an update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New completion flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    /// Patch that only sets the completion flag.
    #[must_use]
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }

    /// Apply the supplied fields to `item` in place.
    pub fn apply(self, item: &mut TodoItem) {
        if let Some(title) = self.title {
            item.title = title;
        }
        if let Some(description) = self.description {
            item.description = Some(description);
        }
        if let Some(completed) = self.completed {
            item.completed = completed;
        }
    }
}
