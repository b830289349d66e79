//! In-memory todo store.
//!
//! # Design
//!
//! Items live in a `BTreeMap` keyed by a monotonically increasing insertion
//! sequence, so iteration yields creation order. A `HashMap` from id to
//! sequence gives O(1) id lookup for get/update/delete.
//!
//! The whole store sits behind one `RwLock`. `list`/`get` hold the read lock,
//! `create`/`update`/`delete` hold the write lock, each for the full operation.
//! The lock is never held across an `.await`.
//!
//! Every operation checks the caller's scopes first and returns before taking
//! the lock when the check fails, so a denied call never observes or mutates
//! the store.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::scope::{Operation, ScopeSet, check_scope};
use super::{TodoError, TodoItem, TodoPatch};

#[derive(Debug, Default)]
struct Inner {
    /// insertion sequence -> item
    items: BTreeMap<u64, TodoItem>,
    /// id -> insertion sequence
    index: HashMap<String, u64>,
    next_seq: u64,
}

impl Inner {
    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.index.contains_key(&id) {
                return id;
            }
        }
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut TodoItem> {
        let seq = self.index.get(id)?;
        self.items.get_mut(seq)
    }
}

/// Process-wide todo store. Construct once and share behind an `Arc`.
#[derive(Debug, Default)]
pub struct TodoStore {
    inner: RwLock<Inner>,
}

impl TodoStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a todo with a fresh id. Requires `todo:write`.
    pub fn create(
        &self,
        scopes: &ScopeSet,
        title: impl Into<String>,
        description: Option<String>,
    ) -> Result<TodoItem, TodoError> {
        check_scope(Operation::Create.required_scope(), scopes)?;

        let mut inner = self.inner.write();
        let id = inner.fresh_id();
        let todo = TodoItem::new(id.clone(), title, description);

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.index.insert(id, seq);
        inner.items.insert(seq, todo.clone());

        debug!(todo_id = %todo.id, "Created todo");
        Ok(todo)
    }

    /// List todos in creation order, optionally filtered by completion state.
    /// Requires `todo:read`.
    pub fn list(
        &self,
        scopes: &ScopeSet,
        completed: Option<bool>,
    ) -> Result<Vec<TodoItem>, TodoError> {
        check_scope(Operation::List.required_scope(), scopes)?;

        let inner = self.inner.read();
        Ok(inner
            .items
            .values()
            .filter(|todo| completed.is_none_or(|flag| todo.completed == flag))
            .cloned()
            .collect())
    }

    /// Fetch a todo by id. Requires `todo:read`.
    pub fn get(&self, scopes: &ScopeSet, id: &str) -> Result<TodoItem, TodoError> {
        check_scope(Operation::Get.required_scope(), scopes)?;

        let inner = self.inner.read();
        inner
            .index
            .get(id)
            .and_then(|seq| inner.items.get(seq))
            .cloned()
            .ok_or_else(|| TodoError::NotFound(id.to_string()))
    }

    /// Apply a partial update and return the new value. Requires `todo:write`.
    pub fn update(
        &self,
        scopes: &ScopeSet,
        id: &str,
        patch: TodoPatch,
    ) -> Result<TodoItem, TodoError> {
        check_scope(Operation::Update.required_scope(), scopes)?;

        let mut inner = self.inner.write();
        let todo = inner
            .get_mut(id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;
        patch.apply(todo);

        debug!(todo_id = %id, completed = todo.completed, "Updated todo");
        Ok(todo.clone())
    }

    /// Remove a todo and return its id. Requires `todo:write`.
    pub fn delete(&self, scopes: &ScopeSet, id: &str) -> Result<String, TodoError> {
        check_scope(Operation::Delete.required_scope(), scopes)?;

        let mut inner = self.inner.write();
        let seq = inner
            .index
            .remove(id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;
        inner.items.remove(&seq);

        debug!(todo_id = %id, "Deleted todo");
        Ok(id.to_string())
    }

    /// Number of stored todos. Unscoped; used by the health endpoint.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::{READ_SCOPE, WRITE_SCOPE};
    use pretty_assertions::assert_eq;

    fn all_scopes() -> ScopeSet {
        [READ_SCOPE, WRITE_SCOPE].into_iter().collect()
    }

    #[test]
    fn create_then_get_returns_equal_item() {
        let store = TodoStore::new();
        let scopes = all_scopes();

        let created = store.create(&scopes, "Buy milk", None).unwrap();
        assert_eq!(created.title, "Buy milk");
        assert_eq!(created.description, None);
        assert!(!created.completed);

        assert_eq!(store.get(&scopes, &created.id).unwrap(), created);
    }

    #[test]
    fn ids_are_uuid_v4() {
        let store = TodoStore::new();
        let todo = store.create(&all_scopes(), "x", None).unwrap();
        let parsed = Uuid::parse_str(&todo.id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn index_and_items_stay_in_sync_after_delete() {
        let store = TodoStore::new();
        let scopes = all_scopes();
        let a = store.create(&scopes, "a", None).unwrap();
        let b = store.create(&scopes, "b", None).unwrap();

        store.delete(&scopes, &a.id).unwrap();

        let inner = store.inner.read();
        assert_eq!(inner.items.len(), 1);
        assert_eq!(inner.index.len(), 1);
        assert!(inner.index.contains_key(&b.id));
    }

    #[test]
    fn sequence_keeps_growing_after_delete() {
        let store = TodoStore::new();
        let scopes = all_scopes();
        let a = store.create(&scopes, "a", None).unwrap();
        store.delete(&scopes, &a.id).unwrap();
        let b = store.create(&scopes, "b", None).unwrap();
        let c = store.create(&scopes, "c", None).unwrap();

        let titles: Vec<String> = store
            .list(&scopes, None)
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["b", "c"]);
        assert_ne!(b.id, c.id);
    }

    #[test]
    fn denied_create_does_not_insert() {
        let store = TodoStore::new();
        let read_only: ScopeSet = [READ_SCOPE].into_iter().collect();

        let err = store.create(&read_only, "nope", None).unwrap_err();
        assert_eq!(err, TodoError::InsufficientScope(WRITE_SCOPE.into()));
        assert!(store.is_empty());
    }

    #[test]
    fn scope_is_checked_before_lookup() {
        let store = TodoStore::new();
        // No such id, but the scope failure wins.
        let err = store.get(&ScopeSet::new(), "missing").unwrap_err();
        assert_eq!(err, TodoError::InsufficientScope(READ_SCOPE.into()));
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let store = TodoStore::new();
        let err = store
            .update(&all_scopes(), "ghost", TodoPatch::completed(true))
            .unwrap_err();
        assert_eq!(err, TodoError::NotFound("ghost".into()));
    }

    #[test]
    fn concurrent_creates_are_all_kept() {
        use std::sync::Arc;

        let store = Arc::new(TodoStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let scopes = all_scopes();
                    for i in 0..50 {
                        store.create(&scopes, format!("{t}-{i}"), None).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 400);
        let inner = store.inner.read();
        assert_eq!(inner.index.len(), 400);
    }
}
