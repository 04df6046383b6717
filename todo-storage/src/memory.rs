//! In-memory store used by tests and local development.

use crate::TodoStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use todo_core::{
    EntityType, NewTodo, Page, StoreError, StoreResult, Todo, TodoId, User, UserId,
};

#[derive(Debug, Default)]
struct TodoTable {
    rows: BTreeMap<TodoId, Todo>,
    last_id: i64,
}

#[derive(Debug, Default)]
struct UserTable {
    rows: BTreeMap<UserId, User>,
    last_id: i64,
}

/// In-memory store. Ids are assigned sequentially starting at 1.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    todos: Arc<RwLock<TodoTable>>,
    users: Arc<RwLock<UserTable>>,
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::LockPoisoned)
}

/// Clamp a caller-provided window bound to a usable `usize`.
fn window_bound(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get count of stored todos.
    pub fn todo_count(&self) -> usize {
        self.todos.read().map(|t| t.rows.len()).unwrap_or(0)
    }

    /// Get count of registered users.
    pub fn user_count(&self) -> usize {
        self.users.read().map(|u| u.rows.len()).unwrap_or(0)
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn insert_todo(&self, todo: NewTodo) -> StoreResult<Todo> {
        let mut table = write(&self.todos)?;
        table.last_id += 1;
        let stored = todo.into_todo(TodoId::new(table.last_id));
        table.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_todo(&self, id: TodoId) -> StoreResult<Option<Todo>> {
        Ok(read(&self.todos)?.rows.get(&id).cloned())
    }

    async fn list_todos(&self, page: Page) -> StoreResult<Vec<Todo>> {
        let table = read(&self.todos)?;
        Ok(table
            .rows
            .values()
            .skip(window_bound(page.skip))
            .take(window_bound(page.limit))
            .cloned()
            .collect())
    }

    async fn update_todo_done(&self, id: TodoId, done: bool) -> StoreResult<Option<Todo>> {
        let mut table = write(&self.todos)?;
        Ok(table.rows.get_mut(&id).map(|todo| {
            todo.done = done;
            todo.clone()
        }))
    }

    async fn delete_todo(&self, id: TodoId) -> StoreResult<Option<Todo>> {
        Ok(write(&self.todos)?.rows.remove(&id))
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?.rows.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, username: &str, hashed_password: &str) -> StoreResult<User> {
        let mut table = write(&self.users)?;
        if table.rows.values().any(|u| u.username == username) {
            return Err(StoreError::Duplicate {
                entity_type: EntityType::User,
                field: "username".to_string(),
            });
        }
        table.last_id += 1;
        let user = User {
            id: UserId::new(table.last_id),
            username: username.to_string(),
            hashed_password: hashed_password.to_string(),
            created_at: Utc::now(),
        };
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn health_check(&self) -> StoreResult<()> {
        read(&self.todos).map(|_| ())
    }
}

// ============================================================================
// TESTS
// ============================================================================
