//! Async store trait for the source of truth.
//!
//! Implementations must be safe to share across request tasks. "Not found"
//! is expressed as `Ok(None)`; `Err` is reserved for failures of the store
//! itself.

use async_trait::async_trait;
use todo_core::{NewTodo, Page, StoreResult, Todo, TodoId, User, UserId};

/// Persistent todo and user records.
#[async_trait]
pub trait TodoStore: Send + Sync {
    // ========================================================================
    // TODO OPERATIONS
    // ========================================================================

    /// Insert a new todo. The store assigns the id; `done` starts false.
    async fn insert_todo(&self, todo: NewTodo) -> StoreResult<Todo>;

    /// Get a todo by id.
    async fn get_todo(&self, id: TodoId) -> StoreResult<Option<Todo>>;

    /// List todos ordered by id, skipping `page.skip` and returning at most
    /// `page.limit` records.
    async fn list_todos(&self, page: Page) -> StoreResult<Vec<Todo>>;

    /// Set the `done` flag. Returns the updated record, or `None` if absent.
    async fn update_todo_done(&self, id: TodoId, done: bool) -> StoreResult<Option<Todo>>;

    /// Delete a todo. Returns the removed record, or `None` if absent.
    async fn delete_todo(&self, id: TodoId) -> StoreResult<Option<Todo>>;

    // ========================================================================
    // USER OPERATIONS
    // ========================================================================

    /// Get a user by id.
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Get a user by username.
    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Create a user. Fails with [`StoreError::Duplicate`] if the username
    /// is taken.
    ///
    /// [`StoreError::Duplicate`]: todo_core::StoreError::Duplicate
    async fn create_user(&self, username: &str, hashed_password: &str) -> StoreResult<User>;

    // ========================================================================
    // HEALTH
    // ========================================================================

    /// Cheap round-trip used by readiness probes.
    async fn health_check(&self) -> StoreResult<()>;
}
