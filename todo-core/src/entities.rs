//! Todo and user records

use crate::{Timestamp, TodoId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A persisted todo item.
///
/// This is also the cached representation: `todo:{id}` and
/// `todo:list:{skip}:{limit}` entries hold the JSON form of `Todo` /
/// `Vec<Todo>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Todo {
    pub id: TodoId,
    pub content: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub due: Timestamp,
    pub done: bool,
}

/// Fields required to insert a todo. `done` always starts out false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewTodo {
    pub content: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub due: Timestamp,
}

impl NewTodo {
    pub fn new(content: impl Into<String>, due: Timestamp) -> Self {
        Self {
            content: content.into(),
            due,
        }
    }

    /// Materialize into a stored todo with the assigned id.
    pub fn into_todo(self, id: TodoId) -> Todo {
        Todo {
            id,
            content: self.content,
            due: self.due,
            done: false,
        }
    }
}

/// A registered user. Never mutated or deleted.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// PHC-formatted password hash. Never the raw password.
    pub hashed_password: String,
    pub created_at: Timestamp,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("hashed_password", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}
