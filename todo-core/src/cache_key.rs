//! Deterministic cache keys for the two todo key families.
//!
//! - `todo:{id}` holds a single serialized [`Todo`](crate::Todo)
//! - `todo:list:{skip}:{limit}` holds one serialized page of todos
//!
//! A single-item key can never collide with a list key: ids are integers,
//! so `todo:{id}` never contains a second `:` and never starts with
//! [`CacheKey::TODO_LIST_PREFIX`].

use crate::TodoId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default page size when `limit` is omitted.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Largest page size a caller may request.
pub const MAX_LIST_LIMIT: i64 = 1000;

/// A cache key string. Only constructible through the family constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Prefix shared by every list-page key. Used for scan-based invalidation.
    pub const TODO_LIST_PREFIX: &'static str = "todo:list:";

    /// Key for a single todo.
    pub fn todo(id: TodoId) -> Self {
        Self(format!("todo:{}", id))
    }

    /// Key for one page of the todo list.
    pub fn todo_list(page: Page) -> Self {
        Self(format!(
            "{}{}:{}",
            Self::TODO_LIST_PREFIX,
            page.skip,
            page.limit
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key belongs to the list family.
    pub fn is_list_key(&self) -> bool {
        self.0.starts_with(Self::TODO_LIST_PREFIX)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Pagination window for list reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct Page {
    /// Number of todos to skip (ordered by id).
    #[serde(default)]
    pub skip: i64,
    /// Maximum number of todos to return.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIST_LIMIT
}

impl Page {
    pub const fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
