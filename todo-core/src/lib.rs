//! Todo Core - Entity Types
//!
//! Pure data structures shared by the storage, cache and API crates.
//! This crate contains ONLY data types, cache key derivation and the error
//! taxonomy - no I/O.

pub mod cache_key;
pub mod entities;
pub mod error;
pub mod identity;

pub use cache_key::{CacheKey, Page, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
pub use entities::{NewTodo, Todo, User};
pub use error::{
    CacheError, CacheResult, ConfigError, EntityType, StoreError, StoreResult,
};
pub use identity::{Timestamp, TodoId, UserId};

use std::time::Duration;

/// TTL applied to every cache entry written by the cache-aside layer.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
