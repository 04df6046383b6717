//! Todo Storage - Capability Traits, In-Memory Adapters and Cache-Aside
//!
//! Defines the store and cache abstractions the rest of the workspace talks
//! to, plus [`CacheAside`], the orchestrator that populates the cache on reads
//! and invalidates it after writes. The Postgres and Redis adapters live in
//! todo-api.

pub mod cache;
pub mod cache_aside;
pub mod memory;
pub mod store;

pub use cache::{CacheBackend, CacheStats, KeyStream, MemoryCache};
pub use cache_aside::{CacheAside, CacheConfig};
pub use memory::MemoryStore;
pub use store::TodoStore;
