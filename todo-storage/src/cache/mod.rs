//! Cache capability contract and the in-process backend.
//!
//! The cache is a plain key-value store with per-entry TTL and prefix
//! enumeration. It owns no policy: what to cache and when to invalidate is
//! decided by [`CacheAside`](crate::CacheAside).

pub mod memory;
pub mod traits;

pub use memory::MemoryCache;
pub use traits::{CacheBackend, CacheStats, KeyStream};
