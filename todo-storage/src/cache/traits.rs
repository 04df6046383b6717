//! Cache backend trait and usage statistics.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Serialize;
use std::time::Duration;
use todo_core::CacheResult;

/// Lazily produced, finite sequence of cache keys.
pub type KeyStream<'a> = BoxStream<'a, CacheResult<String>>;

/// Cache backend trait for pluggable cache implementations.
///
/// Values are opaque bytes; serialization is the caller's concern.
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value. Expired entries are reported as absent.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store a value that expires after `ttl`, replacing any existing entry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Delete a value. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Enumerate every live key starting with `prefix`.
    ///
    /// No I/O happens until the stream is first polled; connection failures
    /// surface as `Err` items.
    fn scan_keys_by_prefix(&self, prefix: &str) -> KeyStream<'_>;

    /// Short backend name, reported as the cache mode.
    fn backend_name(&self) -> &'static str;
}

/// Statistics about cache usage, as seen by the cache-aside layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheStats {
    /// Reads answered from the cache.
    pub hits: u64,
    /// Reads that had to go to the store.
    pub misses: u64,
    /// Entries written after a store read.
    pub populated: u64,
    /// Entries deleted after a store write.
    pub invalidated: u64,
    /// Cache calls that failed or timed out.
    pub errors: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
