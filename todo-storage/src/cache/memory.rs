//! In-process cache backend on a `DashMap`.

use super::traits::{CacheBackend, KeyStream};
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use todo_core::CacheResult;
use tokio::time::Instant;

/// A cached entry with TTL support.
#[derive(Clone, Debug)]
struct CachedEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

impl CachedEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Single-instance cache. Expired entries are dropped lazily on access.
///
/// Expiry follows `tokio::time`, so tests can drive it with a paused clock.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, CachedEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live (unexpired) entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    /// Raw bytes of a live entry, bypassing the async interface.
    pub fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.data.clone())
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let hit = self.peek(key);
        if hit.is_none() {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.entries
            .insert(key.to_string(), CachedEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn scan_keys_by_prefix(&self, prefix: &str) -> KeyStream<'_> {
        // Snapshot first: holding shard guards while the caller deletes
        // matching keys would deadlock.
        let keys: Vec<CacheResult<String>> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix) && !entry.is_expired())
            .map(|entry| Ok(entry.key().clone()))
            .collect();
        stream::iter(keys).boxed()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
