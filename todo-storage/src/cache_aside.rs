//! Cache-aside orchestration for todo reads and writes.
//!
//! Reads check the cache, fall back to the store on a miss, then populate
//! the cache. Writes go to the store first and invalidate afterwards: the
//! item key for the affected id and every list page under
//! [`CacheKey::TODO_LIST_PREFIX`].
//!
//! The cache is strictly optional. Every cache call is bounded by
//! [`CacheConfig::op_timeout`] and any failure is logged and counted, never
//! returned; the public methods can only fail with a [`StoreError`].
//!
//! Concurrent misses on the same key are not coalesced.
//!
//! [`StoreError`]: todo_core::StoreError

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::TryStreamExt;
use serde::{de::DeserializeOwned, Serialize};
use todo_core::{
    CacheError, CacheKey, CacheResult, NewTodo, Page, StoreResult, Todo, TodoId,
    DEFAULT_CACHE_TTL,
};
use tracing::{debug, info, warn};

use crate::cache::{CacheBackend, CacheStats};
use crate::store::TodoStore;

/// Default bound on a single cache call.
pub const DEFAULT_CACHE_OP_TIMEOUT: Duration = Duration::from_millis(250);

/// Configuration for the cache-aside layer.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,
    /// Upper bound on each cache call. `None` waits indefinitely.
    pub op_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            op_timeout: Some(DEFAULT_CACHE_OP_TIMEOUT),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the per-call timeout.
    pub fn with_op_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.op_timeout = timeout;
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    populated: AtomicU64,
    invalidated: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            populated: self.populated.load(Ordering::Relaxed),
            invalidated: self.invalidated.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Mediates every todo read and write between the store and the cache.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn TodoStore>,
    cache: Option<Arc<dyn CacheBackend>>,
    config: CacheConfig,
    counters: Arc<Counters>,
}

impl CacheAside {
    /// Create an orchestrator. `cache: None` means direct store pass-through.
    pub fn new(
        store: Arc<dyn TodoStore>,
        cache: Option<Arc<dyn CacheBackend>>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store,
            cache,
            config,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Create an orchestrator with caching disabled.
    pub fn uncached(store: Arc<dyn TodoStore>) -> Self {
        Self::new(store, None, CacheConfig::default())
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn TodoStore> {
        &self.store
    }

    /// Whether a cache backend is configured.
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Backend name, or `"disabled"` when running without a cache.
    pub fn cache_mode(&self) -> &'static str {
        self.cache
            .as_ref()
            .map(|cache| cache.backend_name())
            .unwrap_or("disabled")
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Snapshot of cache usage counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    // ========================================================================
    // READ PATH
    // ========================================================================

    /// Get a single todo. `Ok(None)` means the id does not exist.
    pub async fn get_todo(&self, id: TodoId) -> StoreResult<Option<Todo>> {
        let key = CacheKey::todo(id);
        if let Some(todo) = self.read_cached::<Todo>(&key).await {
            return Ok(Some(todo));
        }

        let todo = self.store.get_todo(id).await?;
        if let Some(todo) = &todo {
            self.populate(&key, todo).await;
        }
        Ok(todo)
    }

    /// Get one page of todos ordered by id.
    pub async fn list_todos(&self, page: Page) -> StoreResult<Vec<Todo>> {
        let key = CacheKey::todo_list(page);
        if let Some(todos) = self.read_cached::<Vec<Todo>>(&key).await {
            return Ok(todos);
        }

        let todos = self.store.list_todos(page).await?;
        self.populate(&key, &todos).await;
        Ok(todos)
    }

    // ========================================================================
    // WRITE PATH
    // ========================================================================

    /// Insert a todo, then invalidate every cached list page.
    pub async fn create_todo(&self, todo: NewTodo) -> StoreResult<Todo> {
        let created = self.store.insert_todo(todo).await?;
        info!(todo_id = %created.id, "DB WRITE");
        self.invalidate(None).await;
        Ok(created)
    }

    /// Set `done` on a todo. Returns `Ok(None)` without touching the cache
    /// when the id does not exist.
    pub async fn update_done(&self, id: TodoId, done: bool) -> StoreResult<Option<Todo>> {
        let updated = self.store.update_todo_done(id, done).await?;
        if updated.is_some() {
            info!(todo_id = %id, done, "DB UPDATE");
            self.invalidate(Some(id)).await;
        }
        Ok(updated)
    }

    /// Delete a todo. Returns `Ok(None)` without touching the cache when the
    /// id does not exist.
    pub async fn delete_todo(&self, id: TodoId) -> StoreResult<Option<Todo>> {
        let deleted = self.store.delete_todo(id).await?;
        if deleted.is_some() {
            info!(todo_id = %id, "DB DELETE");
            self.invalidate(Some(id)).await;
        }
        Ok(deleted)
    }

    // ========================================================================
    // CACHE HELPERS
    // ========================================================================

    /// Run one cache call under the configured timeout.
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> CacheResult<T>
    where
        F: Future<Output = CacheResult<T>>,
    {
        match self.config.op_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(CacheError::Timeout {
                    operation: operation.to_string(),
                }),
            },
            None => call.await,
        }
    }

    /// Swallow a cache failure: log it, count it, carry on without the cache.
    fn absorb<T>(&self, operation: &'static str, key: &str, result: CacheResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                Counters::bump(&self.counters.errors, 1);
                warn!(operation, key, error = %e, "cache unavailable for this call");
                None
            }
        }
    }

    async fn read_cached<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let cache = self.cache.as_ref()?;
        let key = key.as_str();

        let fetched = self.bounded("get", cache.get(key)).await;
        let decoded = match self.absorb("get", key, fetched).flatten() {
            Some(bytes) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            None => None,
        };

        match decoded {
            Some(value) => {
                Counters::bump(&self.counters.hits, 1);
                info!(key, "CACHE HIT");
                Some(value)
            }
            None => {
                Counters::bump(&self.counters.misses, 1);
                info!(key, "CACHE MISS");
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let key = key.as_str();

        let bytes = serde_json::to_vec(value).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        });
        let Some(bytes) = self.absorb("set", key, bytes) else {
            return;
        };

        let written = self.bounded("set", cache.set(key, bytes, self.config.ttl)).await;
        if self.absorb("set", key, written).is_some() {
            Counters::bump(&self.counters.populated, 1);
            debug!(key, ttl_secs = self.config.ttl.as_secs(), "CACHE SET");
        }
    }

    /// Drop the item key for `id` (if any) and every list page.
    async fn invalidate(&self, id: Option<TodoId>) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };

        if let Some(id) = id {
            let key = CacheKey::todo(id);
            let deleted = self.bounded("delete", cache.delete(key.as_str())).await;
            if self.absorb("delete", key.as_str(), deleted).is_some() {
                Counters::bump(&self.counters.invalidated, 1);
                info!(key = key.as_str(), "CACHE DELETE");
            }
        }

        let prefix = CacheKey::TODO_LIST_PREFIX;
        let swept = self.sweep_prefix(cache.as_ref(), prefix).await;
        if let Some(count) = self.absorb("scan", prefix, swept) {
            info!(prefix, count, "CACHE DELETE");
        }
    }

    /// Delete every key under `prefix`, stopping at the first failure.
    /// Each delete is counted as it lands, so a partial sweep still shows up
    /// in the stats.
    async fn sweep_prefix(&self, cache: &dyn CacheBackend, prefix: &str) -> CacheResult<u64> {
        let mut keys = cache.scan_keys_by_prefix(prefix);
        let mut deleted = 0;
        while let Some(key) = self.bounded("scan", keys.try_next()).await? {
            self.bounded("delete", cache.delete(&key)).await?;
            Counters::bump(&self.counters.invalidated, 1);
            debug!(key = key.as_str(), "CACHE DELETE");
            deleted += 1;
        }
        Ok(deleted)
    }
}

impl std::fmt::Debug for CacheAside {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAside")
            .field("cache_mode", &self.cache_mode())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyStream, MemoryCache, MemoryStore};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicUsize;

    /// Memory cache whose deletes start failing once `budget` is spent.
    #[derive(Debug, Clone, Default)]
    struct DeleteBudgetCache {
        inner: MemoryCache,
        budget: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CacheBackend for DeleteBudgetCache {
        async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> CacheResult<()> {
            let spent = self
                .budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            match spent {
                Ok(_) => self.inner.delete(key).await,
                Err(_) => Err(CacheError::Unavailable {
                    reason: "connection reset".to_string(),
                }),
            }
        }

        fn scan_keys_by_prefix(&self, prefix: &str) -> KeyStream<'_> {
            self.inner.scan_keys_by_prefix(prefix)
        }

        fn backend_name(&self) -> &'static str {
            "memory"
        }
    }

    fn buy_milk() -> NewTodo {
        let due = Utc
            .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .expect("valid date");
        NewTodo::new("buy milk", due)
    }

    fn cached() -> (CacheAside, MemoryStore, MemoryCache) {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        let aside = CacheAside::new(
            Arc::new(store.clone()),
            Some(Arc::new(cache.clone())),
            CacheConfig::new(),
        );
        (aside, store, cache)
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new()
            .with_ttl(Duration::from_secs(5))
            .with_op_timeout(None);
        assert_eq!(config.ttl, Duration::from_secs(5));
        assert_eq!(config.op_timeout, None);
        assert_eq!(CacheConfig::default().ttl, DEFAULT_CACHE_TTL);
    }

    #[tokio::test]
    async fn test_get_populates_item_key() {
        let (aside, _store, cache) = cached();
        let created = aside.create_todo(buy_milk()).await.unwrap();

        let fetched = aside.get_todo(created.id).await.unwrap();
        assert_eq!(fetched.as_ref(), Some(&created));

        let raw = cache.peek("todo:1").expect("item key populated");
        let cached: Todo = serde_json::from_slice(&raw).unwrap();
        assert_eq!(cached, created);

        aside.get_todo(created.id).await.unwrap();
        let stats = aside.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.populated, 1);
    }

    #[tokio::test]
    async fn test_missing_id_is_not_cached() {
        let (aside, _store, cache) = cached();
        assert!(aside.get_todo(TodoId::new(42)).await.unwrap().is_none());
        assert!(!cache.contains("todo:42"));
    }

    #[tokio::test]
    async fn test_update_missing_id_skips_invalidation() {
        let (aside, _store, cache) = cached();
        aside.list_todos(Page::default()).await.unwrap();
        assert!(cache.contains("todo:list:0:100"));

        let updated = aside.update_done(TodoId::new(7), true).await.unwrap();
        assert!(updated.is_none());
        assert!(cache.contains("todo:list:0:100"));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_treated_as_miss_and_replaced() {
        let (aside, store, cache) = cached();
        let created = store.insert_todo(buy_milk()).await.unwrap();
        cache
            .set("todo:1", b"not json".to_vec(), DEFAULT_CACHE_TTL)
            .await
            .unwrap();

        let fetched = aside.get_todo(created.id).await.unwrap();
        assert_eq!(fetched, Some(created.clone()));

        let raw = cache.peek("todo:1").unwrap();
        assert_eq!(serde_json::from_slice::<Todo>(&raw).unwrap(), created);
        assert_eq!(aside.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_partial_sweep_counts_deleted_keys() {
        let cache = DeleteBudgetCache::default();
        let aside = CacheAside::new(
            Arc::new(MemoryStore::new()),
            Some(Arc::new(cache.clone())),
            CacheConfig::new(),
        );
        for skip in 0..3 {
            aside.list_todos(Page::new(skip, 10)).await.unwrap();
        }
        assert_eq!(aside.stats().populated, 3);

        cache.budget.store(2, Ordering::SeqCst);
        aside.create_todo(buy_milk()).await.unwrap();

        let stats = aside.stats();
        assert_eq!(stats.invalidated, 2);
        assert_eq!(stats.errors, 1);
        let remaining = (0..3)
            .filter(|skip| cache.inner.contains(&format!("todo:list:{}:10", skip)))
            .count();
        assert_eq!(remaining, 1);
    }

    #[tokio::test]
    async fn test_uncached_mode_reports_disabled() {
        let store = MemoryStore::new();
        let aside = CacheAside::uncached(Arc::new(store));
        assert!(!aside.is_cached());
        assert_eq!(aside.cache_mode(), "disabled");

        let created = aside.create_todo(buy_milk()).await.unwrap();
        assert_eq!(aside.get_todo(created.id).await.unwrap(), Some(created));
        assert_eq!(aside.stats(), CacheStats::default());
    }
}
