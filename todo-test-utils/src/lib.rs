//! Todo Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Instrumented and failing store/cache adapters
//! - Proptest generators for todo types
//! - Fixtures for common scenarios

pub use todo_storage::{CacheAside, CacheBackend, CacheConfig, MemoryCache, MemoryStore, TodoStore};

pub use todo_core::{
    CacheError, CacheKey, CacheResult, NewTodo, Page, StoreError, StoreResult, Timestamp, Todo,
    TodoId, User, UserId,
};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use todo_storage::KeyStream;

// ============================================================================
// INSTRUMENTED STORE
// ============================================================================

/// Per-operation call counts recorded by [`CountingStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub insert: usize,
    pub get: usize,
    pub list: usize,
    pub update: usize,
    pub delete: usize,
}

impl StoreCalls {
    /// Number of mutating calls.
    pub fn writes(&self) -> usize {
        self.insert + self.update + self.delete
    }

    /// Number of todo reads.
    pub fn reads(&self) -> usize {
        self.get + self.list
    }
}

#[derive(Debug, Default)]
struct CallCounters {
    insert: AtomicUsize,
    get: AtomicUsize,
    list: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
}

/// [`MemoryStore`] wrapper that counts todo calls.
#[derive(Debug, Clone, Default)]
pub struct CountingStore {
    inner: MemoryStore,
    counters: Arc<CallCounters>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped store, for seeding data without counting.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Snapshot of the call counts so far.
    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            insert: self.counters.insert.load(Ordering::SeqCst),
            get: self.counters.get.load(Ordering::SeqCst),
            list: self.counters.list.load(Ordering::SeqCst),
            update: self.counters.update.load(Ordering::SeqCst),
            delete: self.counters.delete.load(Ordering::SeqCst),
        }
    }

    fn count(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TodoStore for CountingStore {
    async fn insert_todo(&self, todo: NewTodo) -> StoreResult<Todo> {
        Self::count(&self.counters.insert);
        self.inner.insert_todo(todo).await
    }

    async fn get_todo(&self, id: TodoId) -> StoreResult<Option<Todo>> {
        Self::count(&self.counters.get);
        self.inner.get_todo(id).await
    }

    async fn list_todos(&self, page: Page) -> StoreResult<Vec<Todo>> {
        Self::count(&self.counters.list);
        self.inner.list_todos(page).await
    }

    async fn update_todo_done(&self, id: TodoId, done: bool) -> StoreResult<Option<Todo>> {
        Self::count(&self.counters.update);
        self.inner.update_todo_done(id, done).await
    }

    async fn delete_todo(&self, id: TodoId) -> StoreResult<Option<Todo>> {
        Self::count(&self.counters.delete);
        self.inner.delete_todo(id).await
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        self.inner.get_user(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.inner.get_user_by_username(username).await
    }

    async fn create_user(&self, username: &str, hashed_password: &str) -> StoreResult<User> {
        self.inner.create_user(username, hashed_password).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
}

/// Store whose every call fails as if the database were down.
#[derive(Debug, Clone, Default)]
pub struct FailingStore;

impl FailingStore {
    fn down<T>() -> StoreResult<T> {
        Err(StoreError::Unavailable {
            reason: "connection refused".to_string(),
        })
    }
}

#[async_trait]
impl TodoStore for FailingStore {
    async fn insert_todo(&self, _todo: NewTodo) -> StoreResult<Todo> {
        Self::down()
    }

    async fn get_todo(&self, _id: TodoId) -> StoreResult<Option<Todo>> {
        Self::down()
    }

    async fn list_todos(&self, _page: Page) -> StoreResult<Vec<Todo>> {
        Self::down()
    }

    async fn update_todo_done(&self, _id: TodoId, _done: bool) -> StoreResult<Option<Todo>> {
        Self::down()
    }

    async fn delete_todo(&self, _id: TodoId) -> StoreResult<Option<Todo>> {
        Self::down()
    }

    async fn get_user(&self, _id: UserId) -> StoreResult<Option<User>> {
        Self::down()
    }

    async fn get_user_by_username(&self, _username: &str) -> StoreResult<Option<User>> {
        Self::down()
    }

    async fn create_user(&self, _username: &str, _hashed_password: &str) -> StoreResult<User> {
        Self::down()
    }

    async fn health_check(&self) -> StoreResult<()> {
        Self::down()
    }
}

// ============================================================================
// INSTRUMENTED AND FAILING CACHES
// ============================================================================

/// A cache call observed by [`RecordingCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    Get(String),
    Set(String),
    Delete(String),
    Scan(String),
}

/// [`MemoryCache`] wrapper that records every call in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingCache {
    inner: MemoryCache,
    ops: Arc<Mutex<Vec<CacheOp>>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped cache, for direct inspection.
    pub fn inner(&self) -> &MemoryCache {
        &self.inner
    }

    /// All calls recorded so far.
    pub fn ops(&self) -> Vec<CacheOp> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Forget recorded calls.
    pub fn clear_ops(&self) {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn record(&self, op: CacheOp) {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).push(op);
    }
}

#[async_trait]
impl CacheBackend for RecordingCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.record(CacheOp::Get(key.to_string()));
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.record(CacheOp::Set(key.to_string()));
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.record(CacheOp::Delete(key.to_string()));
        self.inner.delete(key).await
    }

    fn scan_keys_by_prefix(&self, prefix: &str) -> KeyStream<'_> {
        self.record(CacheOp::Scan(prefix.to_string()));
        self.inner.scan_keys_by_prefix(prefix)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Cache whose every call fails as if the server refused connections.
#[derive(Debug, Clone, Default)]
pub struct UnavailableCache {
    attempts: Arc<AtomicUsize>,
}

impl UnavailableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls attempted against this cache.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn refuse(&self) -> CacheError {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        CacheError::Unavailable {
            reason: "connection refused".to_string(),
        }
    }
}

#[async_trait]
impl CacheBackend for UnavailableCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(self.refuse())
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> CacheResult<()> {
        Err(self.refuse())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(self.refuse())
    }

    fn scan_keys_by_prefix(&self, _prefix: &str) -> KeyStream<'_> {
        let err = self.refuse();
        stream::iter(vec![Err(err)]).boxed()
    }

    fn backend_name(&self) -> &'static str {
        "unavailable"
    }
}

/// Cache whose every call never completes.
#[derive(Debug, Clone, Default)]
pub struct HangingCache;

#[async_trait]
impl CacheBackend for HangingCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> CacheResult<()> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        std::future::pending().await
    }

    fn scan_keys_by_prefix(&self, _prefix: &str) -> KeyStream<'_> {
        stream::pending().boxed()
    }

    fn backend_name(&self) -> &'static str {
        "hanging"
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating todo types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a Timestamp (DateTime<Utc>).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // Whole seconds within 2020-2030
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(chrono::Utc::now)
        })
    }

    /// Generate non-blank todo content.
    pub fn arb_content() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9][a-zA-Z0-9 ]{0,40}"
    }

    /// Generate a NewTodo.
    pub fn arb_new_todo() -> impl Strategy<Value = NewTodo> {
        (arb_content(), arb_timestamp()).prop_map(|(content, due)| NewTodo::new(content, due))
    }

    /// Generate a valid pagination window.
    pub fn arb_page() -> impl Strategy<Value = Page> {
        (0i64..20, 0i64..20).prop_map(|(skip, limit)| Page::new(skip, limit))
    }

    /// Generate a TodoId.
    pub fn arb_todo_id() -> impl Strategy<Value = TodoId> {
        (1i64..10_000).prop_map(TodoId::new)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use chrono::{TimeZone, Utc};

    /// 2025-01-01T00:00:00Z
    pub fn new_year() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// `{content: "buy milk", due: "2025-01-01T00:00:00Z"}`
    pub fn buy_milk() -> NewTodo {
        NewTodo::new("buy milk", new_year())
    }

    /// A todo due at [`new_year`].
    pub fn new_todo(content: &str) -> NewTodo {
        NewTodo::new(content, new_year())
    }

    /// A cache-aside layer over the given store and cache with no timeout.
    pub fn cache_aside<S, C>(store: S, cache: C) -> CacheAside
    where
        S: TodoStore + 'static,
        C: CacheBackend + 'static,
    {
        CacheAside::new(
            Arc::new(store),
            Some(Arc::new(cache)),
            CacheConfig::new().with_op_timeout(None),
        )
    }
}
