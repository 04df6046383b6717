//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use todo_storage::{CacheAside, CacheBackend, TodoStore};

use crate::auth::{AuthConfig, AuthService};
use crate::cache::RedisCache;

/// Application-wide state shared across all routes.
///
/// Built once by the entry point, which also owns the pools behind it and
/// closes them at shutdown.
#[derive(Clone)]
pub struct AppState {
    /// Cache-aside front for every todo read and write.
    pub todos: CacheAside,
    /// Registration, login and bearer-token checks.
    pub auth: AuthService,
    /// Redis handle kept for readiness probes; `None` in pass-through mode.
    pub redis: Option<RedisCache>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(todos: CacheAside, auth: AuthService, redis: Option<RedisCache>) -> Self {
        Self {
            todos,
            auth,
            redis,
            start_time: Instant::now(),
        }
    }

    /// State over an arbitrary store and optional cache, with no Redis probe.
    pub fn from_parts(
        store: Arc<dyn TodoStore>,
        cache: Option<Arc<dyn CacheBackend>>,
        cache_config: todo_storage::CacheConfig,
        auth_config: AuthConfig,
    ) -> Self {
        let todos = CacheAside::new(Arc::clone(&store), cache, cache_config);
        let auth = AuthService::new(store, auth_config);
        Self::new(todos, auth, None)
    }
}

crate::impl_from_ref!(CacheAside, todos);
crate::impl_from_ref!(AuthService, auth);
crate::impl_from_ref!(Option<RedisCache>, redis);
crate::impl_from_ref!(Instant, start_time);
