//! Redis Cache Module
//!
//! [`CacheBackend`] over a deadpool-redis pool. Values are stored with
//! `SET EX`; prefix enumeration walks the keyspace with cursor-driven
//! `SCAN MATCH`, one page per poll.

use async_trait::async_trait;
use deadpool_redis::{Pool, PoolConfig, Runtime};
use futures_util::stream::{self, StreamExt};
use redis::AsyncCommands;
use std::time::Duration;
use todo_core::{CacheError, CacheResult, DEFAULT_CACHE_TTL};
use todo_storage::{CacheBackend, CacheConfig, KeyStream};

use crate::db::redact_url;
use crate::error::{ApiError, ApiResult};

/// Keys requested per `SCAN` round trip.
const SCAN_COUNT: usize = 100;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Cache configuration.
///
/// Caching is on only when a URL is set and `enabled` is true; otherwise the
/// server runs in pass-through mode.
#[derive(Clone)]
pub struct RedisConfig {
    /// Explicit kill switch (`TODO_CACHE_ENABLED`)
    pub enabled: bool,
    /// Redis connection string; `None` disables caching
    pub url: Option<String>,
    /// Maximum pooled connections
    pub pool_size: usize,
    /// Entry TTL
    pub ttl: Duration,
    /// Per-call timeout applied by the cache-aside layer
    pub op_timeout: Option<Duration>,
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("enabled", &self.enabled)
            .field("url", &self.url.as_deref().map(redact_url))
            .field("pool_size", &self.pool_size)
            .field("ttl", &self.ttl)
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            pool_size: 8,
            ttl: DEFAULT_CACHE_TTL,
            op_timeout: Some(Duration::from_millis(250)),
        }
    }
}

impl RedisConfig {
    /// Load cache configuration from the environment.
    ///
    /// - `TODO_REDIS_URL`, falling back to `REDIS_URL` (unset: no cache)
    /// - `TODO_CACHE_ENABLED` (default: true)
    /// - `TODO_REDIS_POOL_SIZE` (default: 8)
    /// - `TODO_CACHE_TTL_SECS` (default: 60)
    /// - `TODO_CACHE_TIMEOUT_MS` (default: 250, `0` disables)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let url = std::env::var("TODO_REDIS_URL")
            .or_else(|_| std::env::var("REDIS_URL"))
            .ok()
            .filter(|url| !url.trim().is_empty());

        let enabled = std::env::var("TODO_CACHE_ENABLED")
            .map(|s| !matches!(s.to_lowercase().as_str(), "false" | "0" | "no" | "off"))
            .unwrap_or(defaults.enabled);

        let op_timeout = match std::env::var("TODO_CACHE_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => defaults.op_timeout,
        };

        Self {
            enabled,
            url,
            pool_size: std::env::var("TODO_REDIS_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.pool_size),
            ttl: std::env::var("TODO_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.ttl),
            op_timeout,
        }
    }

    /// The URL to connect to, if caching is active.
    pub fn active_url(&self) -> Option<&str> {
        if self.enabled {
            self.url.as_deref()
        } else {
            None
        }
    }

    /// Settings for the cache-aside layer.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_ttl(self.ttl)
            .with_op_timeout(self.op_timeout)
    }

    /// Create a connection pool for `url`. No connection is opened yet.
    pub fn create_pool(&self, url: &str) -> ApiResult<Pool> {
        let mut cfg = deadpool_redis::Config::from_url(url);

        let mut pool_config = PoolConfig::new(self.pool_size);
        let connect_timeout = self.op_timeout.unwrap_or(Duration::from_secs(5));
        pool_config.timeouts.wait = Some(connect_timeout);
        pool_config.timeouts.create = Some(connect_timeout);
        pool_config.timeouts.recycle = Some(connect_timeout);
        cfg.pool = Some(pool_config);

        cfg.create_pool(Some(Runtime::Tokio1))
            .map_err(|e| ApiError::internal_error(format!("Failed to create Redis pool: {}", e)))
    }
}

// ============================================================================
// ERROR CONVERSION
// ============================================================================

fn redis_error(err: redis::RedisError) -> CacheError {
    if err.is_timeout() {
        return CacheError::Timeout {
            operation: "redis command".to_string(),
        };
    }
    CacheError::Unavailable {
        reason: err.to_string(),
    }
}

fn pool_error(err: deadpool_redis::PoolError) -> CacheError {
    match err {
        deadpool_redis::PoolError::Timeout(_) => CacheError::Timeout {
            operation: "connect".to_string(),
        },
        other => CacheError::Unavailable {
            reason: other.to_string(),
        },
    }
}

// ============================================================================
// REDIS CACHE
// ============================================================================

enum ScanCursor {
    Start,
    At(u64),
    Done,
}

/// Redis-backed [`CacheBackend`].
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a cache from configuration; `None` when caching is off.
    pub fn from_config(config: &RedisConfig) -> ApiResult<Option<Self>> {
        match config.active_url() {
            Some(url) => {
                let pool = config.create_pool(url)?;
                tracing::info!(url = %redact_url(url), "Redis cache configured");
                Ok(Some(Self::new(pool)))
            }
            None => {
                tracing::info!("Redis cache disabled, reading straight from the store");
                Ok(None)
            }
        }
    }

    /// The underlying pool, for shutdown.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Round-trip a `PING` (for health checks).
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;
        Ok(())
    }

    async fn scan_page(&self, pattern: &str, cursor: u64) -> CacheResult<(u64, Vec<String>)> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let page: (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;
        Ok(page)
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("pool_size", &self.pool.status().size)
            .finish()
    }
}

/// Escape glob metacharacters so a prefix matches literally in `SCAN MATCH`.
fn scan_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        conn.get::<_, Option<Vec<u8>>>(key).await.map_err(redis_error)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(redis_error)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        conn.del::<_, ()>(key).await.map_err(redis_error)
    }

    fn scan_keys_by_prefix(&self, prefix: &str) -> KeyStream<'_> {
        let pattern = scan_pattern(prefix);
        stream::unfold(ScanCursor::Start, move |cursor| {
            let pattern = pattern.clone();
            async move {
                let at = match cursor {
                    ScanCursor::Start => 0,
                    ScanCursor::At(at) => at,
                    ScanCursor::Done => return None,
                };
                match self.scan_page(&pattern, at).await {
                    Ok((next, keys)) => {
                        let cursor = if next == 0 {
                            ScanCursor::Done
                        } else {
                            ScanCursor::At(next)
                        };
                        let items: Vec<CacheResult<String>> = keys.into_iter().map(Ok).collect();
                        Some((items, cursor))
                    }
                    Err(e) => Some((vec![Err(e)], ScanCursor::Done)),
                }
            }
        })
        .flat_map(stream::iter)
        .boxed()
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
