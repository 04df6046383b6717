//! Todo API Server Entry Point
//!
//! Loads configuration, connects the store and the optional cache, and
//! serves the Axum router until Ctrl-C.

use std::sync::Arc;

use todo_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, AuthService,
    DbConfig, PgStore, RedisCache, RedisConfig,
};
use todo_storage::{CacheAside, CacheBackend, TodoStore};

use todo_api::telemetry::{init_tracer, TelemetryConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let auth_config = AuthConfig::from_env();
    auth_config.validate_for_production()?;

    let db_config = DbConfig::from_env();
    tracing::info!(config = ?db_config, "Connecting to database");
    let store = PgStore::from_config(&db_config)?;
    store.init_schema().await?;

    let redis_config = RedisConfig::from_env();
    let redis = RedisCache::from_config(&redis_config)?;
    if let Some(redis) = &redis {
        // The cache stays wired in either way; each call falls back on failure.
        if let Err(e) = redis.ping().await {
            tracing::warn!(error = %e, "Redis unreachable at startup, serving from the store until it recovers");
        }
    }

    let store_handle: Arc<dyn TodoStore> = Arc::new(store.clone());
    let cache_handle = redis
        .clone()
        .map(|redis| Arc::new(redis) as Arc<dyn CacheBackend>);
    let todos = CacheAside::new(
        Arc::clone(&store_handle),
        cache_handle,
        redis_config.cache_config(),
    );
    tracing::info!(cache_mode = todos.cache_mode(), "Cache-aside layer ready");

    let auth = AuthService::new(store_handle, auth_config);
    let state = AppState::new(todos, auth, redis.clone());
    let app = create_api_router(state, &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting todo API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    store.pool().close();
    if let Some(redis) = &redis {
        redis.pool().close();
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
