//! Todo API - REST Layer for the Cache-Aside Todo Service
//!
//! Axum routes over a [`todo_storage::CacheAside`] front. Reads populate the
//! cache, writes invalidate it, and a cache outage degrades to plain store
//! access. Postgres and Redis adapters live here, next to bearer-token auth
//! and the observability stack.

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod macros;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use auth::{
    generate_jwt_token, validate_jwt_token, AccessToken, AuthConfig, AuthService, Claims,
    JwtClock, JwtSecret,
};
pub use cache::{RedisCache, RedisConfig};
pub use config::ApiConfig;
pub use db::{DbConfig, PgStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::AuthUser;
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
pub use types::*;
