//! Middleware and request guards for the todo API.
//!
//! - `auth`: bearer-token extractor gating mutating routes
//!
//! Request tracing and metrics live in `telemetry::middleware`.

mod auth;

pub use auth::{bearer_token, AuthUser};
