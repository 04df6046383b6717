//! REST API Route Handlers
//!
//! Router layout:
//! - `/todos`: todo CRUD (writes require a bearer token)
//! - `/auth`: registration and token issuance
//! - `/health/*`: liveness and readiness probes
//! - `/metrics`: Prometheus exposition
//! - `/openapi.json`: OpenAPI document (feature `openapi`)

pub mod auth;
pub mod health;
pub mod todo;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use auth::create_router as auth_router;
pub use health::create_router as health_router;
pub use todo::create_router as todo_router;

#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

/// Build the CORS layer from the configured allow-list.
///
/// Credentials are only allowed together with an explicit origin list; an
/// empty list denies every cross-origin request.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    tracing::info!(origins = ?config.cors_origins, "CORS allow-list configured");

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs))
        .allow_origin(origins);

    if config.cors_allow_credentials {
        cors.allow_credentials(true)
    } else {
        cors
    }
}

/// Assemble the full application router.
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    let router = Router::new()
        .nest("/todos", todo::create_router(state.clone()))
        .nest("/auth", auth::create_router(state.clone()))
        .nest("/health", health::create_router(state.clone()))
        .route("/metrics", get(metrics_handler).with_state(state.todos));

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", get(openapi_json));

    router
        .layer(from_fn(observability_middleware))
        .layer(build_cors_layer(api_config))
}
