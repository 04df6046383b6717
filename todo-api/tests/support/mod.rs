//! Shared harness for the HTTP-level tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use todo_api::auth::{generate_jwt_token, test_clocks, AuthConfig, JwtSecret};
use todo_api::{create_api_router, ApiConfig, AppState};
use todo_storage::{CacheBackend, CacheConfig, TodoStore};
use todo_test_utils::{CountingStore, MemoryCache};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Auth settings with a pinned clock so token expiry is deterministic.
pub fn test_auth_config() -> AuthConfig {
    let mut config = AuthConfig::default();
    config.jwt_secret = match JwtSecret::new(TEST_SECRET.to_string()) {
        Ok(secret) => secret,
        Err(e) => panic!("test secret rejected: {}", e),
    };
    config.with_clock(Arc::new(test_clocks::valid()))
}

/// A router over a counting store and an optional cache.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: CountingStore,
}

impl TestApp {
    pub fn new(cache: Option<Arc<dyn CacheBackend>>) -> Self {
        let store = CountingStore::new();
        Self::with_store(store, cache)
    }

    /// Counting store fronted by a fresh in-process cache.
    pub fn cached() -> (Self, MemoryCache) {
        let cache = MemoryCache::new();
        let app = Self::new(Some(Arc::new(cache.clone())));
        (app, cache)
    }

    pub fn with_store(store: CountingStore, cache: Option<Arc<dyn CacheBackend>>) -> Self {
        let state = AppState::from_parts(
            Arc::new(store.clone()),
            cache,
            CacheConfig::new().with_op_timeout(None),
            test_auth_config(),
        );
        let router = create_api_router(state.clone(), &ApiConfig::default());
        Self {
            router,
            state,
            store,
        }
    }

    /// Seed a user straight into the store and return a bearer header value.
    pub async fn bearer(&self, username: &str) -> Result<String, String> {
        let user = self
            .store
            .create_user(username, "$argon2id$unused")
            .await
            .map_err(|e| e.to_string())?;
        let token =
            generate_jwt_token(self.state.auth.config(), user.id).map_err(|e| e.message)?;
        Ok(format!("Bearer {}", token))
    }

    pub async fn send(&self, request: Request<Body>) -> Result<Response, String> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| e.to_string())
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        json: Option<&str>,
    ) -> Result<(StatusCode, serde_json::Value), String> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(bearer) = bearer {
            builder = builder.header(header::AUTHORIZATION, bearer);
        }
        let body = match json {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).map_err(|e| e.to_string())?;
        let response = self.send(request).await?;
        read_json(response).await
    }
}

pub async fn read_json(response: Response) -> Result<(StatusCode, serde_json::Value), String> {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| e.to_string())?;
    if bytes.is_empty() {
        return Ok((status, serde_json::Value::Null));
    }
    let json = serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;
    Ok((status, json))
}

pub const BUY_MILK: &str = r#"{"content":"buy milk","due":"2025-01-01T00:00:00Z"}"#;
