//! End-to-end request flows over an in-memory store and cache.

mod support;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use support::{read_json, test_auth_config, TestApp, BUY_MILK};
use todo_api::auth::{generate_jwt_token, test_clocks};
use todo_api::error::{INCORRECT_LOGIN, INVALID_CREDENTIALS};
use todo_core::{Todo, TodoId, UserId};
use todo_storage::TodoStore;
use todo_test_utils::{FailingStore, UnavailableCache};

// ============================================================================
// TODO LIFECYCLE
// ============================================================================

#[tokio::test]
async fn buy_milk_create_update_read_refreshes_cache() -> Result<(), String> {
    let (app, cache) = TestApp::cached();
    let bearer = app.bearer("alice").await?;

    let (status, created) = app
        .call(Method::POST, "/todos", Some(&bearer), Some(BUY_MILK))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);
    assert_eq!(created["content"], "buy milk");
    assert_eq!(created["due"], "2025-01-01T00:00:00Z");
    assert_eq!(created["done"], false);

    // Warm the item key with the pre-update value.
    let (status, _) = app.call(Method::GET, "/todos/1", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(cache.contains("todo:1"));

    let (status, updated) = app
        .call(Method::PUT, "/todos/1?done=true", Some(&bearer), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["done"], true);

    let (status, fetched) = app.call(Method::GET, "/todos/1", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, updated);

    let cached = cache
        .peek("todo:1")
        .ok_or_else(|| "todo:1 not repopulated".to_string())?;
    let cached: Todo = serde_json::from_slice(&cached).map_err(|e| e.to_string())?;
    assert_eq!(cached.id, TodoId::new(1));
    assert!(cached.done);
    Ok(())
}

#[tokio::test]
async fn repeated_get_is_served_from_cache() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();
    let bearer = app.bearer("alice").await?;
    app.call(Method::POST, "/todos", Some(&bearer), Some(BUY_MILK))
        .await?;

    let before = app.store.calls().get;
    app.call(Method::GET, "/todos/1", None, None).await?;
    app.call(Method::GET, "/todos/1", None, None).await?;
    app.call(Method::GET, "/todos/1", None, None).await?;
    assert_eq!(app.store.calls().get - before, 1);
    Ok(())
}

#[tokio::test]
async fn list_reflects_create_and_delete() -> Result<(), String> {
    let (app, cache) = TestApp::cached();
    let bearer = app.bearer("alice").await?;

    let (_, empty) = app.call(Method::GET, "/todos", None, None).await?;
    assert_eq!(empty, serde_json::json!([]));
    assert!(cache.contains("todo:list:0:100"));

    app.call(Method::POST, "/todos", Some(&bearer), Some(BUY_MILK))
        .await?;
    assert!(!cache.contains("todo:list:0:100"));

    let (_, listed) = app.call(Method::GET, "/todos", None, None).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, deleted) = app
        .call(Method::DELETE, "/todos/1", Some(&bearer), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, serde_json::json!({"ok": true, "deleted": 1}));

    let (_, listed) = app.call(Method::GET, "/todos", None, None).await?;
    assert_eq!(listed, serde_json::json!([]));

    let (status, _) = app.call(Method::GET, "/todos/1", None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn pagination_windows_by_id() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();
    let bearer = app.bearer("alice").await?;
    for _ in 0..5 {
        app.call(Method::POST, "/todos", Some(&bearer), Some(BUY_MILK))
            .await?;
    }

    let (status, page) = app
        .call(Method::GET, "/todos?skip=1&limit=2", None, None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = page
        .as_array()
        .map(|items| items.iter().filter_map(|t| t["id"].as_i64()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec![2, 3]);

    let (_, none) = app
        .call(Method::GET, "/todos?limit=0", None, None)
        .await?;
    assert_eq!(none, serde_json::json!([]));
    Ok(())
}

#[tokio::test]
async fn update_accepts_numeric_and_word_flags() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();
    let bearer = app.bearer("alice").await?;
    app.call(Method::POST, "/todos", Some(&bearer), Some(BUY_MILK))
        .await?;

    let (status, updated) = app
        .call(Method::PUT, "/todos/1?done=1", Some(&bearer), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["done"], true);

    let (status, updated) = app
        .call(Method::PUT, "/todos/1?done=off", Some(&bearer), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["done"], false);

    let (_, fetched) = app.call(Method::GET, "/todos/1", None, None).await?;
    assert_eq!(fetched["done"], false);
    Ok(())
}

#[tokio::test]
async fn update_and_delete_missing_id_are_404() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();
    let bearer = app.bearer("alice").await?;

    let (status, body) = app
        .call(Method::PUT, "/todos/99?done=true", Some(&bearer), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TODO_NOT_FOUND");

    let (status, _) = app
        .call(Method::DELETE, "/todos/99", Some(&bearer), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

#[tokio::test]
async fn unauthenticated_create_never_reaches_store() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();

    let (status, body) = app
        .call(Method::POST, "/todos", None, Some(BUY_MILK))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], INVALID_CREDENTIALS);
    assert_eq!(app.store.calls().insert, 0);
    Ok(())
}

#[tokio::test]
async fn unauthenticated_writes_leave_todo_untouched() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();
    let bearer = app.bearer("alice").await?;
    app.call(Method::POST, "/todos", Some(&bearer), Some(BUY_MILK))
        .await?;

    let (status, _) = app
        .call(Method::PUT, "/todos/1?done=true", None, None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.call(Method::DELETE, "/todos/1", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let calls = app.store.calls();
    assert_eq!(calls.update, 0);
    assert_eq!(calls.delete, 0);
    Ok(())
}

#[tokio::test]
async fn expired_and_tampered_tokens_get_identical_401() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();
    let user = app
        .store
        .create_user("alice", "$argon2id$unused")
        .await
        .map_err(|e| e.to_string())?;

    let stale_config = test_auth_config().with_clock(Arc::new(test_clocks::expired()));
    let expired = generate_jwt_token(&stale_config, user.id).map_err(|e| e.message)?;

    let valid = generate_jwt_token(&test_auth_config(), user.id).map_err(|e| e.message)?;
    let sig_start = valid
        .rfind('.')
        .map(|dot| dot + 1)
        .ok_or_else(|| "token has no signature".to_string())?;
    let mut tampered = valid.clone();
    let first = tampered[sig_start..]
        .chars()
        .next()
        .ok_or_else(|| "empty signature".to_string())?;
    let swapped = if first == 'A' { "B" } else { "A" };
    tampered.replace_range(sig_start..sig_start + first.len_utf8(), swapped);

    let mut responses = Vec::new();
    for token in [expired, tampered] {
        let bearer = format!("Bearer {}", token);
        let response = app
            .send(
                Request::post("/todos")
                    .header(header::AUTHORIZATION, bearer)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(BUY_MILK))
                    .map_err(|e| e.to_string())?,
            )
            .await?;
        assert_eq!(
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok()),
            Some("Bearer")
        );
        responses.push(read_json(response).await?);
    }

    assert_eq!(responses[0].0, StatusCode::UNAUTHORIZED);
    assert_eq!(responses[0], responses[1]);
    assert_eq!(app.store.calls().insert, 0);
    Ok(())
}

#[tokio::test]
async fn token_for_unknown_user_is_rejected() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();
    let orphan = generate_jwt_token(&test_auth_config(), UserId::new(4242))
        .map_err(|e| e.message)?;
    let bearer = format!("Bearer {}", orphan);

    let (status, body) = app
        .call(Method::POST, "/todos", Some(&bearer), Some(BUY_MILK))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], INVALID_CREDENTIALS);
    Ok(())
}

#[tokio::test]
async fn register_then_login_then_create() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();

    let (status, user) = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(r#"{"username":"bob","password":"hunter2"}"#),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "bob");
    assert!(user.get("hashed_password").is_none());

    let response = app
        .send(
            Request::post("/auth/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=bob&password=hunter2"))
                .map_err(|e| e.to_string())?,
        )
        .await?;
    let (status, token) = read_json(response).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(token["token_type"], "bearer");

    let access = token["access_token"]
        .as_str()
        .ok_or_else(|| "access_token missing".to_string())?;
    let bearer = format!("Bearer {}", access);
    let (status, _) = app
        .call(Method::POST, "/todos", Some(&bearer), Some(BUY_MILK))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_400() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();
    let body = r#"{"username":"bob","password":"hunter2"}"#;

    let (status, _) = app
        .call(Method::POST, "/auth/register", None, Some(body))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, err) = app
        .call(Method::POST, "/auth/register", None, Some(body))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "USERNAME_TAKEN");
    Ok(())
}

#[tokio::test]
async fn login_failures_share_one_message() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();
    app.call(
        Method::POST,
        "/auth/register",
        None,
        Some(r#"{"username":"bob","password":"hunter2"}"#),
    )
    .await?;

    let mut bodies = Vec::new();
    for form in ["username=bob&password=wrong", "username=nobody&password=hunter2"] {
        let response = app
            .send(
                Request::post("/auth/token")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .map_err(|e| e.to_string())?,
            )
            .await?;
        bodies.push(read_json(response).await?);
    }

    assert_eq!(bodies[0].0, StatusCode::UNAUTHORIZED);
    assert_eq!(bodies[0].1["message"], INCORRECT_LOGIN);
    assert_eq!(bodies[0], bodies[1]);
    Ok(())
}

// ============================================================================
// VALIDATION
// ============================================================================

#[tokio::test]
async fn malformed_requests_are_400() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();
    let bearer = app.bearer("alice").await?;

    let cases: [(Method, &str, Option<&str>); 6] = [
        (Method::POST, "/todos", Some(r#"{"content":"  ","due":"2025-01-01T00:00:00Z"}"#)),
        (Method::POST, "/todos", Some(r#"{"content":"x","due":"tomorrow"}"#)),
        (Method::POST, "/todos", Some("{not json")),
        (Method::GET, "/todos?limit=1001", None),
        (Method::GET, "/todos/abc", None),
        (Method::PUT, "/todos/1?done=maybe", None),
    ];

    for (method, uri, body) in cases {
        let (status, err) = app.call(method.clone(), uri, Some(&bearer), body).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
        assert!(err["code"].is_string(), "{} {}", method, uri);
    }
    assert_eq!(app.store.calls().writes(), 0);
    Ok(())
}

// ============================================================================
// DEGRADED DEPENDENCIES
// ============================================================================

#[tokio::test]
async fn cache_outage_is_invisible_to_clients() -> Result<(), String> {
    let (healthy, _cache) = TestApp::cached();
    let degraded = TestApp::new(Some(Arc::new(UnavailableCache::new())));

    let mut transcripts = Vec::new();
    for app in [&healthy, &degraded] {
        let bearer = app.bearer("alice").await?;
        let mut transcript = Vec::new();
        transcript.push(
            app.call(Method::POST, "/todos", Some(&bearer), Some(BUY_MILK))
                .await?,
        );
        transcript.push(app.call(Method::GET, "/todos/1", None, None).await?);
        transcript.push(
            app.call(Method::PUT, "/todos/1?done=true", Some(&bearer), None)
                .await?,
        );
        transcript.push(app.call(Method::GET, "/todos", None, None).await?);
        transcript.push(
            app.call(Method::DELETE, "/todos/1", Some(&bearer), None)
                .await?,
        );
        transcript.push(app.call(Method::GET, "/todos/1", None, None).await?);
        transcripts.push(transcript);
    }

    assert_eq!(transcripts[0], transcripts[1]);
    Ok(())
}

#[tokio::test]
async fn readiness_reports_store_and_cache() -> Result<(), String> {
    let (app, _cache) = TestApp::cached();
    let (status, body) = app.call(Method::GET, "/health/ready", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["database"]["status"], "healthy");
    assert_eq!(body["details"]["cache"]["mode"], "memory");

    let uncached = TestApp::new(None);
    let (_, body) = uncached
        .call(Method::GET, "/health/ready", None, None)
        .await?;
    assert_eq!(body["details"]["cache"]["mode"], "disabled");
    Ok(())
}

#[tokio::test]
async fn readiness_fails_when_store_is_down() -> Result<(), String> {
    let state = todo_api::AppState::from_parts(
        Arc::new(FailingStore),
        None,
        todo_storage::CacheConfig::new(),
        test_auth_config(),
    );
    let router = todo_api::create_api_router(state, &todo_api::ApiConfig::default());

    let response = tower::ServiceExt::oneshot(
        router,
        Request::get("/health/ready")
            .body(Body::empty())
            .map_err(|e| e.to_string())?,
    )
    .await
    .map_err(|e| e.to_string())?;
    let (status, body) = read_json(response).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    Ok(())
}

#[tokio::test]
async fn store_outage_maps_to_5xx_without_internals() -> Result<(), String> {
    let state = todo_api::AppState::from_parts(
        Arc::new(FailingStore),
        None,
        todo_storage::CacheConfig::new(),
        test_auth_config(),
    );
    let router = todo_api::create_api_router(state, &todo_api::ApiConfig::default());

    let response = tower::ServiceExt::oneshot(
        router,
        Request::get("/todos/1")
            .body(Body::empty())
            .map_err(|e| e.to_string())?,
    )
    .await
    .map_err(|e| e.to_string())?;
    let (status, body) = read_json(response).await?;
    assert!(status.is_server_error());
    assert_eq!(body["message"], "Database unavailable");
    Ok(())
}
