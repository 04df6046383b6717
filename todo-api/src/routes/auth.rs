//! Authentication Routes
//!
//! `POST /auth/register` creates an account; `POST /auth/token` is the
//! OAuth2 password flow and returns a bearer token. Neither requires auth.

use axum::{extract::State, response::IntoResponse, Json, Router};

use crate::{
    auth::AuthService,
    error::ApiResult,
    extractors::{ApiForm, ApiJson},
    state::AppState,
    types::{LoginForm, RegisterRequest, UserResponse},
};

#[cfg(feature = "openapi")]
use crate::{auth::AccessToken, error::ApiError};

/// POST /auth/register - Create a user account
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = UserResponse),
        (status = 400, description = "Invalid request or username taken", body = ApiError),
    ),
))]
pub async fn register(
    State(auth): State<AuthService>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let user = auth.register(&req.username, &req.password).await?;
    Ok(Json(UserResponse::from(user)))
}

/// POST /auth/token - Exchange credentials for a bearer token
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/auth/token",
    tag = "Auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = AccessToken),
        (status = 400, description = "Malformed form", body = ApiError),
        (status = 401, description = "Incorrect username or password", body = ApiError),
    ),
))]
pub async fn token(
    State(auth): State<AuthService>,
    ApiForm(form): ApiForm<LoginForm>,
) -> ApiResult<impl IntoResponse> {
    form.validate()?;
    let token = auth.login(&form.username, &form.password).await?;
    Ok(Json(token))
}

/// Create the auth router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/register", axum::routing::post(register))
        .route("/token", axum::routing::post(token))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthConfig, JwtSecret};
    use crate::error::INCORRECT_LOGIN;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use todo_storage::{CacheConfig, MemoryStore};
    use tower::ServiceExt;

    fn app() -> Result<Router, String> {
        let mut auth = AuthConfig::default();
        auth.jwt_secret = JwtSecret::new("auth-route-secret-0123456789abcdef".to_string())
            .map_err(|e| e.to_string())?;
        let state = AppState::from_parts(
            Arc::new(MemoryStore::new()),
            None,
            CacheConfig::new(),
            auth,
        );
        Ok(create_router(state))
    }

    fn register_request(body: &'static str) -> Result<Request<Body>, String> {
        Request::post("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|e| e.to_string())
    }

    fn token_request(body: &'static str) -> Result<Request<Body>, String> {
        Request::post("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .map_err(|e| e.to_string())
    }

    async fn json_body(response: axum::response::Response) -> Result<serde_json::Value, String> {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::from_slice(&bytes).map_err(|e| e.to_string())
    }

    #[tokio::test]
    async fn test_register_hides_password() -> Result<(), String> {
        let response = app()?
            .oneshot(register_request(r#"{"username":"alice","password":"s3cret"}"#)?)
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await?;
        assert_eq!(json["username"], "alice");
        assert!(json.get("hashed_password").is_none());
        assert!(json.get("password").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_token_flow() -> Result<(), String> {
        let app = app()?;
        app.clone()
            .oneshot(register_request(r#"{"username":"alice","password":"s3cret"}"#)?)
            .await
            .map_err(|e| e.to_string())?;

        let response = app
            .clone()
            .oneshot(token_request("grant_type=password&username=alice&password=s3cret")?)
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await?;
        assert_eq!(json["token_type"], "bearer");
        assert!(json["access_token"].as_str().is_some_and(|t| !t.is_empty()));

        let response = app
            .oneshot(token_request("username=alice&password=wrong")?)
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(response).await?;
        assert_eq!(json["message"], INCORRECT_LOGIN);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_blank_username_rejected() -> Result<(), String> {
        let response = app()?
            .oneshot(register_request(r#"{"username":"  ","password":"s3cret"}"#)?)
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
