//! OpenAPI Specification for the Todo API
//!
//! Generated with utoipa from the route annotations and served at
//! `/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use todo_core::{NewTodo, Todo, TodoId, UserId};
use todo_storage::CacheStats;

use crate::auth::AccessToken;
use crate::error::{ApiError, ErrorCode};
use crate::routes::{auth, health, todo};
use crate::telemetry::metrics;
use crate::types::{
    CreateTodoRequest, DeleteTodoResponse, LoginForm, RegisterRequest, UserResponse,
};

/// OpenAPI document for the Todo API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Todo API",
        version = "0.1.0",
        description = "Todo CRUD service with a Redis cache-aside layer and bearer authentication",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8000", description = "Local Development")
    ),
    tags(
        (name = "Todos", description = "Todo items; writes require a bearer token"),
        (name = "Auth", description = "Registration and token issuance"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        todo::list_todos,
        todo::create_todo,
        todo::get_todo,
        todo::update_todo,
        todo::delete_todo,
        auth::register,
        auth::token,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError, ErrorCode,
            Todo, NewTodo, TodoId, UserId,
            CreateTodoRequest, DeleteTodoResponse,
            RegisterRequest, LoginForm, UserResponse, AccessToken,
            health::HealthResponse, health::HealthStatus, health::HealthDetails,
            health::ComponentHealth, health::CacheHealth, CacheStats,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security scheme modifier for OpenAPI document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from POST /auth/token"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() -> Result<(), String> {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "Todo API");

        let components = openapi
            .components
            .as_ref()
            .ok_or_else(|| "OpenAPI components missing".to_string())?;
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("Todo"));
        Ok(())
    }

    #[test]
    fn test_openapi_paths_exist() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;
        assert!(paths.contains_key("/todos"));
        assert!(paths.contains_key("/todos/{id}"));
        assert!(paths.contains_key("/auth/token"));
        assert!(paths.contains_key("/health/ready"));
    }

    #[test]
    fn test_timestamps_documented_as_date_time() -> Result<(), String> {
        let doc = serde_json::to_value(ApiDoc::openapi()).map_err(|e| e.to_string())?;
        let schemas = &doc["components"]["schemas"];
        for (schema, field) in [
            ("Todo", "due"),
            ("NewTodo", "due"),
            ("CreateTodoRequest", "due"),
            ("UserResponse", "created_at"),
        ] {
            let property = &schemas[schema]["properties"][field];
            assert_eq!(property["type"], "string", "{}.{}", schema, field);
            assert_eq!(property["format"], "date-time", "{}.{}", schema, field);
        }
        Ok(())
    }

    #[test]
    fn test_openapi_json_serialization() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| format!("Failed to serialize OpenAPI: {}", e))?;
        serde_json::from_str::<serde_json::Value>(&json)
            .map_err(|e| format!("Generated JSON invalid: {}", e))?;
        assert!(json.contains("\"bearer_auth\""));
        Ok(())
    }
}
