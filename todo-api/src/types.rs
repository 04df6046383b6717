//! Request and Response Types
//!
//! Wire types for the REST endpoints. Entities that go over the wire
//! unchanged (`Todo`) come straight from `todo-core`.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use todo_core::{NewTodo, Timestamp, TodoId, User, UserId};

use crate::error::ApiResult;
use crate::validation::ValidateNonEmpty;

// ============================================================================
// TODO TYPES
// ============================================================================

/// Body of `POST /todos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateTodoRequest {
    pub content: String,
    /// RFC 3339 timestamp; offsets are normalized to UTC.
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub due: Timestamp,
}

impl CreateTodoRequest {
    pub fn validate(&self) -> ApiResult<()> {
        self.content.validate_non_empty("content")
    }
}

impl From<CreateTodoRequest> for NewTodo {
    fn from(req: CreateTodoRequest) -> Self {
        NewTodo::new(req.content, req.due)
    }
}

/// Query of `PUT /todos/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct UpdateTodoParams {
    /// `true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`, `t`/`f` or `y`/`n`,
    /// case-insensitive.
    #[serde(deserialize_with = "deserialize_flag")]
    pub done: bool,
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct Flag;

    impl<'de> Visitor<'de> for Flag {
        type Value = bool;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a boolean flag such as true, false, 1, 0, yes or no")
        }

        fn visit_bool<E>(self, value: bool) -> Result<bool, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_str<E>(self, value: &str) -> Result<bool, E>
        where
            E: de::Error,
        {
            match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" | "t" | "y" => Ok(true),
                "false" | "0" | "no" | "off" | "f" | "n" => Ok(false),
                _ => Err(E::invalid_value(de::Unexpected::Str(value), &self)),
            }
        }
    }

    deserializer.deserialize_any(Flag)
}

/// Response of `DELETE /todos/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeleteTodoResponse {
    pub ok: bool,
    pub deleted: TodoId,
}

impl DeleteTodoResponse {
    pub fn deleted(id: TodoId) -> Self {
        Self { ok: true, deleted: id }
    }
}

// ============================================================================
// AUTH TYPES
// ============================================================================

/// Body of `POST /auth/register`.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> ApiResult<()> {
        self.username.validate_non_empty("username")?;
        self.password.validate_non_empty("password")
    }
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Form body of `POST /auth/token` (OAuth2 password flow). Extra form
/// fields such as `grant_type` and `scope` are accepted and ignored.
#[derive(Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> ApiResult<()> {
        self.username.validate_non_empty("username")?;
        self.password.validate_non_empty("password")
    }
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_create_request_rejects_blank_content() {
        let req: CreateTodoRequest =
            serde_json::from_str(r#"{"content":"   ","due":"2025-01-01T00:00:00Z"}"#).unwrap();
        assert_eq!(req.validate().unwrap_err().code, ErrorCode::MissingField);
    }

    fn parse_done(query: &str) -> Option<bool> {
        let uri: axum::http::Uri = format!("/todos/1?{}", query).parse().ok()?;
        axum::extract::Query::<UpdateTodoParams>::try_from_uri(&uri)
            .ok()
            .map(|q| q.0.done)
    }

    #[test]
    fn test_done_flag_accepts_form_spellings() {
        for raw in ["true", "True", "1", "yes", "on", "t", "Y"] {
            assert_eq!(parse_done(&format!("done={}", raw)), Some(true), "{}", raw);
        }
        for raw in ["false", "FALSE", "0", "no", "off", "f", "n"] {
            assert_eq!(parse_done(&format!("done={}", raw)), Some(false), "{}", raw);
        }
        assert_eq!(parse_done("done=maybe"), None);
        assert_eq!(parse_done("done=2"), None);
        assert_eq!(parse_done(""), None);
    }

    #[test]
    fn test_delete_response_shape() {
        let json = serde_json::to_value(DeleteTodoResponse::deleted(TodoId::new(3))).unwrap();
        assert_eq!(json, serde_json::json!({"ok": true, "deleted": 3}));
    }

    #[test]
    fn test_user_response_drops_hash() {
        let user = User {
            id: UserId::new(1),
            username: "alice".to_string(),
            hashed_password: "$argon2id$v=19$secret".to_string(),
            created_at: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("hashed_password"));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let req = RegisterRequest {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", req).contains("hunter2"));
    }
}
