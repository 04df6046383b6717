//! Path extractor for typed store ids.
//!
//! `PathId<TodoId>` pulls the `:id` segment as an integer and wraps it,
//! rejecting anything else with the regular JSON `ApiError` body.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use todo_core::TodoId;

use crate::error::ApiError;

/// Id newtypes that can be taken from a path segment.
pub trait PathIdType: From<i64> + Send {
    /// Entity name used in rejection messages.
    const ENTITY_NAME: &'static str;
}

impl PathIdType for TodoId {
    const ENTITY_NAME: &'static str = "todo";
}

/// Extractor for a typed id from the single path parameter.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_todo(PathId(id): PathId<TodoId>) -> ApiResult<Json<Todo>> {
///     // id is TodoId, not i64
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PathId<T: PathIdType>(pub T);

/// Error returned when PathId extraction fails.
#[derive(Debug)]
pub struct PathIdError {
    pub entity_name: &'static str,
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for PathIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid {} id in '{}': {}",
            self.entity_name, self.path, self.message
        )
    }
}

impl std::error::Error for PathIdError {}

impl From<PathIdError> for ApiError {
    fn from(err: PathIdError) -> Self {
        ApiError::invalid_format("id", "integer").with_details(serde_json::json!({
            "entity_type": err.entity_name,
            "path": err.path,
            "reason": err.message,
        }))
    }
}

impl IntoResponse for PathIdError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: PathIdType,
{
    type Rejection = PathIdError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<i64> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| PathIdError {
                entity_name: T::ENTITY_NAME,
                path: parts.uri.path().to_string(),
                message: e.body_text(),
            })?;

        Ok(PathId(T::from(raw)))
    }
}
