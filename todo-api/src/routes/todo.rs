//! Todo REST API Routes
//!
//! Reads are public; writes require a bearer token. Every call goes through
//! the [`CacheAside`] front, so handlers never touch the cache directly.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json, Router};
use todo_core::{Page, TodoId};
use todo_storage::CacheAside;

use crate::{
    error::{ApiError, ApiResult},
    extractors::{ApiJson, ApiQuery, PathId},
    middleware::AuthUser,
    state::AppState,
    types::{CreateTodoRequest, DeleteTodoResponse, UpdateTodoParams},
    validation::validate_page,
};

#[cfg(feature = "openapi")]
use todo_core::Todo;

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /todos - List todos ordered by id
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/todos",
    tag = "Todos",
    params(Page),
    responses(
        (status = 200, description = "One page of todos", body = [Todo]),
        (status = 400, description = "Invalid pagination", body = ApiError),
    ),
))]
pub async fn list_todos(
    State(todos): State<CacheAside>,
    ApiQuery(page): ApiQuery<Page>,
) -> ApiResult<impl IntoResponse> {
    validate_page(&page)?;
    let items = todos.list_todos(page).await?;
    Ok(Json(items))
}

/// POST /todos - Create a todo
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/todos",
    tag = "Todos",
    request_body = CreateTodoRequest,
    responses(
        (status = 201, description = "Todo created", body = Todo),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn create_todo(
    State(todos): State<CacheAside>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateTodoRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let todo = todos.create_todo(req.into()).await?;
    tracing::info!(todo_id = %todo.id, user_id = %user.id, "Todo created");

    Ok((StatusCode::CREATED, Json(todo)))
}

/// GET /todos/{id} - Get a todo by id
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/todos/{id}",
    tag = "Todos",
    params(("id" = i64, Path, description = "Todo id")),
    responses(
        (status = 200, description = "Todo found", body = Todo),
        (status = 400, description = "Malformed id", body = ApiError),
        (status = 404, description = "Todo not found", body = ApiError),
    ),
))]
pub async fn get_todo(
    State(todos): State<CacheAside>,
    PathId(id): PathId<TodoId>,
) -> ApiResult<impl IntoResponse> {
    let todo = todos
        .get_todo(id)
        .await?
        .ok_or_else(|| ApiError::todo_not_found(id))?;
    Ok(Json(todo))
}

/// PUT /todos/{id}?done= - Set the done flag
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/todos/{id}",
    tag = "Todos",
    params(("id" = i64, Path, description = "Todo id"), UpdateTodoParams),
    responses(
        (status = 200, description = "Todo updated", body = Todo),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Todo not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn update_todo(
    State(todos): State<CacheAside>,
    user: AuthUser,
    PathId(id): PathId<TodoId>,
    ApiQuery(params): ApiQuery<UpdateTodoParams>,
) -> ApiResult<impl IntoResponse> {
    let todo = todos
        .update_done(id, params.done)
        .await?
        .ok_or_else(|| ApiError::todo_not_found(id))?;

    tracing::info!(todo_id = %id, done = params.done, user_id = %user.id, "Todo updated");
    Ok(Json(todo))
}

/// DELETE /todos/{id} - Delete a todo
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/todos/{id}",
    tag = "Todos",
    params(("id" = i64, Path, description = "Todo id")),
    responses(
        (status = 200, description = "Todo deleted", body = DeleteTodoResponse),
        (status = 400, description = "Malformed id", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Todo not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn delete_todo(
    State(todos): State<CacheAside>,
    user: AuthUser,
    PathId(id): PathId<TodoId>,
) -> ApiResult<impl IntoResponse> {
    let deleted = todos
        .delete_todo(id)
        .await?
        .ok_or_else(|| ApiError::todo_not_found(id))?;

    tracing::info!(todo_id = %deleted.id, user_id = %user.id, "Todo deleted");
    Ok(Json(DeleteTodoResponse::deleted(deleted.id)))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the todo router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", axum::routing::get(list_todos).post(create_todo))
        .route(
            "/:id",
            axum::routing::get(get_todo).put(update_todo).delete(delete_todo),
        )
        .with_state(state)
}
