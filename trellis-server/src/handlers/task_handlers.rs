use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use trellis_core::api_types::ApiResponse;
use trellis_model::{
    NewTask, Task, TaskFilter, TaskPatch, TaskStatistics, User,
};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::infra::app_state::AppState;

/// Connection id echoed by clients so their own mutations are not fanned
/// back to them over the WebSocket channel.
pub const CONNECTION_ID_HEADER: &str = "x-connection-id";

fn origin_connection(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(CONNECTION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub tasks: HashMap<Uuid, i32>,
}

/// List the authenticated user's tasks, ordered by their order key.
///
/// Supports optional narrowing via query parameters:
///
/// - `status`: exact match on `pending` / `in_progress` / `completed`
/// - `priority`: exact match on `low` / `medium` / `high`
/// - `search`: case-insensitive substring across title and description
pub async fn list_tasks_handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(filter): Query<TaskFilter>,
) -> AppResult<Json<ApiResponse<Vec<Task>>>> {
    let tasks = state.tasks.list_tasks(&user, &filter).await?;
    Ok(Json(ApiResponse::success(tasks)))
}

/// Create a task at the end of the user's list.
///
/// # Request
///
/// ```json
/// {
///   "title": "Write quarterly report",
///   "description": "Numbers due Friday",
///   "priority": "high"
/// }
/// ```
///
/// # Response
///
/// - `201 Created` with the task, including its assigned order
/// - `422 Unprocessable Entity` with per-field messages on bad input
pub async fn create_task_handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
    Json(new_task): Json<NewTask>,
) -> AppResult<(StatusCode, Json<ApiResponse<Task>>)> {
    let origin = origin_connection(&headers);
    let task = state.tasks.create_task(&user, &new_task, origin).await?;
    Ok((
        StatusCode::CREATED,
        Json(
            ApiResponse::success(task)
                .with_message("Task created successfully".to_string()),
        ),
    ))
}

/// Fetch a single task. Owners and admins only; everyone else receives
/// 403 regardless of what they guessed, and absent ids are 404.
pub async fn get_task_handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Task>>> {
    let task = state.tasks.get_task(&user, task_id).await?;
    Ok(Json(ApiResponse::success(task)))
}

/// Patch a task's fields. Moving into `completed` stamps `completed_at`;
/// moving out clears it. The order key cannot be changed here.
pub async fn update_task_handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
    Json(patch): Json<TaskPatch>,
) -> AppResult<Json<ApiResponse<Task>>> {
    let origin = origin_connection(&headers);
    let task = state
        .tasks
        .update_task(&user, task_id, &patch, origin)
        .await?;
    Ok(Json(
        ApiResponse::success(task)
            .with_message("Task updated successfully".to_string()),
    ))
}

/// Delete a task. Remaining order values are left untouched.
pub async fn delete_task_handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    let origin = origin_connection(&headers);
    state.tasks.delete_task(&user, task_id, origin).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a new order mapping to the user's own list.
///
/// # Request
///
/// ```json
/// {
///   "tasks": {
///     "7c9e6679-7425-40de-944b-e07fc1f90ae7": 0,
///     "550e8400-e29b-41d4-a716-446655440000": 1
///   }
/// }
/// ```
///
/// The whole mapping is rejected if any id is not the caller's own task;
/// a partial permutation is never applied.
pub async fn reorder_tasks_handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
    Json(request): Json<ReorderRequest>,
) -> AppResult<StatusCode> {
    let origin = origin_connection(&headers);
    state
        .tasks
        .reorder_tasks(&user, &request.tasks, origin)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Aggregate counts over the authenticated user's tasks.
pub async fn get_statistics_handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> AppResult<Json<ApiResponse<TaskStatistics>>> {
    let stats = state.tasks.get_statistics(&user).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// Aggregate counts for an arbitrary user; self or admin only.
pub async fn get_user_statistics_handler(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TaskStatistics>>> {
    let stats = state.tasks.get_user_statistics(&user, user_id).await?;
    Ok(Json(ApiResponse::success(stats)))
}
