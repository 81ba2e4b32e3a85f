/// Task endpoints
///
/// # Endpoints
///
/// - `POST /tasks` - Append a task to a column
/// - `GET /tasks/:id` - Get task
/// - `PUT /tasks/:id` - Update name and description
/// - `DELETE /tasks/:id` - Delete task and its comments
/// - `PUT /tasks/:id/priority/:priority` - Move task within its column
/// - `PUT /tasks/:id/column/:column_id` - Move task to another column
/// - `GET /tasks/:id/comments` - List the task's comments, oldest first

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{Json, Path},
};
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use taskboard_shared::models::{
    comment::Comment,
    task::{CreateTask, Task, UpdateTask},
};
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub task_name: String,

    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub task_description: String,

    pub column_id: i64,
}

/// Update task request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub task_name: String,

    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub task_description: String,
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = Task::create(
        &state.db,
        CreateTask {
            column_id: req.column_id,
            name: req.task_name,
            description: req.task_description,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Task>> {
    Ok(Json(Task::get(&state.db, id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let task = Task::update(
        &state.db,
        id,
        UpdateTask {
            name: req.task_name,
            description: req.task_description,
        },
    )
    .await?;

    Ok(Json(task))
}

pub async fn delete_task(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    Task::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_priority(
    State(state): State<AppState>,
    Path((id, priority)): Path<(i64, i32)>,
) -> ApiResult<Json<Task>> {
    Ok(Json(Task::change_priority(&state.db, id, priority).await?))
}

/// Moves a task to the end of another column in the same project
pub async fn move_to_column(
    State(state): State<AppState>,
    Path((id, column_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Task>> {
    Ok(Json(Task::move_to_column(&state.db, id, column_id).await?))
}

pub async fn list_task_comments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Comment>>> {
    Ok(Json(Comment::list_by_task(&state.db, id).await?))
}
