/// Column endpoints
///
/// # Endpoints
///
/// - `POST /columns` - Append a column to a project
/// - `GET /columns/:id` - Get column
/// - `PUT /columns/:id` - Rename column
/// - `DELETE /columns/:id` - Delete column, moving its tasks to a neighbour
/// - `PUT /columns/:id/position/:position` - Move column to a position
/// - `GET /columns/:id/tasks` - List the column's tasks by priority

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{Json, Path},
};
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use taskboard_shared::models::{
    column::{Column, CreateColumn},
    task::Task,
};
use tracing::info;
use validator::Validate;

/// Create column request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateColumnRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub column_name: String,

    pub project_id: i64,
}

/// Rename column request
#[derive(Debug, Deserialize, Validate)]
pub struct RenameColumnRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub column_name: String,
}

pub async fn create_column(
    State(state): State<AppState>,
    Json(req): Json<CreateColumnRequest>,
) -> ApiResult<(StatusCode, Json<Column>)> {
    req.validate()?;

    let column = Column::create(
        &state.db,
        CreateColumn {
            project_id: req.project_id,
            name: req.column_name,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(column)))
}

pub async fn get_column(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Column>> {
    Ok(Json(Column::get(&state.db, id).await?))
}

pub async fn rename_column(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<RenameColumnRequest>,
) -> ApiResult<Json<Column>> {
    req.validate()?;
    Ok(Json(Column::rename(&state.db, id, &req.column_name).await?))
}

pub async fn delete_column(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let deletion = Column::delete(&state.db, id).await?;

    info!(
        column_id = id,
        tasks_moved_to = deletion.tasks_moved_to,
        reassigned_tasks = deletion.reassigned_tasks,
        "Column removed via API"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Moves a column; out-of-range and negative positions are rejected
pub async fn move_column(
    State(state): State<AppState>,
    Path((id, position)): Path<(i64, i32)>,
) -> ApiResult<Json<Column>> {
    Ok(Json(Column::move_to_position(&state.db, id, position).await?))
}

pub async fn list_column_tasks(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(Task::list_by_column(&state.db, id).await?))
}
