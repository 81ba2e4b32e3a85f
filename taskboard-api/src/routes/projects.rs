/// Project endpoints
///
/// # Endpoints
///
/// - `GET /projects` - List projects ordered by name
/// - `POST /projects` - Create project (with its default column)
/// - `GET /projects/:id` - Get project
/// - `PUT /projects/:id` - Update name and description
/// - `DELETE /projects/:id` - Delete project with all columns, tasks, comments
/// - `GET /projects/:id/columns` - List the project's columns by position

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{Json, Path},
};
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use taskboard_shared::models::{
    column::Column,
    project::{CreateProject, Project, UpdateProject},
};
use tracing::info;
use validator::Validate;

/// Create or update project request
#[derive(Debug, Deserialize, Validate)]
pub struct ProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub project_name: String,

    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub project_description: String,
}

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(Project::list(&state.db).await?))
}

/// Creates a project whose first column uses the configured default name
pub async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate()?;

    let project = Project::create_with_default_column(
        &state.db,
        CreateProject {
            name: req.project_name,
            description: req.project_description,
        },
        &state.config.board.default_column_name,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Project>> {
    Ok(Json(Project::get(&state.db, id).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;

    let project = Project::update(
        &state.db,
        id,
        UpdateProject {
            name: req.project_name,
            description: req.project_description,
        },
    )
    .await?;

    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let removed = Project::delete(&state.db, id).await?;

    info!(
        project_id = id,
        columns = removed.columns,
        tasks = removed.tasks,
        comments = removed.comments,
        "Project removed via API"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_project_columns(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Column>>> {
    Ok(Json(Column::list_by_project(&state.db, id).await?))
}
