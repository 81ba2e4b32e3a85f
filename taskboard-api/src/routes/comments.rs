/// Comment endpoints
///
/// - `POST /comments` - Add a comment to a task
/// - `GET /comments/:id` - Get comment
/// - `PUT /comments/:id` - Replace comment text
/// - `DELETE /comments/:id` - Delete comment

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{Json, Path},
};
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use taskboard_shared::models::comment::{Comment, CreateComment};
use validator::Validate;

/// Create comment request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 5000, message = "Text must be 1-5000 characters"))]
    pub text: String,

    pub task_id: i64,
}

/// Update comment request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 5000, message = "Text must be 1-5000 characters"))]
    pub text: String,
}

pub async fn create_comment(
    State(state): State<AppState>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    req.validate()?;

    let comment = Comment::create(
        &state.db,
        CreateComment {
            task_id: req.task_id,
            text: req.text,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Comment>> {
    Ok(Json(Comment::get(&state.db, id).await?))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    req.validate()?;
    Ok(Json(Comment::update(&state.db, id, &req.text).await?))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    Comment::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
