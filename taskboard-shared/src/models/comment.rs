/// Comment model and database operations
///
/// Comments are free text attached to a task. They have no ordering of
/// their own; listings are sorted by creation time.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     comment_id BIGSERIAL PRIMARY KEY,
///     task_id BIGINT NOT NULL,
///     creation_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     text TEXT NOT NULL
/// );
/// ```

use crate::error::{BoardError, BoardResult, Entity, StorageContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

/// Comment model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    #[sqlx(rename = "comment_id")]
    #[serde(rename = "comment_id")]
    pub id: i64,

    pub task_id: i64,

    /// Set by the database on insert, never changed afterwards
    pub creation_date: DateTime<Utc>,

    pub text: String,
}

/// Input for creating a comment
#[derive(Debug, Clone)]
pub struct CreateComment {
    pub task_id: i64,
    pub text: String,
}

impl Comment {
    /// Attaches a comment to a task
    ///
    /// # Errors
    ///
    /// `NotFound` if the task does not exist.
    pub async fn create(pool: &PgPool, data: CreateComment) -> BoardResult<Self> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        // Row lock keeps the task from being deleted before the insert lands
        let task: Option<i64> =
            sqlx::query_scalar("SELECT task_id FROM tasks WHERE task_id = $1 FOR UPDATE")
                .bind(data.task_id)
                .fetch_optional(&mut *tx)
                .await
                .during("lock task")?;

        if task.is_none() {
            return Err(BoardError::not_found(Entity::Task, data.task_id));
        }

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, text)
            VALUES ($1, $2)
            RETURNING comment_id, task_id, creation_date, text
            "#,
        )
        .bind(data.task_id)
        .bind(&data.text)
        .fetch_one(&mut *tx)
        .await
        .during("insert comment")?;

        tx.commit().await.during("commit comment creation")?;

        debug!(comment_id = comment.id, task_id = comment.task_id, "Created comment");
        Ok(comment)
    }

    /// Finds a comment by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> BoardResult<Option<Self>> {
        sqlx::query_as::<_, Comment>(
            "SELECT comment_id, task_id, creation_date, text FROM comments WHERE comment_id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .during("fetch comment")
    }

    /// Gets a comment by ID, failing with `NotFound` if missing
    pub async fn get(pool: &PgPool, id: i64) -> BoardResult<Self> {
        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| BoardError::not_found(Entity::Comment, id))
    }

    /// Lists a task's comments, oldest first
    ///
    /// # Errors
    ///
    /// `NotFound` if the task does not exist.
    pub async fn list_by_task(pool: &PgPool, task_id: i64) -> BoardResult<Vec<Self>> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        super::require(&mut *tx, Entity::Task, task_id).await?;

        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT comment_id, task_id, creation_date, text
            FROM comments
            WHERE task_id = $1
            ORDER BY creation_date, comment_id
            "#,
        )
        .bind(task_id)
        .fetch_all(&mut *tx)
        .await
        .during("list comments")?;

        tx.commit().await.during("commit comment listing")?;

        Ok(comments)
    }

    /// Replaces the comment text
    pub async fn update(pool: &PgPool, id: i64, text: &str) -> BoardResult<Self> {
        sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET text = $2
            WHERE comment_id = $1
            RETURNING comment_id, task_id, creation_date, text
            "#,
        )
        .bind(id)
        .bind(text)
        .fetch_optional(pool)
        .await
        .during("update comment")?
        .ok_or_else(|| BoardError::not_found(Entity::Comment, id))
    }

    /// Deletes a comment
    pub async fn delete(pool: &PgPool, id: i64) -> BoardResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE comment_id = $1")
            .bind(id)
            .execute(pool)
            .await
            .during("delete comment")?;

        if result.rows_affected() == 0 {
            return Err(BoardError::not_found(Entity::Comment, id));
        }

        debug!(comment_id = id, "Deleted comment");
        Ok(())
    }
}
