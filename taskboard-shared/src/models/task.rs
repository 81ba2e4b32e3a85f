/// Task model and database operations
///
/// Tasks live in a column and are ordered by `priority`, a dense zero-based
/// sequence per column (see [`crate::ordering`]). New tasks are appended at
/// the end of their column.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     task_id BIGSERIAL PRIMARY KEY,
///     column_id BIGINT NOT NULL,
///     task_name VARCHAR(255) NOT NULL,
///     task_description TEXT NOT NULL DEFAULT '',
///     priority INTEGER NOT NULL CHECK (priority >= 0),
///     UNIQUE (column_id, priority) DEFERRABLE INITIALLY DEFERRED
/// );
/// ```
///
/// # Moving between columns
///
/// A task can only move to another column of the same project. It leaves
/// its source column without a gap and lands last in the destination.

use crate::error::{BoardError, BoardResult, Entity, StorageContext, Violation};
use crate::ordering::{self, TaskOrder};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

/// Task model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    #[sqlx(rename = "task_id")]
    #[serde(rename = "task_id")]
    pub id: i64,

    pub column_id: i64,

    #[sqlx(rename = "task_name")]
    #[serde(rename = "task_name")]
    pub name: String,

    #[sqlx(rename = "task_description")]
    #[serde(rename = "task_description")]
    pub description: String,

    /// Zero-based rank within the column
    pub priority: i32,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub column_id: i64,
    pub name: String,
    pub description: String,
}

/// Input for updating a task's text
#[derive(Debug, Clone)]
pub struct UpdateTask {
    pub name: String,
    pub description: String,
}

const SELECT_TASK: &str =
    "SELECT task_id, column_id, task_name, task_description, priority FROM tasks WHERE task_id = $1";

impl Task {
    /// Appends a task at the end of a column
    ///
    /// # Errors
    ///
    /// `NotFound` if the column does not exist.
    pub async fn create(pool: &PgPool, data: CreateTask) -> BoardResult<Self> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        if !ordering::lock_parent::<TaskOrder>(&mut *tx, data.column_id).await? {
            return Err(BoardError::not_found(Entity::Column, data.column_id));
        }

        let priority = ordering::next_position::<TaskOrder>(&mut *tx, data.column_id).await?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (column_id, task_name, task_description, priority)
            VALUES ($1, $2, $3, $4)
            RETURNING task_id, column_id, task_name, task_description, priority
            "#,
        )
        .bind(data.column_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(priority)
        .fetch_one(&mut *tx)
        .await
        .during("insert task")?;

        tx.commit().await.during("commit task creation")?;

        debug!(task_id = task.id, column_id = task.column_id, priority, "Created task");
        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> BoardResult<Option<Self>> {
        sqlx::query_as::<_, Task>(SELECT_TASK)
            .bind(id)
            .fetch_optional(pool)
            .await
            .during("fetch task")
    }

    /// Gets a task by ID, failing with `NotFound` if missing
    pub async fn get(pool: &PgPool, id: i64) -> BoardResult<Self> {
        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| BoardError::not_found(Entity::Task, id))
    }

    /// Lists a column's tasks ordered by priority
    ///
    /// # Errors
    ///
    /// `NotFound` if the column does not exist.
    pub async fn list_by_column(pool: &PgPool, column_id: i64) -> BoardResult<Vec<Self>> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        super::require(&mut *tx, Entity::Column, column_id).await?;

        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT task_id, column_id, task_name, task_description, priority
            FROM tasks
            WHERE column_id = $1
            ORDER BY priority
            "#,
        )
        .bind(column_id)
        .fetch_all(&mut *tx)
        .await
        .during("list tasks")?;

        tx.commit().await.during("commit task listing")?;

        Ok(tasks)
    }

    /// Replaces name and description; column and priority are unchanged
    pub async fn update(pool: &PgPool, id: i64, data: UpdateTask) -> BoardResult<Self> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET task_name = $2, task_description = $3
            WHERE task_id = $1
            RETURNING task_id, column_id, task_name, task_description, priority
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .fetch_optional(pool)
        .await
        .during("update task")?
        .ok_or_else(|| BoardError::not_found(Entity::Task, id))?;

        debug!(task_id = id, "Updated task");
        Ok(task)
    }

    /// Moves a task to `priority` within its column
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task does not exist
    /// - `InvariantViolation(OutOfRange)` if `priority` is not a valid slot
    /// - `InvariantViolation(NoOp)` if the task already has that priority
    pub async fn change_priority(pool: &PgPool, id: i64, priority: i32) -> BoardResult<Self> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        ordering::move_to_position::<TaskOrder>(&mut *tx, id, priority).await?;
        let task = fetch_in(&mut *tx, id).await?;

        tx.commit().await.during("commit priority change")?;

        info!(task_id = id, priority, "Changed task priority");
        Ok(task)
    }

    /// Moves a task to the end of another column of the same project
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task or the destination column does not exist,
    ///   including a destination deleted while this call waited for its lock
    /// - `Conflict` if the task changed column while this call waited
    /// - `InvariantViolation(SameColumn)` if the task is already there
    /// - `InvariantViolation(ForeignColumn)` if the destination belongs to
    ///   a different project
    pub async fn move_to_column(pool: &PgPool, id: i64, column_id: i64) -> BoardResult<Self> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        let seen = ordering::locate::<TaskOrder>(&mut *tx, id).await?;
        if seen.parent_id == column_id {
            return Err(Violation::SameColumn { column_id }.into());
        }

        // Both columns are locked in id order before either is read again
        let (first, second) = if seen.parent_id < column_id {
            (seen.parent_id, column_id)
        } else {
            (column_id, seen.parent_id)
        };
        let first_exists = ordering::lock_parent::<TaskOrder>(&mut *tx, first).await?;
        let second_exists = ordering::lock_parent::<TaskOrder>(&mut *tx, second).await?;

        let destination_exists = if first == column_id { first_exists } else { second_exists };
        if !destination_exists {
            return Err(BoardError::not_found(Entity::Column, column_id));
        }

        let source = ordering::locate::<TaskOrder>(&mut *tx, id).await?;
        if source.parent_id != seen.parent_id {
            return Err(BoardError::Conflict(format!(
                "task {} left column {} while waiting for its lock",
                id, seen.parent_id
            )));
        }

        let projects: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT column_id, project_id FROM columns WHERE column_id IN ($1, $2)",
        )
        .bind(source.parent_id)
        .bind(column_id)
        .fetch_all(&mut *tx)
        .await
        .during("fetch column projects")?;

        let project_of = |column: i64| {
            projects
                .iter()
                .find(|(id, _)| *id == column)
                .map(|(_, project)| *project)
        };

        let destination_project = project_of(column_id)
            .ok_or_else(|| BoardError::not_found(Entity::Column, column_id))?;
        let source_project = project_of(source.parent_id)
            .ok_or_else(|| BoardError::not_found(Entity::Column, source.parent_id))?;

        if destination_project != source_project {
            return Err(Violation::ForeignColumn {
                column_id,
                project_id: source_project,
            }
            .into());
        }

        let departed = ordering::move_to_end::<TaskOrder>(&mut *tx, id).await?;
        let priority = ordering::next_position::<TaskOrder>(&mut *tx, column_id).await?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET column_id = $2, priority = $3
            WHERE task_id = $1
            RETURNING task_id, column_id, task_name, task_description, priority
            "#,
        )
        .bind(id)
        .bind(column_id)
        .bind(priority)
        .fetch_one(&mut *tx)
        .await
        .during("move task to column")?;

        tx.commit().await.during("commit column change")?;

        info!(
            task_id = id,
            from_column = departed.parent_id,
            to_column = column_id,
            priority,
            "Moved task to another column"
        );
        Ok(task)
    }

    /// Deletes a task and its comments, closing the gap in its column
    ///
    /// Returns the number of comments removed.
    pub async fn delete(pool: &PgPool, id: i64) -> BoardResult<u64> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        let slot = ordering::move_to_end::<TaskOrder>(&mut *tx, id).await?;

        let comments = sqlx::query("DELETE FROM comments WHERE task_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .during("delete task comments")?
            .rows_affected();

        sqlx::query("DELETE FROM tasks WHERE task_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .during("delete task")?;

        tx.commit().await.during("commit task deletion")?;

        info!(task_id = id, column_id = slot.parent_id, comments, "Deleted task");
        Ok(comments)
    }
}

async fn fetch_in(conn: &mut PgConnection, id: i64) -> BoardResult<Task> {
    sqlx::query_as::<_, Task>(SELECT_TASK)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .during("fetch task")?
        .ok_or_else(|| BoardError::not_found(Entity::Task, id))
}
