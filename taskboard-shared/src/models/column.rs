/// Column model and database operations
///
/// Columns belong to a project and are ordered by `position`, a dense
/// zero-based sequence per project (see [`crate::ordering`]). Column names
/// are unique within a project.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE columns (
///     column_id BIGSERIAL PRIMARY KEY,
///     project_id BIGINT NOT NULL,
///     column_name VARCHAR(255) NOT NULL,
///     position INTEGER NOT NULL CHECK (position >= 0),
///     UNIQUE (project_id, column_name),
///     UNIQUE (project_id, position) DEFERRABLE INITIALLY DEFERRED
/// );
/// ```
///
/// # Deletion
///
/// ```text
/// delete "Doing" (position 1)
///
///   TODO   Doing   Done           TODO        Done
///   0      1       2        =>    0           1
///   t1     t2 t3                  t1 t2 t3
/// ```
///
/// The tasks of the deleted column go to the column just before it, or the
/// one just after it when the deleted column is first. They are appended
/// after the neighbour's own tasks in their original order. The column is
/// then moved to the last slot and removed, so positions stay dense. A
/// project's last column cannot be deleted.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::column::{Column, CreateColumn};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let doing = Column::create(&pool, CreateColumn {
///     project_id: 1,
///     name: "Doing".to_string(),
/// }).await?;
///
/// Column::move_to_position(&pool, doing.id, 0).await?;
/// # Ok(())
/// # }
/// ```

use crate::error::{BoardError, BoardResult, Entity, StorageContext, Violation};
use crate::ordering::{self, ColumnOrder, TaskOrder};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, warn};

/// Column model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Column {
    #[sqlx(rename = "column_id")]
    #[serde(rename = "column_id")]
    pub id: i64,

    pub project_id: i64,

    #[sqlx(rename = "column_name")]
    #[serde(rename = "column_name")]
    pub name: String,

    /// Zero-based rank within the project
    pub position: i32,
}

/// Input for creating a column
#[derive(Debug, Clone)]
pub struct CreateColumn {
    pub project_id: i64,
    pub name: String,
}

/// Outcome of a column deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDeletion {
    /// Column that received the deleted column's tasks
    pub tasks_moved_to: i64,

    /// Number of tasks relocated
    pub reassigned_tasks: u64,
}

impl Column {
    /// Appends a column at the end of the project
    ///
    /// # Errors
    ///
    /// - `NotFound` if the project does not exist
    /// - `Conflict` if the project already has a column with this name
    pub async fn create(pool: &PgPool, data: CreateColumn) -> BoardResult<Self> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        if !ordering::lock_parent::<ColumnOrder>(&mut *tx, data.project_id).await? {
            return Err(BoardError::not_found(Entity::Project, data.project_id));
        }

        ensure_unique_name(&mut *tx, data.project_id, &data.name, None).await?;

        let position = ordering::next_position::<ColumnOrder>(&mut *tx, data.project_id).await?;

        let column = sqlx::query_as::<_, Column>(
            r#"
            INSERT INTO columns (project_id, column_name, position)
            VALUES ($1, $2, $3)
            RETURNING column_id, project_id, column_name, position
            "#,
        )
        .bind(data.project_id)
        .bind(&data.name)
        .bind(position)
        .fetch_one(&mut *tx)
        .await
        .during("insert column")?;

        tx.commit().await.during("commit column creation")?;

        debug!(column_id = column.id, project_id = column.project_id, position, "Created column");
        Ok(column)
    }

    /// Finds a column by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> BoardResult<Option<Self>> {
        sqlx::query_as::<_, Column>(
            "SELECT column_id, project_id, column_name, position FROM columns WHERE column_id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .during("fetch column")
    }

    /// Gets a column by ID, failing with `NotFound` if missing
    pub async fn get(pool: &PgPool, id: i64) -> BoardResult<Self> {
        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| BoardError::not_found(Entity::Column, id))
    }

    /// Lists a project's columns ordered by position
    ///
    /// # Errors
    ///
    /// `NotFound` if the project does not exist.
    pub async fn list_by_project(pool: &PgPool, project_id: i64) -> BoardResult<Vec<Self>> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        super::require(&mut *tx, Entity::Project, project_id).await?;

        let columns = sqlx::query_as::<_, Column>(
            r#"
            SELECT column_id, project_id, column_name, position
            FROM columns
            WHERE project_id = $1
            ORDER BY position
            "#,
        )
        .bind(project_id)
        .fetch_all(&mut *tx)
        .await
        .during("list columns")?;

        tx.commit().await.during("commit column listing")?;

        Ok(columns)
    }

    /// Renames a column
    ///
    /// Renaming a column to its current name succeeds without changes.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the column does not exist
    /// - `Conflict` if another column of the project has this name
    pub async fn rename(pool: &PgPool, id: i64, name: &str) -> BoardResult<Self> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        let slot = ordering::locate::<ColumnOrder>(&mut *tx, id).await?;
        ordering::lock_parent::<ColumnOrder>(&mut *tx, slot.parent_id).await?;
        ensure_unique_name(&mut *tx, slot.parent_id, name, Some(id)).await?;

        let column = sqlx::query_as::<_, Column>(
            r#"
            UPDATE columns
            SET column_name = $2
            WHERE column_id = $1
            RETURNING column_id, project_id, column_name, position
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .during("rename column")?;

        tx.commit().await.during("commit column rename")?;

        debug!(column_id = id, "Renamed column");
        Ok(column)
    }

    /// Moves a column to `position`, shifting the columns in between
    ///
    /// # Errors
    ///
    /// - `NotFound` if the column does not exist
    /// - `InvariantViolation(OutOfRange)` if `position` is not a valid slot
    /// - `InvariantViolation(NoOp)` if the column is already there
    pub async fn move_to_position(pool: &PgPool, id: i64, position: i32) -> BoardResult<Self> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        ordering::move_to_position::<ColumnOrder>(&mut *tx, id, position).await?;
        let column = fetch_in(&mut *tx, id).await?;

        tx.commit().await.during("commit column move")?;

        info!(column_id = id, position, "Moved column");
        Ok(column)
    }

    /// Deletes a column, relocating its tasks to the adjacent column
    ///
    /// # Errors
    ///
    /// - `NotFound` if the column or its neighbour does not exist, including
    ///   one removed while this call waited for its lock
    /// - `InvariantViolation(LastColumnInProject)` if it is the project's
    ///   only column; nothing is changed
    pub async fn delete(pool: &PgPool, id: i64) -> BoardResult<ColumnDeletion> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        let unlocked = ordering::locate::<ColumnOrder>(&mut *tx, id).await?;
        ordering::lock_parent::<ColumnOrder>(&mut *tx, unlocked.parent_id).await?;
        let slot = ordering::locate::<ColumnOrder>(&mut *tx, id).await?;

        let count = ordering::sibling_count::<ColumnOrder>(&mut *tx, slot.parent_id).await?;
        if count <= 1 {
            warn!(column_id = id, project_id = slot.parent_id, "Refused to delete last column");
            return Err(Violation::LastColumnInProject {
                project_id: slot.parent_id,
            }
            .into());
        }

        let neighbour_position = if slot.position > 0 {
            slot.position - 1
        } else {
            slot.position + 1
        };

        let neighbour: i64 = sqlx::query_scalar(
            "SELECT column_id FROM columns WHERE project_id = $1 AND position = $2",
        )
        .bind(slot.parent_id)
        .bind(neighbour_position)
        .fetch_one(&mut *tx)
        .await
        .during("find adjacent column")?;

        // Lock both task parents in id order
        let (first, second) = if id < neighbour { (id, neighbour) } else { (neighbour, id) };
        let first_exists = ordering::lock_parent::<TaskOrder>(&mut *tx, first).await?;
        let second_exists = ordering::lock_parent::<TaskOrder>(&mut *tx, second).await?;

        // A row removed outside this repository while we waited on its lock
        if !first_exists || !second_exists {
            let gone = if first_exists { second } else { first };
            warn!(column_id = id, vanished = gone, "Column disappeared during deletion");
            return Err(BoardError::not_found(Entity::Column, gone));
        }

        let offset = ordering::next_position::<TaskOrder>(&mut *tx, neighbour).await?;

        let reassigned_tasks = sqlx::query(
            r#"
            UPDATE tasks
            SET column_id = $1, priority = priority + $2
            WHERE column_id = $3
            "#,
        )
        .bind(neighbour)
        .bind(offset)
        .bind(id)
        .execute(&mut *tx)
        .await
        .during("reassign column tasks")?
        .rows_affected();

        ordering::move_to_end::<ColumnOrder>(&mut *tx, id).await?;

        sqlx::query("DELETE FROM columns WHERE column_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .during("delete column")?;

        tx.commit().await.during("commit column deletion")?;

        info!(
            column_id = id,
            project_id = slot.parent_id,
            tasks_moved_to = neighbour,
            reassigned_tasks,
            "Deleted column"
        );

        Ok(ColumnDeletion {
            tasks_moved_to: neighbour,
            reassigned_tasks,
        })
    }
}

/// Reads a column inside an open transaction
async fn fetch_in(conn: &mut PgConnection, id: i64) -> BoardResult<Column> {
    sqlx::query_as::<_, Column>(
        "SELECT column_id, project_id, column_name, position FROM columns WHERE column_id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .during("fetch column")?
    .ok_or_else(|| BoardError::not_found(Entity::Column, id))
}

/// Fails with `Conflict` if another column of the project has `name`
///
/// `except` excludes the column being renamed.
async fn ensure_unique_name(
    conn: &mut PgConnection,
    project_id: i64,
    name: &str,
    except: Option<i64>,
) -> BoardResult<()> {
    let taken: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM columns
            WHERE project_id = $1 AND column_name = $2 AND column_id IS DISTINCT FROM $3
        )
        "#,
    )
    .bind(project_id)
    .bind(name)
    .bind(except)
    .fetch_one(&mut *conn)
    .await
    .during("check column name")?;

    if taken {
        return Err(BoardError::Conflict(format!(
            "column named '{}' already exists in project {}",
            name, project_id
        )));
    }

    Ok(())
}
