/// Project model and database operations
///
/// A project is the root of the ownership tree. It always has at least one
/// column: creation inserts the default column at position 0 in the same
/// transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     project_id BIGSERIAL PRIMARY KEY,
///     project_name VARCHAR(255) NOT NULL,
///     project_description TEXT NOT NULL DEFAULT ''
/// );
/// ```
///
/// # Cascade
///
/// Deleting a project removes, in this order and in one transaction, the
/// comments of its tasks, the tasks of its columns, its columns, and the
/// project row itself.

use crate::error::{BoardError, BoardResult, Entity, StorageContext};
use crate::ordering::{self, ColumnOrder};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};

/// Name of the column every new project starts with
pub const DEFAULT_COLUMN_NAME: &str = "TODO";

/// Project model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    #[sqlx(rename = "project_id")]
    #[serde(rename = "project_id")]
    pub id: i64,

    #[sqlx(rename = "project_name")]
    #[serde(rename = "project_name")]
    pub name: String,

    #[sqlx(rename = "project_description")]
    #[serde(rename = "project_description")]
    pub description: String,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: String,
}

/// Input for updating a project
#[derive(Debug, Clone)]
pub struct UpdateProject {
    pub name: String,
    pub description: String,
}

/// Rows removed by a project deletion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectDeletion {
    pub comments: u64,
    pub tasks: u64,
    pub columns: u64,
}

impl Project {
    /// Creates a project with a [`DEFAULT_COLUMN_NAME`] column
    pub async fn create(pool: &PgPool, data: CreateProject) -> BoardResult<Self> {
        Self::create_with_default_column(pool, data, DEFAULT_COLUMN_NAME).await
    }

    /// Creates a project whose first column is named `column_name`
    ///
    /// The project row and the column at position 0 are inserted in one
    /// transaction.
    pub async fn create_with_default_column(
        pool: &PgPool,
        data: CreateProject,
        column_name: &str,
    ) -> BoardResult<Self> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (project_name, project_description)
            VALUES ($1, $2)
            RETURNING project_id, project_name, project_description
            "#,
        )
        .bind(&data.name)
        .bind(&data.description)
        .fetch_one(&mut *tx)
        .await
        .during("insert project")?;

        sqlx::query("INSERT INTO columns (project_id, column_name, position) VALUES ($1, $2, 0)")
            .bind(project.id)
            .bind(column_name)
            .execute(&mut *tx)
            .await
            .during("insert default column")?;

        tx.commit().await.during("commit project creation")?;

        info!(project_id = project.id, column_name, "Created project");
        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> BoardResult<Option<Self>> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT project_id, project_name, project_description
            FROM projects
            WHERE project_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .during("fetch project")
    }

    /// Gets a project by ID, failing with `NotFound` if missing
    pub async fn get(pool: &PgPool, id: i64) -> BoardResult<Self> {
        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| BoardError::not_found(Entity::Project, id))
    }

    /// Lists all projects ordered by name
    pub async fn list(pool: &PgPool) -> BoardResult<Vec<Self>> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT project_id, project_name, project_description
            FROM projects
            ORDER BY project_name, project_id
            "#,
        )
        .fetch_all(pool)
        .await
        .during("list projects")
    }

    /// Replaces name and description
    pub async fn update(pool: &PgPool, id: i64, data: UpdateProject) -> BoardResult<Self> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        super::require(&mut *tx, Entity::Project, id).await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET project_name = $2, project_description = $3
            WHERE project_id = $1
            RETURNING project_id, project_name, project_description
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .fetch_one(&mut *tx)
        .await
        .during("update project")?;

        tx.commit().await.during("commit project update")?;

        debug!(project_id = id, "Updated project");
        Ok(project)
    }

    /// Deletes a project and everything it owns
    ///
    /// # Errors
    ///
    /// `NotFound` if the project does not exist. Any storage failure rolls
    /// back the whole cascade.
    ///
    /// The project's columns and tasks are locked first, so task or comment
    /// inserts already in flight land before the cascade runs and later ones
    /// find their parent gone.
    pub async fn delete(pool: &PgPool, id: i64) -> BoardResult<ProjectDeletion> {
        let mut tx = pool.begin().await.during("begin transaction")?;

        if !ordering::lock_parent::<ColumnOrder>(&mut *tx, id).await? {
            return Err(BoardError::not_found(Entity::Project, id));
        }

        // Task and comment writers lock these rows; wait for them to finish
        sqlx::query(
            "SELECT column_id FROM columns WHERE project_id = $1 ORDER BY column_id FOR UPDATE",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .during("lock project columns")?;

        sqlx::query(
            r#"
            SELECT task_id FROM tasks
            WHERE column_id IN (SELECT column_id FROM columns WHERE project_id = $1)
            ORDER BY task_id
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .during("lock project tasks")?;

        let comments = sqlx::query(
            r#"
            DELETE FROM comments
            WHERE task_id IN (
                SELECT task_id FROM tasks
                WHERE column_id IN (SELECT column_id FROM columns WHERE project_id = $1)
            )
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .during("delete project comments")?
        .rows_affected();

        let tasks = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE column_id IN (SELECT column_id FROM columns WHERE project_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .during("delete project tasks")?
        .rows_affected();

        let columns = sqlx::query("DELETE FROM columns WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .during("delete project columns")?
            .rows_affected();

        sqlx::query("DELETE FROM projects WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .during("delete project")?;

        tx.commit().await.during("commit project deletion")?;

        info!(project_id = id, comments, tasks, columns, "Deleted project");
        Ok(ProjectDeletion {
            comments,
            tasks,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_column_name() {
        assert_eq!(DEFAULT_COLUMN_NAME, "TODO");
    }

    #[test]
    fn test_project_serializes_with_schema_names() {
        let project = Project {
            id: 7,
            name: "Website".to_string(),
            description: "Relaunch".to_string(),
        };

        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["project_id"], 7);
        assert_eq!(json["project_name"], "Website");
        assert_eq!(json["project_description"], "Relaunch");
    }
}
