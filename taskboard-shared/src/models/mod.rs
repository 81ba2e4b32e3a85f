/// Board entities and their repositories
///
/// Each model owns its SQL. Write operations open one transaction, run their
/// existence and uniqueness checks inside it, mutate, and commit. Dropping
/// the transaction guard on an early return rolls everything back.
///
/// # Models
///
/// - `project`: projects; creation adds the default column, deletion cascades
/// - `column`: ordered columns; deletion relocates tasks to a neighbour
/// - `task`: ordered tasks; priority changes and cross-column moves
/// - `comment`: comments attached to tasks
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::project::{CreateProject, Project};
/// use taskboard_shared::models::column::Column;
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let project = Project::create(&pool, CreateProject {
///     name: "Website".to_string(),
///     description: "Relaunch".to_string(),
/// }).await?;
///
/// let columns = Column::list_by_project(&pool, project.id).await?;
/// assert_eq!(columns[0].name, "TODO");
/// # Ok(())
/// # }
/// ```

pub mod column;
pub mod comment;
pub mod project;
pub mod task;

use crate::error::{BoardError, BoardResult, Entity, StorageContext};
use sqlx::PgConnection;

/// Table and key column of an entity
fn table_of(entity: Entity) -> (&'static str, &'static str) {
    match entity {
        Entity::Project => ("projects", "project_id"),
        Entity::Column => ("columns", "column_id"),
        Entity::Task => ("tasks", "task_id"),
        Entity::Comment => ("comments", "comment_id"),
    }
}

/// Checks whether a row with the given id exists
pub(crate) async fn exists(conn: &mut PgConnection, entity: Entity, id: i64) -> BoardResult<bool> {
    let (table, key) = table_of(entity);
    let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE {key} = $1)");

    sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .during("existence check")
}

/// Fails with `NotFound` unless the row exists
pub(crate) async fn require(conn: &mut PgConnection, entity: Entity, id: i64) -> BoardResult<()> {
    if exists(conn, entity, id).await? {
        Ok(())
    } else {
        Err(BoardError::not_found(entity, id))
    }
}
