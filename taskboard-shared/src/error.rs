/// Error types for board operations
///
/// Every repository method returns [`BoardError`]. The variants follow the
/// failure taxonomy of the board:
///
/// - `NotFound`: an id does not resolve to a row
/// - `Conflict`: a uniqueness rule was broken (duplicate column name)
/// - `InvariantViolation`: the request would break an ordering or ownership
///   rule, see [`Violation`]
/// - `Storage`: the database rejected a statement; carries the operation name
///
/// Failed operations never leave partial writes behind: the transaction
/// guard rolls back when the error propagates out of the repository call.

use std::fmt;

/// Board entity kinds, used to label `NotFound` errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Project,
    Column,
    Task,
    Comment,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Project => "project",
            Entity::Column => "column",
            Entity::Task => "task",
            Entity::Comment => "comment",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broken ordering or ownership rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// Target position is outside `0..count`
    #[error("position {requested} is out of range, valid positions are 0..{count}")]
    OutOfRange { requested: i32, count: i64 },

    /// Item already sits at the requested position
    #[error("item is already at position {position}")]
    NoOp { position: i32 },

    /// A project must always keep at least one column
    #[error("cannot delete the last column of project {project_id}")]
    LastColumnInProject { project_id: i64 },

    /// Task already belongs to the destination column
    #[error("task is already in column {column_id}")]
    SameColumn { column_id: i64 },

    /// Destination column belongs to a different project than the task
    #[error("column {column_id} does not belong to project {project_id}")]
    ForeignColumn { column_id: i64, project_id: i64 },

    /// Parent already holds as many children as a position can number
    #[error("parent {parent_id} is full, it already holds {count} items")]
    ParentFull { parent_id: i64, count: i64 },
}

/// Error returned by every repository operation
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    /// Uniqueness rule broken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Ordering or ownership rule broken
    #[error("Invariant violation: {0}")]
    InvariantViolation(#[from] Violation),

    /// Database failure while running `operation`
    #[error("Storage failure during {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

/// Result alias for board operations
pub type BoardResult<T> = Result<T, BoardError>;

impl BoardError {
    pub fn not_found(entity: Entity, id: i64) -> Self {
        BoardError::NotFound { entity, id }
    }

    /// Returns the violation if this is an `InvariantViolation`
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            BoardError::InvariantViolation(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BoardError::NotFound { .. })
    }
}

/// Attaches the operation name to sqlx failures
///
/// ```ignore
/// sqlx::query("DELETE FROM comments WHERE comment_id = $1")
///     .bind(id)
///     .execute(&mut *tx)
///     .await
///     .during("delete comment")?;
/// ```
pub trait StorageContext<T> {
    fn during(self, operation: &'static str) -> BoardResult<T>;
}

impl<T> StorageContext<T> for Result<T, sqlx::Error> {
    fn during(self, operation: &'static str) -> BoardResult<T> {
        self.map_err(|source| BoardError::Storage { operation, source })
    }
}
