/// Database layer for the task board
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// Entity repositories live in the `models` module at crate root level.

pub mod migrations;
pub mod pool;
