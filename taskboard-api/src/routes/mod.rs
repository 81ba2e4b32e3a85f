/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `projects`: Project CRUD and column listing
/// - `columns`: Column CRUD, reordering and task listing
/// - `tasks`: Task CRUD, reprioritising and moving between columns
/// - `comments`: Comment CRUD

pub mod columns;
pub mod comments;
pub mod health;
pub mod projects;
pub mod tasks;
