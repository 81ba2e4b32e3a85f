//! # Taskboard Shared Library
//!
//! Domain core of the task board: the entity repositories, the ordering
//! engine that keeps column positions and task priorities dense, and the
//! database plumbing they run on.
//!
//! ## Module Organization
//!
//! - `db`: connection pool and embedded migrations
//! - `error`: board error taxonomy
//! - `models`: projects, columns, tasks and comments
//! - `ordering`: position arithmetic shared by columns and tasks

pub mod db;
pub mod error;
pub mod models;
pub mod ordering;

pub use error::{BoardError, BoardResult, Entity, Violation};

/// Current version of the taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
