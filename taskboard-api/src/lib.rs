//! # Taskboard API Server Library
//!
//! HTTP surface of the task board: JSON endpoints over the repositories in
//! `taskboard-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration loading
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: JSON and path extractors with JSON rejections
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
