/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskboard_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health
/// ├── /projects
/// │   ├── GET | POST           /
/// │   ├── GET | PUT | DELETE   /:id
/// │   └── GET                  /:id/columns
/// ├── /columns
/// │   ├── POST                 /
/// │   ├── GET | PUT | DELETE   /:id
/// │   ├── PUT                  /:id/position/:position
/// │   └── GET                  /:id/tasks
/// ├── /tasks
/// │   ├── POST                 /
/// │   ├── GET | PUT | DELETE   /:id
/// │   ├── PUT                  /:id/priority/:priority
/// │   ├── PUT                  /:id/column/:column_id
/// │   └── GET                  /:id/comments
/// └── /comments
///     ├── POST                 /
///     └── GET | PUT | DELETE   /:id
/// ```
///
/// Requests pass through the trace layer, then CORS when origins are
/// configured.
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{columns, comments, health, projects, tasks};

    let project_routes = Router::new()
        .route("/", get(projects::list_projects).post(projects::create_project))
        .route(
            "/:id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/:id/columns", get(projects::list_project_columns));

    let column_routes = Router::new()
        .route("/", post(columns::create_column))
        .route(
            "/:id",
            get(columns::get_column)
                .put(columns::rename_column)
                .delete(columns::delete_column),
        )
        .route("/:id/position/:position", put(columns::move_column))
        .route("/:id/tasks", get(columns::list_column_tasks));

    let task_routes = Router::new()
        .route("/", post(tasks::create_task))
        .route(
            "/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/:id/priority/:priority", put(tasks::change_priority))
        .route("/:id/column/:column_id", put(tasks::move_to_column))
        .route("/:id/comments", get(tasks::list_task_comments));

    let comment_routes = Router::new()
        .route("/", post(comments::create_comment))
        .route(
            "/:id",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        );

    let cors = cors_layer(&state.config.api.cors_origins);

    let router = Router::new()
        .route("/health", get(health::health_check))
        .nest("/projects", project_routes)
        .nest("/columns", column_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    match cors {
        Some(cors) => router.layer(cors).with_state(state),
        None => router.with_state(state),
    }
}

/// CORS policy for the configured origins; `None` when no origin is allowed
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    if origins.iter().any(|origin| origin == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600)),
    )
}
