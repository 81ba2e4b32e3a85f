/// Common test utilities for API integration tests
///
/// Provides a router backed by a real database plus a small JSON client.
/// DATABASE_URL must point at a PostgreSQL instance the tests may write to.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use std::env;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::db::pool::DatabaseConfig;
use tower::ServiceExt;

/// Test context containing the app and its pool
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
}

impl TestContext {
    /// Connects, migrates, and builds the router
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let url = env::var("DATABASE_URL")?;
        let config = Config {
            database: DatabaseConfig {
                url: url.clone(),
                ..Default::default()
            },
            ..Default::default()
        };

        let db = PgPool::connect(&url).await?;

        // Path relative to Cargo.toml, not this file
        sqlx::migrate!("../migrations").run(&db).await?;

        let app = build_router(AppState::new(db.clone(), config));

        Ok(TestContext { db, app })
    }

    /// Sends a request and returns the status with the parsed JSON body
    ///
    /// Empty bodies come back as `Value::Null`.
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_raw(method, uri, body.map(|json| json.to_string())).await
    }

    /// Like [`send`](Self::send), with the body passed through verbatim
    pub async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);

        let body = match body {
            Some(text) => {
                request = request.header("content-type", "application/json");
                Body::from(text)
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, json)
    }

    /// Creates a project and returns its id
    pub async fn create_project(&self, name: &str) -> i64 {
        let (status, body) = self
            .send(
                "POST",
                "/projects",
                Some(serde_json::json!({ "project_name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["project_id"].as_i64().unwrap()
    }

    /// Lists a project's column ids in position order
    pub async fn column_ids(&self, project_id: i64) -> Vec<i64> {
        let (status, body) = self
            .send("GET", &format!("/projects/{}/columns", project_id), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);

        body.as_array()
            .unwrap()
            .iter()
            .map(|c| c["column_id"].as_i64().unwrap())
            .collect()
    }

    /// Appends a column and returns its id
    pub async fn create_column(&self, project_id: i64, name: &str) -> i64 {
        let (status, body) = self
            .send(
                "POST",
                "/columns",
                Some(serde_json::json!({ "column_name": name, "project_id": project_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["column_id"].as_i64().unwrap()
    }

    /// Appends a task and returns its id
    pub async fn create_task(&self, column_id: i64, name: &str) -> i64 {
        let (status, body) = self
            .send(
                "POST",
                "/tasks",
                Some(serde_json::json!({ "task_name": name, "column_id": column_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["task_id"].as_i64().unwrap()
    }

    /// Task names of a column in priority order
    pub async fn task_names(&self, column_id: i64) -> Vec<String> {
        let (status, body) = self
            .send("GET", &format!("/columns/{}/tasks", column_id), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);

        body.as_array()
            .unwrap()
            .iter()
            .map(|t| t["task_name"].as_str().unwrap().to_string())
            .collect()
    }
}
