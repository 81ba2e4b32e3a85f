/// HTTP integration tests for the taskboard API
///
/// These tests require a running PostgreSQL database.
/// Run with: DATABASE_URL=... cargo test -p taskboard-api --test api_tests -- --ignored

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_health_reports_database() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.send("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert!(body["migrations"]["applied_migrations"].as_u64().unwrap() >= 1);
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_project_lifecycle() {
    let ctx = TestContext::new().await.unwrap();
    let project = ctx.create_project("Website").await;

    let (status, body) = ctx.send("GET", &format!("/projects/{}", project), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project_name"], "Website");
    assert_eq!(body["project_description"], "");

    let (status, columns) = ctx
        .send("GET", &format!("/projects/{}/columns", project), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(columns[0]["column_name"], "TODO");
    assert_eq!(columns[0]["position"], 0);

    let (status, body) = ctx
        .send(
            "PUT",
            &format!("/projects/{}", project),
            Some(json!({ "project_name": "Site", "project_description": "v2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project_description"], "v2");

    let (status, _) = ctx.send("DELETE", &format!("/projects/{}", project), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = ctx.send("GET", &format!("/projects/{}", project), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_validation_errors_return_422() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send("POST", "/projects", Some(json!({ "project_name": "" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "project_name");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_malformed_requests_return_json_400() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send_raw("POST", "/columns", Some("{".to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

    let (status, body) = ctx.send("GET", "/tasks/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, body) = ctx.send("PUT", "/columns/1/position/first", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_column_reordering_and_errors() {
    let ctx = TestContext::new().await.unwrap();
    let project = ctx.create_project("Board").await;
    let todo = ctx.column_ids(project).await[0];
    let doing = ctx.create_column(project, "Doing").await;
    let done = ctx.create_column(project, "Done").await;

    let (status, body) = ctx
        .send("PUT", &format!("/columns/{}/position/0", done), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["position"], 0);
    assert_eq!(ctx.column_ids(project).await, vec![done, todo, doing]);

    let (status, _) = ctx
        .send("PUT", &format!("/columns/{}/position/3", done), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx
        .send("PUT", &format!("/columns/{}/position/0", done), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx
        .send(
            "POST",
            "/columns",
            Some(json!({ "column_name": "Doing", "project_id": project })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    ctx.send("DELETE", &format!("/projects/{}", project), None).await;
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_delete_column_keeps_tasks() {
    let ctx = TestContext::new().await.unwrap();
    let project = ctx.create_project("Board").await;
    let todo = ctx.column_ids(project).await[0];
    let doing = ctx.create_column(project, "Doing").await;

    ctx.create_task(todo, "t1").await;
    ctx.create_task(doing, "t2").await;

    let (status, _) = ctx.send("DELETE", &format!("/columns/{}", doing), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(ctx.task_names(todo).await, vec!["t1", "t2"]);

    let (status, body) = ctx.send("DELETE", &format!("/columns/{}", todo), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    ctx.send("DELETE", &format!("/projects/{}", project), None).await;
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_task_priority_and_column_moves() {
    let ctx = TestContext::new().await.unwrap();
    let project = ctx.create_project("Board").await;
    let todo = ctx.column_ids(project).await[0];
    let done = ctx.create_column(project, "Done").await;

    ctx.create_task(todo, "a").await;
    ctx.create_task(todo, "b").await;
    let c = ctx.create_task(todo, "c").await;

    let (status, body) = ctx
        .send("PUT", &format!("/tasks/{}/priority/0", c), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["priority"], 0);
    assert_eq!(ctx.task_names(todo).await, vec!["c", "a", "b"]);

    let (status, body) = ctx
        .send("PUT", &format!("/tasks/{}/column/{}", c, done), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["column_id"], done);
    assert_eq!(ctx.task_names(todo).await, vec!["a", "b"]);
    assert_eq!(ctx.task_names(done).await, vec!["c"]);

    let (status, _) = ctx
        .send("PUT", &format!("/tasks/{}/column/{}", c, done), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let other = ctx.create_project("Other").await;
    let foreign = ctx.column_ids(other).await[0];
    let (status, _) = ctx
        .send("PUT", &format!("/tasks/{}/column/{}", c, foreign), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    ctx.send("DELETE", &format!("/projects/{}", project), None).await;
    ctx.send("DELETE", &format!("/projects/{}", other), None).await;
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_comments_crud() {
    let ctx = TestContext::new().await.unwrap();
    let project = ctx.create_project("Board").await;
    let todo = ctx.column_ids(project).await[0];
    let task = ctx.create_task(todo, "a").await;

    let (status, comment) = ctx
        .send("POST", "/comments", Some(json!({ "text": "first", "task_id": task })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = comment["comment_id"].as_i64().unwrap();

    let (status, body) = ctx
        .send(
            "PUT",
            &format!("/comments/{}", comment_id),
            Some(json!({ "text": "edited" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "edited");
    assert_eq!(body["creation_date"], comment["creation_date"]);

    let (status, list) = ctx.send("GET", &format!("/tasks/{}/comments", task), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = ctx
        .send("POST", "/comments", Some(json!({ "text": "x", "task_id": i64::MAX })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.send("DELETE", &format!("/tasks/{}", task), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.send("GET", &format!("/comments/{}", comment_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.send("DELETE", &format!("/projects/{}", project), None).await;
}
