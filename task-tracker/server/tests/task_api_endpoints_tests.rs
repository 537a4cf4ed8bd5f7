use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use regex::Regex;
use serde_json::{Value, json};
use task_tracker_server::web::create_app;
use tower::ServiceExt;

mod common;

/// Test context holding the application router backed by a fresh database.
pub struct TestContext {
    pub app: Router,
}

async fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let db = common::setup_db().await?;
    Ok(TestContext { app: create_app(db) })
}

/// Sends a request and returns the status with the raw body text.
async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, String) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, text) = send(app, method, uri, body).await;
    let value = serde_json::from_str(&text)
        .unwrap_or_else(|err| panic!("Body is not JSON ({}): {}", err, text));
    (status, value)
}

async fn create_task(app: &Router, title: &str, completed: bool) -> i64 {
    let (status, task) = send_json(
        app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "title": title, "completed": completed })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    task["id"].as_i64().expect("Created task should carry an id")
}

#[tokio::test]
async fn can_run_complete_task_workflow() {
    let state = setup().await.expect("Failed to setup test context");
    let app = &state.app;

    let (status, created) =
        send_json(app, Method::POST, "/api/tasks", Some(json!({ "title": "A" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();
    let task_uri = format!("/api/tasks/{}", id);

    let (status, fetched) = send_json(app, Method::GET, &task_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "A");

    let (status, completed) =
        send_json(app, Method::PATCH, &format!("{}/complete", task_uri), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["completed"], true);

    let (status, body) = send(app, Method::DELETE, &task_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (status, _) = send_json(app, Method::GET, &task_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn created_task_has_expected_json_shape() {
    let state = setup().await.expect("Failed to setup test context");

    let (status, task) = send_json(
        &state.app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "title": "Shape", "description": "Check fields" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let mut keys: Vec<&str> = task.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, ["completed", "createdAt", "description", "id", "title"]);
    assert_eq!(task["description"], "Check fields");
    assert_eq!(task["completed"], false);

    let rfc3339 =
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$").unwrap();
    assert!(rfc3339.is_match(task["createdAt"].as_str().unwrap()));
}

/// Posts an invalid create body and checks that nothing was stored.
async fn create_rejected(app: &Router, body: Value) -> (StatusCode, String) {
    let (status, text) = send(app, Method::POST, "/api/tasks", Some(body)).await;
    let (_, tasks) = send_json(app, Method::GET, "/api/tasks", None).await;
    assert_eq!(tasks, json!([]));
    (status, text)
}

#[tokio::test]
async fn can_reject_task_without_title() {
    let state = setup().await.expect("Failed to setup test context");

    let (status, text) = create_rejected(&state.app, json!({ "description": "No title" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    insta::assert_snapshot!(text, @r#"{"status":400,"errors":["Title is required"]}"#);
}

#[tokio::test]
async fn can_reject_task_with_blank_title() {
    let state = setup().await.expect("Failed to setup test context");

    let (status, text) = create_rejected(&state.app, json!({ "title": "  " })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    insta::assert_snapshot!(text, @r#"{"status":400,"errors":["Title is required"]}"#);
}

#[tokio::test]
async fn can_reject_task_with_null_title() {
    let state = setup().await.expect("Failed to setup test context");

    let (status, text) = create_rejected(&state.app, json!({ "title": null })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    insta::assert_snapshot!(text, @r#"{"status":400,"errors":["Title is required"]}"#);
}

#[tokio::test]
async fn can_return_not_found_body_for_missing_task() {
    let state = setup().await.expect("Failed to setup test context");

    let (status, text) = send(&state.app, Method::GET, "/api/tasks/999", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    insta::assert_snapshot!(text, @r#"{"status":404,"error":"Task with id 999 not found"}"#);
}

#[tokio::test]
async fn can_return_not_found_for_every_operation_on_missing_task() {
    let state = setup().await.expect("Failed to setup test context");
    let app = &state.app;

    let requests = [
        (Method::GET, "/api/tasks/999", None),
        (Method::PUT, "/api/tasks/999", Some(json!({ "title": "Anything" }))),
        (Method::DELETE, "/api/tasks/999", None),
        (Method::PATCH, "/api/tasks/999/complete", None),
        (Method::PATCH, "/api/tasks/999/pending", None),
    ];

    for (method, uri, body) in requests {
        let (status, error) = send_json(app, method.clone(), uri, body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(error["status"], 404);
    }
}

#[tokio::test]
async fn can_update_task_ignoring_client_supplied_id_and_creation_time() {
    let state = setup().await.expect("Failed to setup test context");
    let app = &state.app;
    let (_, original) = send_json(
        app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "title": "Before", "description": "Old" })),
    )
    .await;
    let id = original["id"].as_i64().unwrap();

    let (status, updated) = send_json(
        app,
        Method::PUT,
        &format!("/api/tasks/{}", id),
        Some(json!({
            "id": id + 100,
            "createdAt": "2000-01-01T00:00:00Z",
            "title": "After",
            "description": "New",
            "completed": true
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], original["id"]);
    assert_eq!(updated["createdAt"], original["createdAt"]);
    assert_eq!(updated["title"], "After");
    assert_eq!(updated["description"], "New");
    assert_eq!(updated["completed"], true);
}

#[tokio::test]
async fn can_reject_blank_title_on_update() {
    let state = setup().await.expect("Failed to setup test context");
    let id = create_task(&state.app, "Keep", false).await;

    let (status, error) = send_json(
        &state.app,
        Method::PUT,
        &format!("/api/tasks/{}", id),
        Some(json!({ "title": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["errors"], json!(["Title is required"]));

    let (status, error) = send_json(
        &state.app,
        Method::PUT,
        &format!("/api/tasks/{}", id),
        Some(json!({ "title": null, "completed": true })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["errors"], json!(["Title is required"]));
    let (_, kept) = send_json(&state.app, Method::GET, &format!("/api/tasks/{}", id), None).await;
    assert_eq!(kept["title"], "Keep");
    assert_eq!(kept["completed"], false);
}

#[tokio::test]
async fn can_filter_completed_and_pending_tasks() {
    let state = setup().await.expect("Failed to setup test context");
    let app = &state.app;
    let done = create_task(app, "Done", true).await;
    let open = create_task(app, "Open", false).await;
    let reopened = create_task(app, "Reopened", false).await;
    send_json(app, Method::PATCH, &format!("/api/tasks/{}/complete", reopened), None).await;
    send_json(app, Method::PATCH, &format!("/api/tasks/{}/pending", reopened), None).await;

    let (status, completed) = send_json(app, Method::GET, "/api/tasks/completed", None).await;
    assert_eq!(status, StatusCode::OK);
    let completed_ids: Vec<i64> = completed
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["id"].as_i64().unwrap())
        .collect();
    assert_eq!(completed_ids, [done]);

    let (status, pending) = send_json(app, Method::GET, "/api/tasks/pending", None).await;
    assert_eq!(status, StatusCode::OK);
    let pending_ids: Vec<i64> = pending
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["id"].as_i64().unwrap())
        .collect();
    assert_eq!(pending_ids, [open, reopened]);
}

#[tokio::test]
async fn can_report_stats() {
    let state = setup().await.expect("Failed to setup test context");
    let app = &state.app;
    create_task(app, "One", true).await;
    create_task(app, "Two", false).await;
    create_task(app, "Three", false).await;

    let (status, text) = send(app, Method::GET, "/api/tasks/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    insta::assert_snapshot!(text, @r#"{"total":3,"completed":1,"pending":2}"#);
}

#[tokio::test]
async fn can_list_all_tasks_in_creation_order() {
    let state = setup().await.expect("Failed to setup test context");
    let app = &state.app;
    create_task(app, "First", false).await;
    create_task(app, "Second", true).await;

    let (status, tasks) = send_json(app, Method::GET, "/api/tasks", None).await;

    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = tasks
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["First", "Second"]);
}
