//! Integration tests for the demo endpoints.
//!
//! Tests cover:
//! - Nested error spans and status pinning on `/test-error`
//! - JSON body logging on `/greet`
//! - Outbound failures on `/test`

use axum::http::StatusCode;
use tracelink::logging::{FieldValue, Level};

use super::common::{get, post_json, summary_record, test_app, CLOSED_DOWNSTREAM};

#[tokio::test]
async fn test_error_scenario() {
    let app = test_app(CLOSED_DOWNSTREAM);

    let (status, body) = get(app.router, "/test-error").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Error scenario completed! Logs captured.");

    let records = app.memory.records();
    let errors = records.iter().filter(|r| r.level == Level::Error).count();
    // three sub-operations, the completion record and the summary
    assert_eq!(errors, 5);
    assert!(records
        .iter()
        .filter(|r| r.level == Level::Error)
        .all(|r| r.stacktrace.is_some()));

    let summary = summary_record(&records);
    assert_eq!(
        summary.field("http_status").map(|f| &f.value),
        Some(&FieldValue::Int(500))
    );

    let names: Vec<String> = app
        .spans
        .get_finished_spans()
        .unwrap()
        .iter()
        .map(|s| s.name.to_string())
        .collect();
    for expected in [
        "DB Query Error",
        "Business Logic Error",
        "External API Error",
        "Handle /test-error",
        "/test-error",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing span {expected}");
    }
}

#[tokio::test]
async fn test_greet() {
    let app = test_app(CLOSED_DOWNSTREAM);

    let (status, body) = post_json(
        app.router,
        "/greet",
        r#"{"name": "Grace", "surname": "Hopper"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Hello Grace Hopper!");

    let records = app.memory.records();
    let request_log = records
        .iter()
        .find(|r| r.field("request_body").is_some())
        .unwrap();
    assert_eq!(request_log.level, Level::Info);
    assert!(request_log.is_correlated());
}

#[tokio::test]
async fn test_greet_missing_fields_default_to_empty() {
    let app = test_app(CLOSED_DOWNSTREAM);

    let (status, body) = post_json(app.router, "/greet", r#"{"name": "Linus"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Hello Linus !");
}

#[tokio::test]
async fn test_greet_invalid_json() {
    let app = test_app(CLOSED_DOWNSTREAM);

    let (status, _) = post_json(app.router, "/greet", "{\"name\":").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let records = app.memory.records();
    assert!(records.iter().any(|r| r.message == "Invalid JSON"));
    assert_eq!(summary_record(&records).level, Level::Warn);
}

#[tokio::test]
async fn test_outbound_call_to_closed_port() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let app = test_app(&format!("http://127.0.0.1:{port}/test-error"));

    let (status, body) = get(app.router, "/test").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, "Outbound call failed");

    let records = app.memory.records();
    assert!(records
        .iter()
        .any(|r| r.message == "Outbound request failed" && r.level == Level::Error));
    assert_eq!(summary_record(&records).level, Level::Error);
}
