//! Integration tests for health check and general routing behavior.
//!
//! Tests cover:
//! - Health check endpoint
//! - Favicon short-circuit
//! - Unknown routes

use axum::http::StatusCode;
use serde_json::Value;
use tracelink::logging::Level;

use super::common::{get, summary_record, test_app, CLOSED_DOWNSTREAM};

#[tokio::test]
async fn test_health_check() {
    let app = test_app(CLOSED_DOWNSTREAM);

    let (status, body) = get(app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], app.telemetry.service_name());
}

#[tokio::test]
async fn test_health_check_is_traced() {
    let app = test_app(CLOSED_DOWNSTREAM);

    get(app.router, "/health").await;

    let spans = app.spans.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "/health");

    let records = app.memory.records();
    assert_eq!(summary_record(&records).level, Level::Info);
}

#[tokio::test]
async fn test_favicon_returns_no_content() {
    let app = test_app(CLOSED_DOWNSTREAM);

    let (status, body) = get(app.router, "/favicon.ico").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_client_error() {
    let app = test_app(CLOSED_DOWNSTREAM);

    let (status, _) = get(app.router, "/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let records = app.memory.records();
    assert_eq!(summary_record(&records).level, Level::Warn);
}
