//! Integration tests for cross-service trace propagation.
//!
//! An upstream app calls a downstream app over real HTTP; both must report the
//! same trace.

use axum::http::StatusCode;
use tracelink::propagation::TRACEPARENT;

use super::common::{get_with_headers, spawn_server, summary_record, test_app};

const TRACE_ID: &str = "4bf92f3577b34da6a3ce929d0e0e4736";
const PARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

#[tokio::test]
async fn test_inbound_traceparent_is_continued() {
    let app = test_app(super::common::CLOSED_DOWNSTREAM);

    let (status, _) = get_with_headers(app.router, "/health", &[(TRACEPARENT, PARENT)]).await;
    assert_eq!(status, StatusCode::OK);

    let spans = app.spans.get_finished_spans().unwrap();
    assert_eq!(spans[0].span_context.trace_id().to_string(), TRACE_ID);
    assert_eq!(spans[0].parent_span_id.to_string(), "00f067aa0ba902b7");

    let records = app.memory.records();
    assert_eq!(summary_record(&records).trace_id, TRACE_ID);
}

#[tokio::test]
async fn test_malformed_traceparent_starts_new_trace() {
    let app = test_app(super::common::CLOSED_DOWNSTREAM);

    let (status, _) =
        get_with_headers(app.router, "/health", &[(TRACEPARENT, "00-garbage-01")]).await;
    assert_eq!(status, StatusCode::OK);

    let records = app.memory.records();
    let summary = summary_record(&records);
    assert!(summary.is_correlated());
    assert_ne!(summary.trace_id, TRACE_ID);
}

#[tokio::test]
async fn test_trace_crosses_service_boundary() {
    let downstream = test_app(super::common::CLOSED_DOWNSTREAM);
    let addr = spawn_server(downstream.router.clone()).await;

    let upstream = test_app(&format!("http://{addr}/test-error"));

    let (status, body) =
        get_with_headers(upstream.router, "/test", &[(TRACEPARENT, PARENT)]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Log triggered!");

    let upstream_records = upstream.memory.records();
    assert!(upstream_records
        .iter()
        .any(|r| r.message == "Outbound request completed" && r.trace_id == TRACE_ID));

    let downstream_records = downstream.memory.records();
    assert!(!downstream_records.is_empty());
    assert!(downstream_records.iter().all(|r| r.trace_id == TRACE_ID));

    let client_span = upstream
        .spans
        .get_finished_spans()
        .unwrap()
        .into_iter()
        .find(|s| s.name == "client-request")
        .unwrap();
    let downstream_server = downstream
        .spans
        .get_finished_spans()
        .unwrap()
        .into_iter()
        .find(|s| s.name == "/test-error")
        .unwrap();
    assert_eq!(
        downstream_server.parent_span_id,
        client_span.span_context.span_id()
    );
}
