//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup and HTTP request helpers.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};
use serde_json::Value;
use service::{create_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracelink::export::sink::{MemorySink, SinkTee};
use tracelink::export::Telemetry;
use tracelink::logging::{LogRecord, Mode};

/// Downstream URL nothing listens on.
pub const CLOSED_DOWNSTREAM: &str = "http://127.0.0.1:9/test-error";

/// A router wired to in-memory span and record capture.
pub struct TestApp {
    /// The fully instrumented router.
    pub router: Router,
    /// Every record the facade emitted.
    pub memory: Arc<MemorySink>,
    /// Every span that ended.
    pub spans: InMemorySpanExporter,
    /// Shared pipeline handle; keeps the providers alive while the router is
    /// moved into requests.
    pub telemetry: Telemetry,
}

/// Creates a test app whose `/test` calls `downstream_url`.
pub fn test_app(downstream_url: &str) -> TestApp {
    let spans = InMemorySpanExporter::default();
    let memory = Arc::new(MemorySink::new());
    let telemetry = Telemetry::new(
        "integration-tests",
        SdkTracerProvider::builder()
            .with_simple_exporter(spans.clone())
            .build(),
        SdkLoggerProvider::builder().build(),
        SinkTee::new().with_sink(memory.clone()),
        Mode::Production,
    );

    TestApp {
        router: create_router(AppState::new(telemetry.clone(), downstream_url)),
        memory,
        spans,
        telemetry,
    }
}

/// Serves `router` on an ephemeral local port and returns its address.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    addr
}

/// Helper to make a GET request with extra headers.
///
/// Returns the status code and the raw body text.
pub async fn get_with_headers(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, String) {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let response = tower::ServiceExt::oneshot(app, builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body_bytes).into_owned())
}

/// Helper to make a GET request.
pub async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    get_with_headers(app, uri, &[]).await
}

/// Helper to make a POST request with a raw JSON body.
///
/// Returns the status code and the parsed JSON body (`Null` when not JSON).
pub async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// Returns the middleware summary record (the one carrying `http_status`).
pub fn summary_record(records: &[LogRecord]) -> &LogRecord {
    records
        .iter()
        .find(|r| r.field("http_status").is_some())
        .expect("no summary record")
}
