//! Demonstration endpoints.
//!
//! Each handler exercises one part of the instrumentation: outbound context
//! propagation, nested sub-operation spans, JSON body logging.

use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracelink::logging::Field;
use tracelink::middleware::{RequestSpan, StatusRecorder};
use tracelink::span::SpanHandle;

/// Request body of `POST /greet`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GreetRequest {
    /// First name.
    #[serde(default)]
    pub name: String,
    /// Last name.
    #[serde(default)]
    pub surname: String,
}

/// Response body of `POST /greet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetResponse {
    /// Greeting text.
    pub message: String,
}

/// Creates the demo routes.
pub fn demo_routes() -> Router<AppState> {
    Router::new()
        .route("/test", get(test_outbound))
        .route("/test-error", get(test_error))
        .route("/greet", post(greet))
        .route("/favicon.ico", get(favicon))
}

/// Calls the downstream URL inside a `client-request` span, propagating the
/// trace context in the outbound headers.
async fn test_outbound(
    State(state): State<AppState>,
    Extension(request_span): Extension<RequestSpan>,
) -> (StatusCode, &'static str) {
    let telemetry = state.telemetry();
    let logger = telemetry.logger();
    let span = telemetry.start_span(request_span.context(), "client-request");

    let mut headers = HeaderMap::new();
    telemetry.propagator().inject(span.context(), &mut headers);

    match state
        .client()
        .get(state.downstream_url())
        .headers(headers)
        .send()
        .await
    {
        Ok(response) => {
            logger.info(
                Some(&span),
                "Outbound request completed",
                &[Field::new("status", response.status().to_string())],
            );
            (StatusCode::OK, "Log triggered!")
        }
        Err(err) => {
            span.record_error(&err);
            logger.error(
                Some(&span),
                "Outbound request failed",
                &[Field::new("error", err.to_string())],
            );
            (StatusCode::BAD_GATEWAY, "Outbound call failed")
        }
    }
}

/// Simulates a failing request across three nested sub-operations.
async fn test_error(
    State(state): State<AppState>,
    Extension(request_span): Extension<RequestSpan>,
    Extension(recorder): Extension<StatusRecorder>,
) -> (StatusCode, &'static str) {
    let telemetry = state.telemetry();
    let logger = telemetry.logger();

    let handler = telemetry.start_span(request_span.context(), "Handle /test-error");
    logger.info(Some(&handler), "Started /test-error handler", &[]);
    recorder.write_header(StatusCode::INTERNAL_SERVER_ERROR);

    let db = telemetry.start_span(handler.context(), "DB Query Error");
    logger.info(Some(&db), "Attempting DB Query...", &[]);
    logger.error(Some(&db), "DB connection failed: timeout", &[]);
    let db_cx = db.context().clone();
    db.end();

    let business = telemetry.start_span(&db_cx, "Business Logic Error");
    logger.info(Some(&business), "Running business logic...", &[]);
    logger.error_fmt(
        Some(&business),
        format_args!("Validation failed for user input: {}", "missing email"),
    );
    let business_cx = business.context().clone();
    business.end();

    let api = telemetry.start_span(&business_cx, "External API Error");
    logger.info(Some(&api), "Calling third-party API...", &[]);
    logger.error(
        Some(&api),
        "External API responded with 500 Internal Server Error",
        &[],
    );
    api.end();

    logger.error(
        Some(&handler),
        "Error scenario completed",
        &[Field::new("error", "Simulated error for testing")],
    );

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Error scenario completed! Logs captured.",
    )
}

/// Greets the caller, logging both bodies.
async fn greet(
    State(state): State<AppState>,
    Extension(request_span): Extension<RequestSpan>,
    payload: Result<Json<GreetRequest>, JsonRejection>,
) -> Result<Json<GreetResponse>, (StatusCode, &'static str)> {
    let telemetry = state.telemetry();
    let logger = telemetry.logger();
    let span = telemetry.start_span(request_span.context(), "Handle /greet");

    let Json(request) = payload.map_err(|rejection| {
        logger.error(
            Some(&span),
            "Invalid JSON",
            &[Field::new("error", rejection.body_text())],
        );
        (StatusCode::BAD_REQUEST, "Bad request")
    })?;

    logger.log_json(Some(&span), "request_body", &request);

    let response = GreetResponse {
        message: format!("Hello {} {}!", request.name, request.surname),
    };

    logger.log_json(Some(&span), "response_body", &response);

    Ok(Json(response))
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_router;
    use crate::state::test_support::test_state;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use tracelink::logging::{FieldValue, Level};

    #[tokio::test]
    async fn test_favicon_is_no_content() {
        let t = test_state("http://127.0.0.1:9/test-error");

        let response = create_router(t.state)
            .oneshot(
                Request::builder()
                    .uri("/favicon.ico")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_greet_logs_both_bodies() {
        let t = test_state("http://127.0.0.1:9/test-error");

        let response = create_router(t.state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/greet")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"Ada","surname":"Lovelace"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let greeting: GreetResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(greeting.message, "Hello Ada Lovelace!");

        let records = t.memory.records();
        let json_records: Vec<_> = records
            .iter()
            .filter(|r| r.message == "Logging JSON")
            .collect();
        assert_eq!(json_records.len(), 2);
        assert!(json_records[0].field("request_body").is_some());
        assert_eq!(
            json_records[1].field("response_body").map(|f| &f.value),
            Some(&FieldValue::Str(
                r#"{"message":"Hello Ada Lovelace!"}"#.to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_greet_rejects_bad_json() {
        let t = test_state("http://127.0.0.1:9/test-error");

        let response = create_router(t.state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/greet")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let records = t.memory.records();
        let invalid = records.iter().find(|r| r.message == "Invalid JSON").unwrap();
        assert_eq!(invalid.level, Level::Error);
        assert!(invalid.is_correlated());
        assert!(records.iter().all(|r| r.message != "Logging JSON"));
    }

    #[tokio::test]
    async fn test_error_route_records_nested_spans() {
        let t = test_state("http://127.0.0.1:9/test-error");

        let response = create_router(t.state)
            .oneshot(
                Request::builder()
                    .uri("/test-error")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let spans = t.spans.get_finished_spans().unwrap();
        let by_name = |name: &str| spans.iter().find(|s| s.name == name).unwrap();
        let db = by_name("DB Query Error");
        let business = by_name("Business Logic Error");
        let api = by_name("External API Error");

        assert_eq!(business.parent_span_id, db.span_context.span_id());
        assert_eq!(api.parent_span_id, business.span_context.span_id());
        assert!(spans
            .iter()
            .all(|s| s.span_context.trace_id() == db.span_context.trace_id()));

        let records = t.memory.records();
        let summary = records
            .iter()
            .find(|r| r.field("http_status").is_some())
            .unwrap();
        assert_eq!(summary.level, Level::Error);
        assert_eq!(
            summary.field("http_status").map(|f| &f.value),
            Some(&FieldValue::Int(500))
        );
        assert!(records
            .iter()
            .any(|r| r.message == "Validation failed for user input: missing email"));
    }

    #[tokio::test]
    async fn test_outbound_failure_is_bad_gateway() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let t = test_state(&format!("http://127.0.0.1:{port}/test-error"));

        let response = create_router(t.state)
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let records = t.memory.records();
        let failure = records
            .iter()
            .find(|r| r.message == "Outbound request failed")
            .unwrap();
        assert_eq!(failure.level, Level::Error);
        assert!(failure.field("error").is_some());

        let spans = t.spans.get_finished_spans().unwrap();
        let client = spans.iter().find(|s| s.name == "client-request").unwrap();
        assert_eq!(client.span_context.trace_id().to_string(), failure.trace_id);
        assert!(client.events.events.iter().any(|e| e.name == "exception"));
    }
}
