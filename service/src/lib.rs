//! Tracelink Demo Service
//!
//! An axum server instrumented with the `tracelink` library. Every request
//! runs inside a server span continued from the inbound `traceparent` header,
//! and every record the handlers log carries that span's identifiers.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /test` - Outbound call with propagated trace context
//! - `GET /test-error` - Nested failing sub-operations
//! - `POST /greet` - JSON greeting with request/response body logging
//! - `GET /favicon.ico` - Always `204 No Content`
//!
//! # Example
//!
//! ```no_run
//! use service::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod routes;
mod state;

pub use config::Config;
pub use routes::{GreetRequest, GreetResponse};
pub use state::AppState;

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracelink::export::{ExporterBuilder, Telemetry, TelemetryError};
use tracelink::middleware::TraceMiddleware;

/// Runs the demo server.
///
/// This function initializes the server with configuration from environment variables
/// and starts listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The telemetry pipeline cannot be built
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the demo server with the provided configuration.
///
/// # Errors
///
/// Returns an error if:
/// - The telemetry pipeline cannot be built
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config) -> Result<()> {
    let addr = config.socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        service = %config.service_name,
        "Tracelink demo service starting"
    );

    let telemetry = build_telemetry(&config)
        .await
        .context("Failed to build telemetry pipeline")?;

    let app = create_router(AppState::new(telemetry.clone(), config.downstream_url()));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    telemetry
        .logger()
        .info_fmt(None, format_args!("Starting server on {addr}"));

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    telemetry.shutdown()?;
    served?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Builds the telemetry pipeline described by `config`.
///
/// # Errors
///
/// Returns an error if the exporter configuration is invalid or the collector
/// endpoint is unreachable.
pub async fn build_telemetry(config: &Config) -> Result<Telemetry, TelemetryError> {
    let mut builder = ExporterBuilder::new()
        .with_service_name(config.service_name.as_str())
        .with_environment(config.environment.as_str())
        .with_console_exporter(config.console_exporter)
        .with_development_mode(config.development);

    if let Some(endpoint) = &config.apm_endpoint {
        builder = builder.with_endpoint_url(endpoint.as_str());
    }
    if let Some(api_key) = &config.apm_api_key {
        builder = builder.with_auth_header(api_key);
    }

    builder.build().await
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    let middleware = TraceMiddleware::new(state.telemetry().service_name(), state.telemetry());

    let router = Router::new()
        .merge(routes::health_routes())
        .merge(routes::demo_routes())
        .with_state(state);

    middleware.wrap(router).layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use tracelink::logging::REQUEST_ID_HEADER;
    use tracelink::opentelemetry::trace::SpanKind;

    #[tokio::test]
    async fn test_router_spans_carry_request_metadata() {
        let t = test_state("http://127.0.0.1:9");

        let response = create_router(t.state)
            .oneshot(
                Request::builder()
                    .uri("/health?verbose=1")
                    .header(REQUEST_ID_HEADER, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let spans = t.spans.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.name, "/health");
        assert_eq!(span.span_kind, SpanKind::Server);
        assert_eq!(
            span.instrumentation_scope.name(),
            t.telemetry.service_name()
        );

        let attribute = |key: &str| {
            span.attributes
                .iter()
                .find(|kv| kv.key.as_str() == key)
                .map(|kv| kv.value.as_str().into_owned())
        };
        assert_eq!(attribute("http.request_id").as_deref(), Some("req-42"));
        assert_eq!(attribute("http.query_params").as_deref(), Some("verbose=1"));
        assert_eq!(attribute("http.status_code").as_deref(), Some("200"));

        let records = t.memory.records();
        assert_eq!(records[0].trace_id, span.span_context.trace_id().to_string());
    }

    #[tokio::test]
    async fn test_unknown_route_is_logged_as_warning() {
        let t = test_state("http://127.0.0.1:9");

        let response = create_router(t.state)
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let records = t.memory.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, tracelink::logging::Level::Warn);
    }

    #[tokio::test]
    async fn test_build_telemetry_rejects_missing_endpoint() {
        let config = Config::default();
        assert!(matches!(
            build_telemetry(&config).await,
            Err(TelemetryError::MissingEndpoint)
        ));
    }

    #[tokio::test]
    async fn test_build_telemetry_console_mode() {
        let config = Config {
            console_exporter: true,
            service_name: "console-demo".to_string(),
            ..Config::default()
        };

        let telemetry = build_telemetry(&config).await.unwrap();
        assert_eq!(telemetry.service_name(), "console-demo");
    }
}
