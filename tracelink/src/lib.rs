//! Tracelink
//!
//! Trace-correlated structured logging, W3C context propagation and OTLP
//! export for axum services.
//!
//! # Modules
//!
//! - [`logging`] - Logging facade stamping records with span identifiers
//! - [`span`] - Scoped spans that always end
//! - [`propagation`] - `traceparent` extraction and injection
//! - [`export`] - Pipeline builder, sinks and the [`Telemetry`](export::Telemetry) handle
//! - [`middleware`] - Per-request server spans and summary records
//!
//! # Example
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use tracelink::export::ExporterBuilder;
//! use tracelink::middleware::TraceMiddleware;
//!
//! # async fn run() -> Result<(), tracelink::export::TelemetryError> {
//! let telemetry = ExporterBuilder::new()
//!     .with_service_name("orders")
//!     .with_console_exporter(true)
//!     .build()
//!     .await?;
//!
//! let app = TraceMiddleware::new("orders", &telemetry)
//!     .wrap(Router::<()>::new().route("/health", get(|| async { "ok" })));
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod export;
pub mod logging;
pub mod middleware;
pub mod propagation;
pub mod span;

/// Re-export common dependencies for convenience.
pub use opentelemetry;
pub use serde_json;
