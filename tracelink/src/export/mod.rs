//! Telemetry pipeline: exporter configuration, log sinks and the
//! [`Telemetry`] handle.
//!
//! A pipeline has exactly one exporter pair for logs and spans, either stdout
//! or OTLP/gRPC, each behind the SDK batch processor.

mod builder;
mod config;
mod error;
mod pipeline;
pub mod sink;

pub use builder::ExporterBuilder;
pub use config::{ConsoleFormat, ExporterConfig, DEFAULT_ENVIRONMENT, DEFAULT_PROBE_TIMEOUT};
pub use error::{SinkError, TelemetryError};
pub use pipeline::{Telemetry, TRACER_SCOPE};
