//! Errors raised while assembling or driving the telemetry pipeline.

use thiserror::Error;

/// Errors returned by [`ExporterBuilder::build`](super::ExporterBuilder::build)
/// and [`Telemetry::shutdown`](super::Telemetry::shutdown).
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The accumulated configuration failed validation.
    #[error("Invalid exporter configuration: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),

    /// A remote pipeline was requested without an endpoint.
    #[error("An endpoint URL is required unless the console exporter is enabled")]
    MissingEndpoint,

    /// The endpoint could not be parsed or lacks a host.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The endpoint did not accept a connection within the probe timeout.
    #[error("Endpoint '{endpoint}' is unreachable: {reason}")]
    UnreachableEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// Connection failure.
        reason: String,
    },

    /// A header cannot be carried as gRPC metadata.
    #[error("Invalid exporter header '{name}'")]
    InvalidHeader {
        /// Header name.
        name: String,
    },

    /// The OTLP exporter could not be constructed.
    #[error("Failed to build OTLP exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),

    /// A provider failed to flush or shut down.
    #[error("Telemetry shutdown failed: {0}")]
    Shutdown(String),
}

/// Errors raised by a [`LogSink`](super::sink::LogSink).
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink's internal lock was poisoned.
    #[error("Failed to acquire lock on {0} sink")]
    Lock(&'static str),

    /// Buffered records could not be flushed.
    #[error("Failed to flush {sink} sink: {reason}")]
    Flush {
        /// Sink name.
        sink: &'static str,
        /// Underlying failure.
        reason: String,
    },
}
