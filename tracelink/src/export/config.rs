//! Exporter pipeline configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Default bound on the endpoint reachability probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment tag used when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Output format of the console sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    /// Human-readable, coloured lines.
    #[default]
    Pretty,
    /// One JSON object per record.
    Json,
}

/// Settings accumulated by [`ExporterBuilder`](super::ExporterBuilder).
///
/// Only checked when the pipeline is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ExporterConfig {
    /// OTLP collector endpoint, e.g. `https://apm.example.com:443`.
    #[validate(url(message = "Endpoint must be a valid URL"))]
    pub endpoint: Option<String>,

    /// Extra metadata sent with every export request.
    pub headers: Vec<(String, String)>,

    /// `service.name` resource attribute.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// `deployment.environment` resource attribute.
    #[validate(length(min = 1, message = "Environment cannot be empty"))]
    pub environment: String,

    /// Export to stdout instead of a collector.
    pub console_exporter: bool,

    /// Makes `DPanic` records panic.
    pub development: bool,

    /// Console sink format.
    pub console_format: ConsoleFormat,

    /// Bound on the reachability probe.
    pub probe_timeout: Duration,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            headers: Vec::new(),
            service_name: String::new(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            console_exporter: false,
            development: false,
            console_format: ConsoleFormat::default(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}
