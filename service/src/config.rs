//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::net::SocketAddr;

/// Service name reported when `ELASTIC_APM_SERVICE_NAME` is unset.
pub const DEFAULT_SERVICE_NAME: &str = "tracelink-service";

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `TRACELINK_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `TRACELINK_PORT`: The port to listen on (default: 8080)
/// - `TRACELINK_DOWNSTREAM_URL`: Target of the `/test` outbound call
///   (default: this server's own `/test-error`)
/// - `TRACELINK_CONSOLE_EXPORTER`: Export to stdout instead of OTLP (default: false)
/// - `TRACELINK_ENVIRONMENT`: `deployment.environment` tag (default: "development")
/// - `TRACELINK_DEVELOPMENT`: Make `DPanic` records panic (default: false)
/// - `ELASTIC_APM_SERVICE_NAME`: Reported service name
/// - `ELASTIC_APM_API_KEY`: API key sent as `Authorization: ApiKey <key>`
/// - `ELASTIC_APM_ENDPOINT`: OTLP/gRPC collector endpoint
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Target of the `/test` outbound call.
    pub downstream_url: Option<String>,
    /// Export to stdout instead of a collector.
    pub console_exporter: bool,
    /// Deployment environment tag.
    pub environment: String,
    /// Whether `DPanic` records panic.
    pub development: bool,
    /// Reported service name.
    pub service_name: String,
    /// APM API key.
    pub apm_api_key: Option<String>,
    /// OTLP collector endpoint.
    pub apm_endpoint: Option<String>,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `TRACELINK_PORT` is set but cannot be parsed as a valid port number
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let port = std::env::var("TRACELINK_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("TRACELINK_PORT is not a valid port number")?
            .unwrap_or(defaults.port);

        Ok(Self {
            host: std::env::var("TRACELINK_HOST").unwrap_or(defaults.host),
            port,
            downstream_url: non_empty_var("TRACELINK_DOWNSTREAM_URL"),
            console_exporter: flag_var("TRACELINK_CONSOLE_EXPORTER"),
            environment: non_empty_var("TRACELINK_ENVIRONMENT").unwrap_or(defaults.environment),
            development: flag_var("TRACELINK_DEVELOPMENT"),
            service_name: non_empty_var("ELASTIC_APM_SERVICE_NAME")
                .unwrap_or(defaults.service_name),
            apm_api_key: non_empty_var("ELASTIC_APM_API_KEY"),
            apm_endpoint: non_empty_var("ELASTIC_APM_ENDPOINT"),
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port combination is not a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Returns the URL `/test` calls, falling back to this server's own `/test-error`.
    #[must_use]
    pub fn downstream_url(&self) -> String {
        self.downstream_url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}/test-error", self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            downstream_url: None,
            console_exporter: false,
            environment: tracelink::export::DEFAULT_ENVIRONMENT.to_string(),
            development: false,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            apm_api_key: None,
            apm_endpoint: None,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn flag_var(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| parse_flag(&v))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
