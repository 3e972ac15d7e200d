//! Fluent construction of the telemetry pipeline.

use super::config::{ConsoleFormat, ExporterConfig};
use super::error::TelemetryError;
use super::pipeline::{Telemetry, TRACER_SCOPE};
use super::sink::{ConsoleSink, LogSink, OtelSink, SinkTee};
use crate::logging::Mode;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tonic::metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue};
use tonic::transport::ClientTlsConfig;
use url::Url;
use validator::Validate;

/// Builds a [`Telemetry`] pipeline.
///
/// Setters only record values; everything is checked by [`build`](Self::build).
///
/// # Example
///
/// ```no_run
/// use tracelink::export::ExporterBuilder;
///
/// # async fn run() -> Result<(), tracelink::export::TelemetryError> {
/// let telemetry = ExporterBuilder::new()
///     .with_service_name("checkout")
///     .with_environment("staging")
///     .with_endpoint_url("https://apm.example.com:443")
///     .with_auth_header("secret-token")
///     .build()
///     .await?;
///
/// telemetry.logger().info(None, "pipeline ready", &[]);
/// telemetry.shutdown()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ExporterBuilder {
    config: ExporterConfig,
    sinks: Vec<Arc<dyn LogSink>>,
}

impl ExporterBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the OTLP collector endpoint.
    #[must_use]
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = Some(url.into());
        self
    }

    /// Adds export metadata headers.
    #[must_use]
    pub fn with_headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.config
            .headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Adds an `Authorization: ApiKey <token>` header.
    #[must_use]
    pub fn with_auth_header(self, token: &str) -> Self {
        self.with_headers([("authorization", format!("ApiKey {token}"))])
    }

    /// Sets the `service.name` resource attribute.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service_name = name.into();
        self
    }

    /// Sets the `deployment.environment` resource attribute.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.config.environment = environment.into();
        self
    }

    /// Exports spans and records to stdout instead of a collector.
    #[must_use]
    pub fn with_console_exporter(mut self, enabled: bool) -> Self {
        self.config.console_exporter = enabled;
        self
    }

    /// Makes `DPanic` records panic.
    #[must_use]
    pub fn with_development_mode(mut self, enabled: bool) -> Self {
        self.config.development = enabled;
        self
    }

    /// Sets the console sink format.
    #[must_use]
    pub fn with_console_format(mut self, format: ConsoleFormat) -> Self {
        self.config.console_format = format;
        self
    }

    /// Bounds the endpoint reachability probe.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Appends an extra sink after the built-in ones.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the accumulated configuration.
    #[must_use]
    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    /// Validates the configuration and assembles the pipeline.
    ///
    /// Must run inside a Tokio runtime: the gRPC exporters bind to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, a header cannot be
    /// sent as metadata, the endpoint is unreachable or an exporter cannot be
    /// constructed. No partially built pipeline is returned.
    pub async fn build(self) -> Result<Telemetry, TelemetryError> {
        let Self { config, sinks } = self;
        config.validate()?;

        let resource = Resource::builder()
            .with_service_name(config.service_name.clone())
            .with_attributes([
                KeyValue::new("deployment.environment", config.environment.clone()),
                KeyValue::new("telemetry.sdk.language", "rust"),
            ])
            .build();

        let (tracer_provider, logger_provider) = if config.console_exporter {
            console_providers(resource)
        } else {
            otlp_providers(&config, resource).await?
        };

        let mut tee = SinkTee::new()
            .with_sink(Arc::new(ConsoleSink::new(config.console_format)))
            .with_sink(Arc::new(OtelSink::new(logger_provider.clone(), TRACER_SCOPE)));
        for sink in sinks {
            tee = tee.with_sink(sink);
        }

        let mode = if config.development {
            Mode::Development
        } else {
            Mode::Production
        };

        tracing::info!(
            service = %config.service_name,
            environment = %config.environment,
            console = config.console_exporter,
            "Telemetry pipeline ready"
        );

        Ok(Telemetry::new(
            config.service_name,
            tracer_provider,
            logger_provider,
            tee,
            mode,
        ))
    }
}

fn console_providers(resource: Resource) -> (SdkTracerProvider, SdkLoggerProvider) {
    let tracer_provider = SdkTracerProvider::builder()
        .with_resource(resource.clone())
        .with_batch_exporter(opentelemetry_stdout::SpanExporter::default())
        .build();
    let logger_provider = SdkLoggerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(opentelemetry_stdout::LogExporter::default())
        .build();
    (tracer_provider, logger_provider)
}

async fn otlp_providers(
    config: &ExporterConfig,
    resource: Resource,
) -> Result<(SdkTracerProvider, SdkLoggerProvider), TelemetryError> {
    let endpoint = config
        .endpoint
        .as_deref()
        .ok_or(TelemetryError::MissingEndpoint)?;
    let metadata = metadata_from(&config.headers)?;
    let url = probe(endpoint, config.probe_timeout).await?;

    let mut span_builder = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_metadata(metadata.clone());
    let mut log_builder = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_metadata(metadata);
    if url.scheme() == "https" {
        span_builder = span_builder.with_tls_config(ClientTlsConfig::new().with_enabled_roots());
        log_builder = log_builder.with_tls_config(ClientTlsConfig::new().with_enabled_roots());
    }

    let tracer_provider = SdkTracerProvider::builder()
        .with_resource(resource.clone())
        .with_batch_exporter(span_builder.build()?)
        .build();
    let logger_provider = SdkLoggerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(log_builder.build()?)
        .build();

    Ok((tracer_provider, logger_provider))
}

/// Converts configured headers into gRPC metadata.
fn metadata_from(headers: &[(String, String)]) -> Result<MetadataMap, TelemetryError> {
    let mut metadata = MetadataMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = || TelemetryError::InvalidHeader { name: name.clone() };
        let key = MetadataKey::<Ascii>::from_bytes(name.to_ascii_lowercase().as_bytes())
            .map_err(|_| invalid())?;
        let value = MetadataValue::<Ascii>::try_from(value.as_str()).map_err(|_| invalid())?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}

/// Checks that the endpoint accepts TCP connections within `timeout`.
async fn probe(endpoint: &str, timeout: Duration) -> Result<Url, TelemetryError> {
    let invalid = |reason: &str| TelemetryError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(&e.to_string()))?;
    let host = url
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
        .ok_or_else(|| invalid("missing host"))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| invalid("missing port"))?;

    let unreachable = |reason: String| TelemetryError::UnreachableEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    match tokio::time::timeout(timeout, TcpStream::connect((host.as_str(), port))).await {
        Ok(Ok(_)) => {
            tracing::debug!(endpoint, "Exporter endpoint reachable");
            Ok(url)
        }
        Ok(Err(e)) => Err(unreachable(e.to_string())),
        Err(_) => Err(unreachable(format!("no connection within {timeout:?}"))),
    }
}
