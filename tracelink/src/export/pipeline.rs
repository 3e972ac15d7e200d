//! The assembled telemetry pipeline.

use super::error::TelemetryError;
use super::sink::SinkTee;
use crate::logging::{Logger, Mode};
use crate::propagation::Propagator;
use crate::span::ScopedSpan;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::Context;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Instrumentation scope of the default tracer.
pub const TRACER_SCOPE: &str = "tracelink";

struct Inner {
    service_name: String,
    tracer_provider: SdkTracerProvider,
    logger_provider: SdkLoggerProvider,
    tracer: SdkTracer,
    propagator: Propagator,
    logger: Logger,
    shut_down: AtomicBool,
}

/// Handle to a running telemetry pipeline.
///
/// Owns the tracer and logger providers; nothing is registered globally.
/// Clones share the same pipeline. Call [`Telemetry::shutdown`] before exit to
/// flush buffered spans and records.
#[derive(Clone)]
pub struct Telemetry {
    inner: Arc<Inner>,
}

impl Telemetry {
    /// Assembles a handle from already-built providers and sinks.
    ///
    /// [`ExporterBuilder::build`](super::ExporterBuilder::build) is the usual
    /// way to obtain one; this constructor serves custom pipelines.
    #[must_use]
    pub fn new(
        service_name: impl Into<String>,
        tracer_provider: SdkTracerProvider,
        logger_provider: SdkLoggerProvider,
        sinks: SinkTee,
        mode: Mode,
    ) -> Self {
        let tracer = tracer_provider.tracer(TRACER_SCOPE);
        let logger = Logger::with_tracer_provider(sinks, mode, tracer_provider.clone());

        Self {
            inner: Arc::new(Inner {
                service_name: service_name.into(),
                tracer_provider,
                logger_provider,
                tracer,
                propagator: Propagator::new(),
                logger,
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the logging facade.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    /// Returns the default tracer.
    #[must_use]
    pub fn tracer(&self) -> &SdkTracer {
        &self.inner.tracer
    }

    /// Returns a tracer for a named instrumentation scope.
    #[must_use]
    pub fn tracer_named(&self, name: impl Into<Cow<'static, str>>) -> SdkTracer {
        self.inner.tracer_provider.tracer(name)
    }

    /// Returns the W3C propagator.
    #[must_use]
    pub fn propagator(&self) -> &Propagator {
        &self.inner.propagator
    }

    /// Starts a span on the default tracer as a child of the span in `parent`.
    pub fn start_span(&self, parent: &Context, name: impl Into<Cow<'static, str>>) -> ScopedSpan {
        ScopedSpan::start(&self.inner.tracer, parent, name)
    }

    /// Returns the configured service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    /// Flushes and shuts down both providers.
    ///
    /// Only the first call does any work.
    ///
    /// # Errors
    ///
    /// Returns an error if either provider fails to shut down.
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.inner.logger.flush();
        let traces = self.inner.tracer_provider.shutdown();
        let logs = self.inner.logger_provider.shutdown();

        traces
            .and(logs)
            .map_err(|e| TelemetryError::Shutdown(e.to_string()))
    }
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("service_name", &self.inner.service_name)
            .field("logger", &self.inner.logger)
            .finish_non_exhaustive()
    }
}
