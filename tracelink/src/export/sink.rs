//! Log sinks and the fan-out tee.
//!
//! Each sink receives every [`LogRecord`] the facade emits. The console sink
//! renders locally, the OTLP sink hands records to the OpenTelemetry SDK and
//! the memory sink keeps them for inspection.

use super::config::ConsoleFormat;
use super::error::SinkError;
use crate::logging::{Level, LogRecord};
use opentelemetry::logs::{AnyValue, LogRecord as _, Logger as _, LoggerProvider as _};
use opentelemetry::trace::{SpanId, TraceId};
use opentelemetry_sdk::logs::{SdkLogger, SdkLoggerProvider};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::Dispatch;

/// Destination for log records.
pub trait LogSink: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Writes one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be accepted.
    fn write(&self, record: &LogRecord) -> Result<(), SinkError>;

    /// Flushes buffered records.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered records could not be delivered.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Ordered fan-out over several sinks.
///
/// Sink failures never reach the caller; they are reported through `tracing`
/// and the remaining sinks still receive the record.
#[derive(Clone, Default)]
pub struct SinkTee {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl SinkTee {
    /// Creates an empty tee.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether the tee has no sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Sink names in write order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Writes `record` to every sink and returns how many accepted it.
    pub fn write(&self, record: &LogRecord) -> usize {
        self.sinks
            .iter()
            .filter(|sink| match sink.write(record) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(sink = sink.name(), "Failed to write log record: {}", e);
                    false
                }
            })
            .count()
    }

    /// Flushes every sink.
    pub fn flush(&self) {
        for sink in &self.sinks {
            if let Err(e) = sink.flush() {
                tracing::warn!(sink = sink.name(), "Failed to flush sink: {}", e);
            }
        }
    }
}

const CONSOLE_TARGET: &str = "tracelink";

/// Renders records on stdout through a dedicated `tracing` dispatcher.
///
/// The dispatcher is private to the sink, so facade output neither depends on
/// nor interferes with the application's own subscriber.
pub struct ConsoleSink {
    dispatch: Dispatch,
}

impl ConsoleSink {
    /// Creates a console sink emitting debug level and above.
    #[must_use]
    pub fn new(format: ConsoleFormat) -> Self {
        let builder = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false);

        let dispatch = match format {
            ConsoleFormat::Pretty => Dispatch::new(builder.finish()),
            ConsoleFormat::Json => Dispatch::new(builder.json().flatten_event(true).finish()),
        };

        Self { dispatch }
    }
}

impl LogSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        tracing::dispatcher::with_default(&self.dispatch, || console_event(record));
        Ok(())
    }
}

fn console_event(record: &LogRecord) {
    let fields = record.fields_json();

    macro_rules! event_at {
        ($level:expr) => {
            tracing::event!(
                target: CONSOLE_TARGET,
                $level,
                severity = record.level.as_str(),
                trace_id = record.trace_id.as_str(),
                span_id = record.span_id.as_str(),
                fields = fields.as_deref(),
                stacktrace = record.stacktrace.as_deref(),
                "{}",
                record.message
            )
        };
    }

    match record.level {
        Level::Debug => event_at!(tracing::Level::DEBUG),
        Level::Info => event_at!(tracing::Level::INFO),
        Level::Warn => event_at!(tracing::Level::WARN),
        Level::Error | Level::DPanic | Level::Panic | Level::Fatal => {
            event_at!(tracing::Level::ERROR);
        }
    }
}

/// Hands records to an OpenTelemetry logger provider.
///
/// Delivery happens on the provider's batch processor; `write` only enqueues.
pub struct OtelSink {
    provider: SdkLoggerProvider,
    logger: SdkLogger,
}

impl OtelSink {
    /// Creates a sink emitting through `provider` under the given scope name.
    #[must_use]
    pub fn new(provider: SdkLoggerProvider, scope: &'static str) -> Self {
        let logger = provider.logger(scope);
        Self { provider, logger }
    }
}

impl LogSink for OtelSink {
    fn name(&self) -> &'static str {
        "otlp"
    }

    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        let mut log = self.logger.create_log_record();
        log.set_timestamp(SystemTime::from(record.timestamp));
        log.set_observed_timestamp(SystemTime::now());
        log.set_severity_number(record.level.severity());
        log.set_severity_text(record.level.as_str());
        log.set_body(AnyValue::from(record.message.clone()));

        if let (Ok(trace_id), Ok(span_id)) = (
            TraceId::from_hex(&record.trace_id),
            SpanId::from_hex(&record.span_id),
        ) {
            log.set_trace_context(trace_id, span_id, None);
        }

        log.add_attribute("trace_id", record.trace_id.clone());
        log.add_attribute("span_id", record.span_id.clone());
        for field in &record.fields {
            log.add_attribute(field.key.clone(), field.value.to_any_value());
        }
        if let Some(stacktrace) = &record.stacktrace {
            log.add_attribute("stacktrace", stacktrace.clone());
        }

        self.logger.emit(log);
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.provider.force_flush().map_err(|e| SinkError::Flush {
            sink: "otlp",
            reason: e.to_string(),
        })
    }
}

/// Keeps records in memory.
///
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<RwLock<Vec<LogRecord>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the stored records.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or_default()
    }

    /// Whether no record has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every stored record.
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.write() {
            records.clear();
        }
    }
}

impl LogSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        self.records
            .write()
            .map_err(|_| SinkError::Lock("memory"))?
            .push(record.clone());
        Ok(())
    }
}
