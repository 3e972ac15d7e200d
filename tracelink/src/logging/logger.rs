//! The correlated logging facade.

use super::field::Field;
use super::level::Level;
use super::meta::{classify_status, RequestMeta};
use super::record::LogRecord;
use crate::export::sink::SinkTee;
use crate::span::{SpanHandle, SpanIds};
use opentelemetry::trace::Status;
use opentelemetry::KeyValue;
use opentelemetry_sdk::trace::SdkTracerProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Span `log.level` label written by [`Logger::logf`].
const GENERIC_SPAN_LEVEL: &str = "LOG";

/// Behaviour of the `DPanic` tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// `DPanic` records are emitted as errors.
    #[default]
    Production,
    /// `DPanic` records panic after emission.
    Development,
}

struct Inner {
    sinks: SinkTee,
    mode: Mode,
    tracer_provider: Option<SdkTracerProvider>,
}

macro_rules! tier {
    ($level:expr, $plain:ident, $formatted:ident, $doc:literal) => {
        #[doc = concat!("Emits a ", $doc, " record with structured fields.")]
        pub fn $plain(
            &self,
            span: Option<&dyn SpanHandle>,
            message: impl Into<String>,
            fields: &[Field],
        ) {
            self.log(span, $level, message, fields);
        }

        #[doc = concat!("Emits a ", $doc, " record from format arguments.")]
        pub fn $formatted(&self, span: Option<&dyn SpanHandle>, args: fmt::Arguments<'_>) {
            self.log(span, $level, args.to_string(), &[]);
        }
    };
}

/// Span-correlated structured logger.
///
/// Every record is stamped with the trace and span identifiers of the span
/// passed in (empty strings when `None`) and fanned out to all configured
/// sinks. When a span is given, its `log.level` and `log.message` attributes
/// are overwritten with the latest record so the trace backend shows what was
/// logged last.
///
/// Cloning is cheap; clones share the same sinks.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tracelink::export::sink::{MemorySink, SinkTee};
/// use tracelink::logging::{Field, Logger, Mode};
///
/// let memory = Arc::new(MemorySink::new());
/// let logger = Logger::new(SinkTee::new().with_sink(memory.clone()), Mode::Production);
///
/// logger.info(None, "cache warmed", &[Field::new("entries", 128_i64)]);
/// logger.warn_fmt(None, format_args!("{} retries left", 2));
///
/// let records = memory.records();
/// assert_eq!(records[1].message, "2 retries left");
/// assert_eq!(records[0].trace_id, "");
/// ```
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl Logger {
    /// Creates a logger writing to `sinks`.
    #[must_use]
    pub fn new(sinks: SinkTee, mode: Mode) -> Self {
        Self {
            inner: Arc::new(Inner {
                sinks,
                mode,
                tracer_provider: None,
            }),
        }
    }

    /// Creates a logger that also flushes `tracer_provider` before a fatal exit.
    pub(crate) fn with_tracer_provider(
        sinks: SinkTee,
        mode: Mode,
        tracer_provider: SdkTracerProvider,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                sinks,
                mode,
                tracer_provider: Some(tracer_provider),
            }),
        }
    }

    /// Returns the `DPanic` mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.inner.mode
    }

    /// Emits a record at `level`.
    ///
    /// `Panic` flushes and panics after emission, `DPanic` does so only in
    /// [`Mode::Development`], and `Fatal` flushes and exits the process with
    /// status 1.
    pub fn log(
        &self,
        span: Option<&dyn SpanHandle>,
        level: Level,
        message: impl Into<String>,
        fields: &[Field],
    ) {
        let message = message.into();
        let ids = correlate(span, level.as_str(), &message);
        let record = LogRecord::new(level, message, ids).with_fields(fields.iter().cloned());

        self.emit(&record);
        self.escalate(&record);
    }

    tier!(Level::Debug, debug, debug_fmt, "debug");
    tier!(Level::Info, info, info_fmt, "info");
    tier!(Level::Warn, warn, warn_fmt, "warning");
    tier!(Level::Error, error, error_fmt, "error");
    tier!(Level::DPanic, dpanic, dpanic_fmt, "development-panic");
    tier!(Level::Panic, panic, panic_fmt, "panic");
    tier!(Level::Fatal, fatal, fatal_fmt, "fatal");

    /// Emits an info record from format arguments without committing to a
    /// tier; the span is labelled with the generic `LOG` level.
    pub fn logf(&self, span: Option<&dyn SpanHandle>, args: fmt::Arguments<'_>) {
        let message = args.to_string();
        let ids = correlate(span, GENERIC_SPAN_LEVEL, &message);
        self.emit(&LogRecord::new(Level::Info, message, ids));
    }

    /// Serializes `value` and logs it at info level under the key `label`.
    ///
    /// When serialization fails a single error record with the label and the
    /// serializer error is emitted instead, and the span is left untouched.
    pub fn log_json<T>(&self, span: Option<&dyn SpanHandle>, label: &str, value: &T)
    where
        T: Serialize + ?Sized,
    {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(err) => {
                let record = LogRecord::new(Level::Error, "Failed to marshal JSON", None)
                    .with_fields([Field::new("label", label), Field::new("error", err.to_string())]);
                self.emit(&record);
                return;
            }
        };

        let ids = correlate(span, Level::Info.as_str(), label);
        let record = LogRecord::new(Level::Info, "Logging JSON", ids)
            .with_fields([Field::new(label, json)]);
        self.emit(&record);
    }

    /// Decorates `span` with the HTTP attributes of `meta` and emits a summary
    /// record whose severity follows [`classify_status`].
    ///
    /// Does nothing when `span` is `None`.
    pub fn log_http_response(&self, span: Option<&dyn SpanHandle>, meta: &RequestMeta) {
        let Some(span) = span else {
            return;
        };

        span.set_attributes(meta.span_attributes());

        let class = classify_status(meta.status);
        if class.level == Level::Error {
            span.set_status(Status::error(class.message));
        }

        let mut record =
            LogRecord::new(class.level, class.message, span.ids()).with_fields(meta.log_fields());
        if class.unexpected {
            record.fields.push(Field::new("unexpected_status", true));
        }
        self.emit(&record);
    }

    /// Flushes every sink and the tracer provider, if any.
    pub fn flush(&self) {
        self.inner.sinks.flush();
        if let Some(provider) = &self.inner.tracer_provider {
            if let Err(e) = provider.force_flush() {
                tracing::warn!("Failed to flush spans: {}", e);
            }
        }
    }

    fn emit(&self, record: &LogRecord) {
        self.inner.sinks.write(record);
    }

    fn escalate(&self, record: &LogRecord) {
        match record.level {
            Level::Fatal => {
                self.flush();
                std::process::exit(1);
            }
            Level::Panic => {
                self.flush();
                panic!("{}", record.message);
            }
            Level::DPanic if self.inner.mode == Mode::Development => {
                self.flush();
                panic!("{}", record.message);
            }
            _ => {}
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("mode", &self.inner.mode)
            .field("sinks", &self.inner.sinks.names())
            .finish()
    }
}

fn correlate(span: Option<&dyn SpanHandle>, label: &str, message: &str) -> Option<SpanIds> {
    let span = span?;
    let ids = span.ids();

    let mut attributes = vec![
        KeyValue::new("log.level", label.to_string()),
        KeyValue::new("log.message", message.to_string()),
    ];
    if let Some(ids) = &ids {
        attributes.push(KeyValue::new("trace_id", ids.trace_id.clone()));
        attributes.push(KeyValue::new("span_id", ids.span_id.clone()));
    }
    span.set_attributes(attributes);

    ids
}
