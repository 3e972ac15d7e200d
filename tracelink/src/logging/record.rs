//! The record handed from the facade to its sinks.

use super::field::{fields_to_json, Field};
use super::level::Level;
use crate::span::SpanIds;
use chrono::{DateTime, Utc};

/// A single correlated log record.
///
/// `trace_id` and `span_id` are empty strings when no span was active.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Severity tier.
    pub level: Level,
    /// Rendered message.
    pub message: String,
    /// Trace identifier, or empty.
    pub trace_id: String,
    /// Span identifier, or empty.
    pub span_id: String,
    /// Structured fields.
    pub fields: Vec<Field>,
    /// Captured stack trace for error tiers.
    pub stacktrace: Option<String>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    ///
    /// A stack trace is captured when the level calls for one.
    #[must_use]
    pub fn new(level: Level, message: impl Into<String>, ids: Option<SpanIds>) -> Self {
        let (trace_id, span_id) = ids.map_or_else(
            || (String::new(), String::new()),
            |ids| (ids.trace_id, ids.span_id),
        );

        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            trace_id,
            span_id,
            fields: Vec::new(),
            stacktrace: level
                .captures_stack()
                .then(|| std::backtrace::Backtrace::force_capture().to_string()),
        }
    }

    /// Appends structured fields.
    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Whether the record is correlated with a span.
    #[must_use]
    pub fn is_correlated(&self) -> bool {
        !self.trace_id.is_empty()
    }

    /// Looks up a field by key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().rev().find(|f| f.key == key)
    }

    /// Renders the structured fields as JSON text, or `None` when there are none.
    #[must_use]
    pub fn fields_json(&self) -> Option<String> {
        (!self.fields.is_empty()).then(|| fields_to_json(&self.fields).to_string())
    }
}
