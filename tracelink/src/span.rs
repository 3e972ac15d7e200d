//! Span lifecycle accessor.
//!
//! Wraps the OpenTelemetry span API behind a scoped guard so that every span
//! opened by the middleware or by a handler is ended exactly once, on every
//! exit path. Also defines [`SpanHandle`], the seam the logging facade uses to
//! correlate records with "whatever span the caller has".

use opentelemetry::trace::{SpanContext, SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use std::borrow::Cow;

/// Trace and span identifiers of a live span, rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanIds {
    /// 32 hex digit trace identifier.
    pub trace_id: String,
    /// 16 hex digit span identifier.
    pub span_id: String,
}

impl SpanIds {
    /// Reads the identifiers from a span context.
    ///
    /// Returns `None` for an invalid context (no span, or all-zero ids).
    #[must_use]
    pub fn from_span_context(span_context: &SpanContext) -> Option<Self> {
        span_context.is_valid().then(|| Self {
            trace_id: span_context.trace_id().to_string(),
            span_id: span_context.span_id().to_string(),
        })
    }
}

/// Something a log record can be correlated with.
///
/// Implemented for [`ScopedSpan`], for a plain [`Context`] carrying a span and
/// for the per-request handle the middleware hands to handlers. Setting
/// attributes on a span that has already ended is silently ignored by the SDK.
pub trait SpanHandle: Send + Sync {
    /// Returns the span context of the underlying span.
    fn span_context(&self) -> SpanContext;

    /// Sets attributes on the underlying span.
    fn set_attributes(&self, attributes: Vec<KeyValue>);

    /// Sets the status of the underlying span.
    fn set_status(&self, status: Status);

    /// Records an error event on the underlying span.
    fn record_error(&self, err: &dyn std::error::Error);

    /// Returns the hex identifiers, or `None` when no valid span is present.
    fn ids(&self) -> Option<SpanIds> {
        SpanIds::from_span_context(&self.span_context())
    }
}

impl SpanHandle for Context {
    fn span_context(&self) -> SpanContext {
        self.span().span_context().clone()
    }

    fn set_attributes(&self, attributes: Vec<KeyValue>) {
        self.span().set_attributes(attributes);
    }

    fn set_status(&self, status: Status) {
        self.span().set_status(status);
    }

    fn record_error(&self, err: &dyn std::error::Error) {
        self.span().record_error(err);
    }
}

/// A span that is ended when it goes out of scope.
///
/// The span lives inside an OpenTelemetry [`Context`], so [`ScopedSpan::context`]
/// can be used as the parent of sub-operation spans and for propagation.
///
/// # Example
///
/// ```
/// use opentelemetry::trace::TracerProvider as _;
/// use opentelemetry::Context;
/// use opentelemetry_sdk::trace::SdkTracerProvider;
/// use tracelink::span::ScopedSpan;
///
/// let provider = SdkTracerProvider::builder().build();
/// let tracer = provider.tracer("example");
///
/// let request = ScopedSpan::start(&tracer, &Context::new(), "GET /users");
/// {
///     let query = ScopedSpan::start(&tracer, request.context(), "load users");
///     assert_eq!(query.trace_id(), request.trace_id());
/// } // `query` ends here
/// request.end();
/// ```
#[derive(Debug)]
pub struct ScopedSpan {
    cx: Context,
    ended: bool,
}

impl ScopedSpan {
    /// Starts an internal span named `name` as a child of the span in `parent`.
    ///
    /// When `parent` holds no span, the new span is a trace root.
    pub fn start<T>(tracer: &T, parent: &Context, name: impl Into<Cow<'static, str>>) -> Self
    where
        T: Tracer,
        T::Span: Send + Sync + 'static,
    {
        Self::start_with_kind(tracer, parent, name, SpanKind::Internal)
    }

    /// Starts a span of the given kind as a child of the span in `parent`.
    pub fn start_with_kind<T>(
        tracer: &T,
        parent: &Context,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
    ) -> Self
    where
        T: Tracer,
        T::Span: Send + Sync + 'static,
    {
        let span = tracer
            .span_builder(name)
            .with_kind(kind)
            .start_with_context(tracer, parent);

        Self {
            cx: parent.with_span(span),
            ended: false,
        }
    }

    /// Returns the context holding this span.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.cx
    }

    /// Returns the trace identifier as lowercase hex.
    #[must_use]
    pub fn trace_id(&self) -> String {
        self.cx.span().span_context().trace_id().to_string()
    }

    /// Returns the span identifier as lowercase hex.
    #[must_use]
    pub fn span_id(&self) -> String {
        self.cx.span().span_context().span_id().to_string()
    }

    /// Ends the span now.
    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if !self.ended {
            self.ended = true;
            self.cx.span().end();
        }
    }
}

impl Drop for ScopedSpan {
    fn drop(&mut self) {
        self.finish();
    }
}

impl SpanHandle for ScopedSpan {
    fn span_context(&self) -> SpanContext {
        self.cx.span_context()
    }

    fn set_attributes(&self, attributes: Vec<KeyValue>) {
        self.cx.set_attributes(attributes);
    }

    fn set_status(&self, status: Status) {
        self.cx.set_status(status);
    }

    fn record_error(&self, err: &dyn std::error::Error) {
        self.cx.record_error(err);
    }
}
