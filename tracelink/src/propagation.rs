//! W3C Trace Context propagation over HTTP headers.
//!
//! Inbound requests are read with [`Propagator::extract`], outbound requests are
//! decorated with [`Propagator::inject`]. Both operate on [`HeaderMap`], which is
//! the header type shared by axum (inbound) and reqwest (outbound).

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;

/// Name of the W3C trace-context header.
pub const TRACEPARENT: &str = "traceparent";

/// Name of the W3C trace-state header.
pub const TRACESTATE: &str = "tracestate";

/// Read-only view of a header map for the OpenTelemetry propagator.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

/// Mutable view of a header map for the OpenTelemetry propagator.
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

/// Extracts and injects W3C trace context.
#[derive(Debug, Default)]
pub struct Propagator {
    inner: TraceContextPropagator,
}

impl Propagator {
    /// Creates a W3C trace-context propagator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts the remote parent from inbound headers.
    ///
    /// A missing or malformed `traceparent` yields an empty context, so callers
    /// can always start a span from the result.
    #[must_use]
    pub fn extract(&self, headers: &HeaderMap) -> Context {
        self.inner
            .extract_with_context(&Context::new(), &HeaderExtractor(headers))
    }

    /// Writes the trace context of `cx` into outbound headers.
    ///
    /// Does nothing when `cx` holds no valid span.
    pub fn inject(&self, cx: &Context, headers: &mut HeaderMap) {
        self.inner.inject_context(cx, &mut HeaderInjector(headers));
    }
}
