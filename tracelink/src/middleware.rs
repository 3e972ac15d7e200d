//! HTTP server instrumentation for axum routers.
//!
//! [`TraceMiddleware::wrap`] opens a server span per request, continuing any
//! trace propagated in the inbound `traceparent` header, and logs a summary
//! record once the response status is known. Handlers reach the request span
//! through the [`RequestSpan`] extension and can pin the response status early
//! through the [`StatusRecorder`] extension.

use crate::export::Telemetry;
use crate::logging::{Logger, RequestMeta};
use crate::span::{ScopedSpan, SpanHandle};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use opentelemetry::trace::{SpanContext, SpanKind, Status};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::SdkTracer;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

/// Status logged when the client goes away before the handler completes.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Per-request span handle, available to handlers as
/// `Extension<RequestSpan>`.
#[derive(Debug, Clone)]
pub struct RequestSpan(Context);

impl RequestSpan {
    /// Context holding the request span, for use as a parent of sub-operation
    /// spans and for outbound propagation.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.0
    }
}

impl SpanHandle for RequestSpan {
    fn span_context(&self) -> SpanContext {
        self.0.span_context()
    }

    fn set_attributes(&self, attributes: Vec<KeyValue>) {
        self.0.set_attributes(attributes);
    }

    fn set_status(&self, status: Status) {
        self.0.set_status(status);
    }

    fn record_error(&self, err: &dyn std::error::Error) {
        self.0.record_error(err);
    }
}

/// Remembers the first status code written for a request.
///
/// Available to handlers as `Extension<StatusRecorder>`. Once a status has
/// been written, later writes are ignored, including the status of the
/// response the handler eventually returns.
#[derive(Debug, Clone, Default)]
pub struct StatusRecorder {
    status: Arc<AtomicU16>,
}

impl StatusRecorder {
    /// Creates a recorder with no status written.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `status` unless one was already written, and returns the status
    /// in effect.
    pub fn write_header(&self, status: StatusCode) -> StatusCode {
        match self
            .status
            .compare_exchange(0, status.as_u16(), Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => status,
            Err(existing) => StatusCode::from_u16(existing).unwrap_or(status),
        }
    }

    /// Returns the recorded status, or `200 OK` when none was written.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.status.load(Ordering::Acquire) {
            0 => StatusCode::OK,
            code => StatusCode::from_u16(code).unwrap_or(StatusCode::OK),
        }
    }

    /// Whether a status has been written.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.status.load(Ordering::Acquire) != 0
    }
}

/// Request instrumentation for an axum [`Router`].
pub struct TraceMiddleware {
    tracer: SdkTracer,
    telemetry: Telemetry,
}

impl TraceMiddleware {
    /// Creates the middleware; spans are recorded under an instrumentation
    /// scope named after `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>, telemetry: &Telemetry) -> Self {
        Self {
            tracer: telemetry.tracer_named(service_name.into()),
            telemetry: telemetry.clone(),
        }
    }

    /// Wraps every route of `router`.
    ///
    /// Handler panics are turned into `500` responses inside the traced
    /// region, so they are logged and the span is ended like any other error.
    pub fn wrap<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router
            .layer(CatchPanicLayer::new())
            .layer(middleware::from_fn_with_state(Arc::new(self), trace_request))
    }
}

/// Logs the summary record exactly once, on completion or when dropped early.
struct RequestScope {
    logger: Logger,
    meta: RequestMeta,
    span: ScopedSpan,
    done: bool,
}

impl RequestScope {
    fn finish(&mut self, status: u16) {
        if self.done {
            return;
        }
        self.done = true;
        self.logger
            .log_http_response(Some(&self.span), &self.meta.with_status(status));
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        let status = if std::thread::panicking() {
            StatusCode::INTERNAL_SERVER_ERROR.as_u16()
        } else {
            CLIENT_CLOSED_REQUEST
        };
        self.finish(status);
    }
}

async fn trace_request(
    State(instrumentation): State<Arc<TraceMiddleware>>,
    mut request: Request,
    next: Next,
) -> Response {
    let parent = instrumentation
        .telemetry
        .propagator()
        .extract(request.headers());
    let span = ScopedSpan::start_with_kind(
        &instrumentation.tracer,
        &parent,
        request.uri().path().to_string(),
        SpanKind::Server,
    );

    let recorder = StatusRecorder::new();
    let meta = RequestMeta::from_request(&request, StatusCode::OK.as_u16());
    request
        .extensions_mut()
        .insert(RequestSpan(span.context().clone()));
    request.extensions_mut().insert(recorder.clone());

    let mut scope = RequestScope {
        logger: instrumentation.telemetry.logger().clone(),
        meta,
        span,
        done: false,
    };

    let mut response = next.run(request).await;

    let status = recorder.write_header(response.status());
    *response.status_mut() = status;
    scope.finish(status.as_u16());

    response
}
