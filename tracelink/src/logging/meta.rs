//! HTTP request metadata and status-based severity classification.

use super::field::Field;
use super::level::Level;
use axum::extract::ConnectInfo;
use axum::http::{header, Request};
use opentelemetry::KeyValue;
use std::net::SocketAddr;

/// Header carrying the caller-supplied request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Snapshot of one HTTP exchange, consumed by
/// [`Logger::log_http_response`](super::Logger::log_http_response).
///
/// Empty strings mean "not available" and are omitted from span attributes and
/// log fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Response status code.
    pub status: u16,
    /// Request path.
    pub path: String,
    /// Host the request was addressed to.
    pub domain: String,
    /// `User-Agent` header.
    pub agent: String,
    /// HTTP method.
    pub method: String,
    /// Remote peer address (`ip:port`).
    pub remote_ip: String,
    /// Raw query string, without the leading `?`.
    pub query: String,
    /// `X-Request-ID` header.
    pub request_id: String,
}

impl RequestMeta {
    /// Builds the snapshot from a request and the final status code.
    ///
    /// The domain comes from the URI authority when present and from the
    /// `Host` header otherwise. The remote address is read from axum's
    /// [`ConnectInfo`] extension.
    #[must_use]
    pub fn from_request<B>(request: &Request<B>, status: u16) -> Self {
        let header_value = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };

        let domain = request
            .uri()
            .host()
            .map_or_else(|| header_value(header::HOST.as_str()), ToString::to_string);

        Self {
            status,
            path: request.uri().path().to_string(),
            domain,
            agent: header_value(header::USER_AGENT.as_str()),
            method: request.method().to_string(),
            remote_ip: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.to_string())
                .unwrap_or_default(),
            query: request.uri().query().unwrap_or_default().to_string(),
            request_id: header_value(REQUEST_ID_HEADER),
        }
    }

    /// Returns a copy carrying a different status code.
    #[must_use]
    pub fn with_status(&self, status: u16) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    fn present(&self) -> [(&'static str, &'static str, &str); 7] {
        [
            ("http.path", "http_path", &self.path),
            ("http.domain", "http_domain", &self.domain),
            ("http.user_agent", "user_agent", &self.agent),
            ("http.method", "http_method", &self.method),
            ("http.remote_ip", "remote_ip", &self.remote_ip),
            ("http.query_params", "query_params", &self.query),
            ("http.request_id", "request_id", &self.request_id),
        ]
    }

    /// Span attributes: `http.status_code` plus one `http.*` entry per
    /// non-empty field.
    #[must_use]
    pub fn span_attributes(&self) -> Vec<KeyValue> {
        std::iter::once(KeyValue::new("http.status_code", i64::from(self.status)))
            .chain(
                self.present()
                    .into_iter()
                    .filter(|(_, _, value)| !value.is_empty())
                    .map(|(key, _, value)| KeyValue::new(key, value.to_string())),
            )
            .collect()
    }

    /// Log fields: `http_status` plus one entry per non-empty field.
    #[must_use]
    pub fn log_fields(&self) -> Vec<Field> {
        std::iter::once(Field::new("http_status", self.status))
            .chain(
                self.present()
                    .into_iter()
                    .filter(|(_, _, value)| !value.is_empty())
                    .map(|(_, key, value)| Field::new(key, value)),
            )
            .collect()
    }
}

/// Result of mapping a status code to a severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Severity of the summary record.
    pub level: Level,
    /// Summary message.
    pub message: &'static str,
    /// Set for status codes outside the 2xx-5xx bands.
    pub unexpected: bool,
}

/// Maps a response status to the severity of its summary record.
///
/// # Example
///
/// ```
/// use tracelink::logging::{classify_status, Level};
///
/// assert_eq!(classify_status(503).level, Level::Error);
/// assert_eq!(classify_status(404).level, Level::Warn);
/// assert!(classify_status(101).unexpected);
/// ```
#[must_use]
pub const fn classify_status(status: u16) -> Classification {
    let (level, message, unexpected) = match status {
        500..=u16::MAX => (Level::Error, "Internal Server Error occurred", false),
        400..=499 => (Level::Warn, "Client error response recorded", false),
        300..=399 => (Level::Info, "Redirection response recorded", false),
        200..=299 => (Level::Info, "Successful response recorded", false),
        _ => (Level::Info, "Unexpected status code recorded", true),
    };

    Classification {
        level,
        message,
        unexpected,
    }
}
