//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use tracelink::export::Telemetry;
use tracelink::logging::Logger;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The telemetry pipeline.
    telemetry: Telemetry,
    /// HTTP client for outbound calls.
    client: reqwest::Client,
    /// Target of the `/test` outbound call.
    downstream_url: String,
}

impl AppState {
    /// Creates a new application state.
    #[must_use]
    pub fn new(telemetry: Telemetry, downstream_url: impl Into<String>) -> Self {
        Self {
            telemetry,
            client: reqwest::Client::new(),
            downstream_url: downstream_url.into(),
        }
    }

    /// Returns the telemetry pipeline.
    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Returns the logging facade.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        self.telemetry.logger()
    }

    /// Returns the outbound HTTP client.
    #[must_use]
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Returns the target of the `/test` outbound call.
    #[must_use]
    pub fn downstream_url(&self) -> &str {
        &self.downstream_url
    }
}
