//! Severity tiers.

use opentelemetry::logs::Severity;
use serde::{Deserialize, Serialize};

/// Severity tier of a log record.
///
/// Ordered from least to most severe. `DPanic` panics only when the logger runs
/// in development mode; `Panic` always panics after emission and `Fatal`
/// terminates the process after flushing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Debug information.
    Debug,
    /// Informational messages.
    Info,
    /// Warning conditions.
    Warn,
    /// Error conditions.
    Error,
    /// Development-only panic; an error in production.
    DPanic,
    /// Error followed by a panic.
    Panic,
    /// Error followed by process termination.
    Fatal,
}

impl Level {
    /// Upper-case label used for the `log.level` span attribute and the
    /// severity text of exported records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::DPanic => "DPANIC",
            Self::Panic => "PANIC",
            Self::Fatal => "FATAL",
        }
    }

    /// Whether records at this level carry a captured stack trace.
    #[must_use]
    pub const fn captures_stack(self) -> bool {
        matches!(self, Self::Error | Self::DPanic | Self::Panic | Self::Fatal)
    }

    /// OpenTelemetry severity number for exported records.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::Debug => Severity::Debug,
            Self::Info => Severity::Info,
            Self::Warn => Severity::Warn,
            Self::Error => Severity::Error,
            Self::DPanic => Severity::Fatal,
            Self::Panic => Severity::Fatal2,
            Self::Fatal => Severity::Fatal3,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
