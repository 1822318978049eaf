//! Structured log entries and the outbound sink.
//!
//! The agent reports every state-changing action to an external collector
//! (the app-side log viewer). Delivery is fire-and-forget: a sink that drops
//! or fails must never affect the agent's control flow. Severity is the
//! explicit `type` field; consumers must not infer it from message text.

use serde::Serialize;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One structured log entry, as delivered to the collector.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub message: String,
    #[serde(rename = "type")]
    pub level: LogLevel,
    /// ISO 8601 wall-clock time, formatted by the host clock.
    pub timestamp: String,
    /// Emitting component, e.g. `"ad-guard"`.
    pub source: String,
}

/// Outbound log channel.
pub trait LogSink {
    /// Deliver one entry. Must not block and must not fail loudly.
    fn emit(&self, entry: &LogEntry);
}
