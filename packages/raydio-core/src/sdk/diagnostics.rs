//! Diagnostic log records from the SDK and the default relay into `tracing`.

use serde::Serialize;

use super::DiagnosticLogHandler;

/// One diagnostic record as produced by the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticLog {
    pub message: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
}

impl DiagnosticLog {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: crate::utils::now_millis(),
        }
    }
}

/// Relays SDK diagnostics to `tracing` without altering them.
///
/// Runs on whatever thread the SDK calls back on and never touches session
/// state.
pub struct TracingLogSink;

impl DiagnosticLogHandler for TracingLogSink {
    fn on_information_log(&self, log: DiagnosticLog) {
        tracing::info!(target: "raydio::sdk", timestamp = log.timestamp, "{}", log.message);
    }

    fn on_error_log(&self, log: DiagnosticLog) {
        tracing::error!(target: "raydio::sdk", timestamp = log.timestamp, "{}", log.message);
    }

    fn on_system_error_log(&self, log: DiagnosticLog) {
        tracing::error!(
            target: "raydio::sdk",
            timestamp = log.timestamp,
            system = true,
            "{}",
            log.message
        );
    }

    fn on_interaction_log(&self, log: DiagnosticLog) {
        tracing::debug!(target: "raydio::sdk", timestamp = log.timestamp, "{}", log.message);
    }
}
