//! Headless mode - JSON event output on stdout
//!
//! Session events and command results are written as NDJSON
//! (newline-delimited JSON), one object per line. Each object has an
//! "event" field indicating its kind, along with kind-specific data.
//!
//! # Example Output
//!
//! ```json
//! {"event":"session","name":"connected","message":"Device is connected","timestamp":1704700001000}
//! {"event":"session","name":"appChange","message":"home","timestamp":1704700001500}
//! {"event":"command_result","command":"input KEYCODE_HOME","succeeded":true,"detail":"KEYCODE_HOME","timestamp":1704700002000}
//! ```

pub mod runner;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};
use tracing::error;

use tvbridge_core::{ActionResult, DeviceInfo, FailureReason, SessionEvent};

/// Lines emitted in headless mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Session lifecycle notification
    Session {
        name: &'static str,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        debug: Option<Value>,
        timestamp: i64,
    },

    /// Outcome of a stdin command
    CommandResult {
        command: String,
        succeeded: bool,
        detail: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<FailureReason>,
        timestamp: i64,
    },

    /// Reply to `info`
    DeviceInfo {
        #[serde(flatten)]
        info: DeviceInfo,
        timestamp: i64,
    },

    /// Error occurred
    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },
}

impl HeadlessEvent {
    /// Emit this event to stdout as JSON
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        // Flush to ensure immediate output
        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    /// Get current timestamp in milliseconds
    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    // ─────────────────────────────────────────────────────────
    // Convenience constructors
    // ─────────────────────────────────────────────────────────

    pub fn session(event: &SessionEvent) -> Self {
        Self::Session {
            name: event.event_type(),
            message: event.message(),
            debug: event.debug(),
            timestamp: Self::now(),
        }
    }

    pub fn command_result(command: impl Into<String>, result: ActionResult) -> Self {
        Self::CommandResult {
            command: command.into(),
            succeeded: result.succeeded,
            detail: result.detail,
            reason: result.reason,
            timestamp: Self::now(),
        }
    }

    pub fn device_info(info: DeviceInfo) -> Self {
        Self::DeviceInfo {
            info,
            timestamp: Self::now(),
        }
    }

    pub fn error(message: impl Into<String>, fatal: bool) -> Self {
        Self::Error {
            message: message.into(),
            fatal,
            timestamp: Self::now(),
        }
    }
}
