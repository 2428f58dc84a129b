//! Connection outcome classification
//!
//! The combined text of `adb connect` and the endpoint's `adb devices` line is
//! matched against an ordered rule table. The first rule that matches decides
//! the [`ConnectionState`]; if none matches the device is connected.

use tvbridge_core::ConnectionState;

use crate::runner::{CommandOutput, CommandStatus};

/// Status column value of a usable device in `adb devices`
pub const DEVICE_READY_STATUS: &str = "device";

/// Everything the classifier looks at for one connection attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectTranscript {
    /// Lower-cased connect output plus the endpoint's device line
    pub text: String,
    /// Status column of the endpoint's line in `adb devices`, if listed
    pub device_status: Option<String>,
}

impl ConnectTranscript {
    pub fn new(connect_output: &str, devices_output: &str, endpoint: &str) -> Self {
        let device_line = find_device_line(devices_output, endpoint);
        let device_status = device_line
            .and_then(|line| line.split_whitespace().nth(1))
            .map(|s| s.to_lowercase());

        let mut text = connect_output.to_lowercase();
        if let Some(line) = device_line {
            text.push('\n');
            text.push_str(&line.to_lowercase());
        }

        Self {
            text,
            device_status,
        }
    }

    fn contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.text.contains(n))
    }
}

/// Find the `adb devices` line for this endpoint.
///
/// Matches the serial column exactly, or with an implied port when the
/// endpoint was given without one.
pub fn find_device_line<'a>(devices_output: &'a str, endpoint: &str) -> Option<&'a str> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return None;
    }
    let with_port = format!("{}:", endpoint);

    devices_output.lines().map(str::trim).find(|line| {
        line.split_whitespace()
            .next()
            .is_some_and(|serial| serial == endpoint || serial.starts_with(&with_port))
    })
}

/// One entry in the classification table
pub struct ClassificationRule {
    pub name: &'static str,
    pub matches: fn(&ConnectTranscript) -> bool,
    pub outcome: ConnectionState,
}

/// Ordered classification table. Order is precedence.
pub static CLASSIFICATION_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        name: "still authorizing",
        matches: |t| {
            t.text.contains("device still authorizing")
                || t.device_status.as_deref() == Some("authorizing")
        },
        outcome: ConnectionState::Authorizing,
    },
    ClassificationRule {
        name: "unauthorized",
        matches: |t| t.text.contains("unauthorized"),
        outcome: ConnectionState::Unauthorized,
    },
    ClassificationRule {
        name: "timeout",
        matches: |t| t.contains_any(&["timed out", "host is down", "no route to host"]),
        outcome: ConnectionState::TimedOut,
    },
    ClassificationRule {
        name: "refused",
        matches: |t| t.text.contains("connection refused"),
        outcome: ConnectionState::ConnectionRefused,
    },
    ClassificationRule {
        name: "reset",
        matches: |t| t.text.contains("connection reset"),
        outcome: ConnectionState::ConnectionReset,
    },
    ClassificationRule {
        name: "failed",
        matches: |t| t.contains_any(&["failed to connect", "cannot connect"]),
        outcome: ConnectionState::Failed,
    },
    ClassificationRule {
        name: "listed but not ready",
        matches: |t| {
            t.device_status
                .as_deref()
                .is_some_and(|status| status != DEVICE_READY_STATUS)
        },
        outcome: ConnectionState::Disconnected,
    },
    ClassificationRule {
        name: "no proof of connection",
        matches: |t| !t.text.contains("already connected") && t.device_status.is_none(),
        outcome: ConnectionState::Disconnected,
    },
];

/// Classify a transcript by first-match precedence
pub fn classify(transcript: &ConnectTranscript) -> ConnectionState {
    CLASSIFICATION_RULES
        .iter()
        .find(|rule| (rule.matches)(transcript))
        .map(|rule| {
            tracing::trace!("Connection classified by rule '{}'", rule.name);
            rule.outcome
        })
        .unwrap_or(ConnectionState::Connected)
}

/// Map runner-level failures of `adb connect` before looking at text
pub fn classify_runner_failure(connect: &CommandOutput) -> Option<ConnectionState> {
    match connect.status {
        CommandStatus::NotFound => Some(ConnectionState::ToolMissing),
        CommandStatus::TimedOut => Some(ConnectionState::TimedOut),
        CommandStatus::Killed => Some(ConnectionState::Disconnected),
        CommandStatus::Success | CommandStatus::Failed => None,
    }
}
