//! Core domain types

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Connection
// ─────────────────────────────────────────────────────────────────

/// Logical connection state of the session. Exactly one value at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Authorizing,
    Unauthorized,
    ConnectionRefused,
    ConnectionReset,
    TimedOut,
    Failed,
    Connected,
    ToolMissing,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Reason reported to callers when an action is refused in this state
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            ConnectionState::Connected => None,
            ConnectionState::Disconnected => Some(FailureReason::Disconnected),
            ConnectionState::Authorizing => Some(FailureReason::Authorizing),
            ConnectionState::Unauthorized => Some(FailureReason::Unauthorized),
            ConnectionState::ConnectionRefused => Some(FailureReason::ConnectionRefused),
            ConnectionState::ConnectionReset => Some(FailureReason::ConnectionReset),
            ConnectionState::TimedOut => Some(FailureReason::TimedOut),
            ConnectionState::Failed => Some(FailureReason::GenericFailure),
            ConnectionState::ToolMissing => Some(FailureReason::ToolUnavailable),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Authorizing => "device still authorizing",
            ConnectionState::Unauthorized => "device unauthorized",
            ConnectionState::ConnectionRefused => "connection refused",
            ConnectionState::ConnectionReset => "connection reset",
            ConnectionState::TimedOut => "timed out",
            ConnectionState::Failed => "failed to connect",
            ConnectionState::Connected => "connected",
            ConnectionState::ToolMissing => "adb executable not found",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ─────────────────────────────────────────────────────────────────
// Foreground application
// ─────────────────────────────────────────────────────────────────

/// Resolved foreground application identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum AppIdentity {
    /// A launcher / home screen is in front
    Home,
    /// Something is focused but no package could be extracted
    Other,
    /// A package identifier such as `com.google.android.youtube.tv`
    Package(String),
}

impl AppIdentity {
    pub const HOME_ID: &'static str = "home";
    pub const OTHER_ID: &'static str = "other";

    pub fn as_str(&self) -> &str {
        match self {
            AppIdentity::Home => Self::HOME_ID,
            AppIdentity::Other => Self::OTHER_ID,
            AppIdentity::Package(id) => id,
        }
    }

    pub fn is_home(&self) -> bool {
        matches!(self, AppIdentity::Home)
    }
}

impl std::fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────
// Action results
// ─────────────────────────────────────────────────────────────────

/// Why an action or probe did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ToolUnavailable,
    Disconnected,
    Authorizing,
    Unauthorized,
    ConnectionRefused,
    ConnectionReset,
    TimedOut,
    GenericFailure,
    ParseFailure,
    PowerCycleExhausted,
    /// A power cycle is already running
    Busy,
}

/// Outcome of a session operation: `{succeeded, detail}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub succeeded: bool,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl ActionResult {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            detail: detail.into(),
            reason: None,
        }
    }

    pub fn failure(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            detail: detail.into(),
            reason: Some(reason),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Power
// ─────────────────────────────────────────────────────────────────

/// Desired end state of a power cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerTarget {
    On,
    Off,
}

impl PowerTarget {
    /// Whether an observed awake flag satisfies this target
    pub fn is_reached(&self, awake: bool) -> bool {
        match self {
            PowerTarget::On => awake,
            PowerTarget::Off => !awake,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Snapshots
// ─────────────────────────────────────────────────────────────────

/// Serializable copy of the cached session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub endpoint: String,
    pub connection: ConnectionState,
    pub awake: bool,
    /// `None` while asleep or before the first detection
    pub app: Option<AppIdentity>,
    pub playing: bool,
    pub power_cycling: bool,
    pub initialized: bool,
}

/// Device identification read via `getprop`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: String,
    pub manufacturer: String,
    pub serial: String,
}
