//! Session lifecycle events
//!
//! Every notification a session can publish is a variant of [`SessionEvent`].
//! Subscribers match on the variant; `event_type()` gives the stable wire name
//! used by the headless NDJSON output.

use serde::Serialize;
use serde_json::{json, Value};

use crate::types::{AppIdentity, ConnectionState, SessionSnapshot};

/// Terminal outcome of a power cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerOutcome {
    Success,
    Failed,
}

impl PowerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerOutcome::Success => "Success",
            PowerOutcome::Failed => "Failed",
        }
    }
}

/// Typed lifecycle notification published by a session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    // ─────────────────────────────────────────────────────────
    // Connection
    // ─────────────────────────────────────────────────────────
    /// Device is still showing the authorization prompt
    Connecting,
    Connected,
    Disconnected {
        state: ConnectionState,
    },
    /// Left the unauthorized state
    Authorized,
    Unauthorized,
    Timeout,

    // ─────────────────────────────────────────────────────────
    // Status
    // ─────────────────────────────────────────────────────────
    Awake,
    Sleep,
    /// `None` when the app is undetermined (device asleep)
    AppChange {
        app: Option<AppIdentity>,
    },
    Playback {
        playing: bool,
    },

    // ─────────────────────────────────────────────────────────
    // Power cycle
    // ─────────────────────────────────────────────────────────
    PowerOn,
    PowerOff,
    DebugPowerOn {
        awake: bool,
        remaining: u32,
    },
    DebugPowerOff {
        awake: bool,
        remaining: u32,
    },
    PowerOnStatus {
        outcome: PowerOutcome,
    },
    PowerOffStatus {
        outcome: PowerOutcome,
    },

    // ─────────────────────────────────────────────────────────
    // Engine
    // ─────────────────────────────────────────────────────────
    /// Emitted at the end of every poll tick
    Status {
        snapshot: SessionSnapshot,
    },
    /// First complete poll cycle against a connected device
    #[serde(rename = "firstrun")]
    FirstRun,
    #[serde(rename = "fatalerror")]
    FatalError {
        message: String,
    },
}

impl SessionEvent {
    /// Stable wire name of this event
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::Authorized => "authorized",
            Self::Unauthorized => "unauthorized",
            Self::Timeout => "timeout",
            Self::Awake => "awake",
            Self::Sleep => "sleep",
            Self::AppChange { .. } => "appChange",
            Self::Playback { .. } => "playback",
            Self::PowerOn => "powerOn",
            Self::PowerOff => "powerOff",
            Self::DebugPowerOn { .. } => "debugPowerOn",
            Self::DebugPowerOff { .. } => "debugPowerOff",
            Self::PowerOnStatus { .. } => "powerOnStatus",
            Self::PowerOffStatus { .. } => "powerOffStatus",
            Self::Status { .. } => "status",
            Self::FirstRun => "firstrun",
            Self::FatalError { .. } => "fatalerror",
        }
    }

    /// Human-readable message payload
    pub fn message(&self) -> String {
        match self {
            Self::Connecting => "Device is authorizing".to_string(),
            Self::Connected => "Device is connected".to_string(),
            Self::Disconnected { state } => state.label().to_string(),
            Self::Authorized => "Device is authorized".to_string(),
            Self::Unauthorized => "Device is unauthorized".to_string(),
            Self::Timeout => "Connection timed out".to_string(),
            Self::Awake => "Device is awake".to_string(),
            Self::Sleep => "Device is asleep".to_string(),
            Self::AppChange { app } => app
                .as_ref()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "undetermined".to_string()),
            Self::Playback { playing } => playing.to_string(),
            Self::PowerOn => "Turning power on".to_string(),
            Self::PowerOff => "Turning power off".to_string(),
            Self::DebugPowerOn { awake, .. } | Self::DebugPowerOff { awake, .. } => {
                format!("awake={}", awake)
            }
            Self::PowerOnStatus { outcome } | Self::PowerOffStatus { outcome } => {
                outcome.as_str().to_string()
            }
            Self::Status { snapshot } => snapshot.connection.label().to_string(),
            Self::FirstRun => "First poll cycle completed".to_string(),
            Self::FatalError { message } => message.clone(),
        }
    }

    /// Optional debug payload
    pub fn debug(&self) -> Option<Value> {
        match self {
            Self::DebugPowerOn { awake, remaining } | Self::DebugPowerOff { awake, remaining } => {
                Some(json!({ "awake": awake, "remaining": remaining }))
            }
            Self::Status { snapshot } => serde_json::to_value(snapshot).ok(),
            _ => None,
        }
    }
}
