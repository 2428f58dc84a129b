//! Configuration types for tvbridge

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lowest accepted poll interval
pub const MIN_POLL_INTERVAL_MS: u64 = 1000;

/// Lowest accepted per-command deadline
pub const MIN_COMMAND_TIMEOUT_MS: u64 = 500;

/// Key code sent to toggle power when none is configured
pub const DEFAULT_POWER_KEYCODE: &str = "KEYCODE_POWER";

/// Session settings (tvbridge.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Device address, `host:port`
    #[serde(default)]
    pub endpoint: String,

    /// adb executable, or a directory containing it
    #[serde(default)]
    pub adb_path: Option<PathBuf>,

    #[serde(default)]
    pub polling: PollingSettings,

    #[serde(default)]
    pub power: PowerSettings,

    #[serde(default)]
    pub apps: AppSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Defaults for a given endpoint
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.polling.command_timeout_ms)
    }

    pub fn playback_delay_off(&self) -> Duration {
        Duration::from_millis(self.polling.playback_delay_off_ms)
    }

    pub fn power_step_delay(&self) -> Duration {
        Duration::from_millis(self.power.step_delay_ms)
    }
}

/// Poll cadence and deadlines
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingSettings {
    /// Time between poll ticks in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Deadline for each adb command in milliseconds
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// How long `playing=false` must persist before it is reported
    #[serde(default = "default_playback_delay_off_ms")]
    pub playback_delay_off_ms: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            playback_delay_off_ms: default_playback_delay_off_ms(),
        }
    }
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_command_timeout_ms() -> u64 {
    1000
}

fn default_playback_delay_off_ms() -> u64 {
    10_000
}

/// Power cycle and power-state detection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PowerSettings {
    /// Maximum key presses per power cycle
    #[serde(default = "default_power_retries")]
    pub retries: u32,

    /// Wait between a key press and the next state sample
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,

    #[serde(default = "default_power_keycode")]
    pub wake_keycode: String,

    #[serde(default = "default_power_keycode")]
    pub sleep_keycode: String,

    /// Shell command whose first `key=value` line reports the display state
    #[serde(default = "default_power_query")]
    pub query: String,

    /// Value of that line meaning "awake"
    #[serde(default = "default_awake_token")]
    pub awake_token: String,
}

impl Default for PowerSettings {
    fn default() -> Self {
        Self {
            retries: default_power_retries(),
            step_delay_ms: default_step_delay_ms(),
            wake_keycode: default_power_keycode(),
            sleep_keycode: default_power_keycode(),
            query: default_power_query(),
            awake_token: default_awake_token(),
        }
    }
}

fn default_power_retries() -> u32 {
    10
}

fn default_step_delay_ms() -> u64 {
    300
}

fn default_power_keycode() -> String {
    DEFAULT_POWER_KEYCODE.to_string()
}

fn default_power_query() -> String {
    tvbridge_daemon::probes::POWER_QUERY.to_string()
}

fn default_awake_token() -> String {
    tvbridge_daemon::probes::POWER_AWAKE_TOKEN.to_string()
}

/// Foreground app detection
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppSettings {
    /// Extra package id treated as the home screen
    #[serde(default)]
    pub custom_launcher: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Verbose logging and debug events
    #[serde(default)]
    pub debug: bool,
}
