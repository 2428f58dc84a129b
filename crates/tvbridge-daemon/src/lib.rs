//! # tvbridge-daemon - adb Process Management
//!
//! Runs the external `adb` executable with per-command deadlines, tracks every
//! child process so a shutdown can kill them, and turns adb/device output into
//! typed values.
//!
//! Depends on [`tvbridge_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Process Execution
//! - [`CommandRunner`] - Seam trait for bounded command execution
//! - [`ProcessRunner`] - Runner backed by `tokio::process`
//! - [`ProcessRegistry`] - In-flight processes keyed by request id
//! - [`CommandOutput`], [`CommandStatus`] - Normalized command results
//!
//! ### adb
//! - [`AdbBridge`] - Command lines for one endpoint (connect, devices, shell, ...)
//! - [`ToolAvailability`] - Locate the adb executable
//!
//! ### Output Interpretation
//! - [`classify()`] - Ordered rule table for connection outcomes
//! - [`probes`] - Device shell vocabulary and parsers (power, foreground app, playback)

pub mod adb;
pub mod classify;
pub mod probes;
pub mod registry;
pub mod runner;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;
pub mod tool_availability;

// Public API re-exports
pub use adb::AdbBridge;
pub use classify::{classify, classify_runner_failure, ConnectTranscript, CLASSIFICATION_RULES};
pub use probes::PlaybackOutputs;
pub use registry::{next_request_id, ProcessRegistry};
pub use runner::{CommandOutput, CommandRunner, CommandStatus, LocalCommandRunner, ProcessRunner};
pub use tool_availability::ToolAvailability;
