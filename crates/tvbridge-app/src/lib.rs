//! tvbridge-app - Session orchestration for tvbridge
//!
//! This crate owns the per-device [`Session`] (connection management, status
//! polling, power cycling and action dispatch), the [`Engine`] that drives its
//! poll loop, configuration loading, and the event bus subscribers listen on.

pub mod config;
pub mod emitter;
pub mod engine;
pub mod session;
pub mod signals;

// Re-export primary types
pub use config::Settings;
pub use emitter::EventBus;
pub use engine::Engine;
pub use session::Session;

// Re-export daemon types for front ends
pub use tvbridge_daemon::{CommandRunner, ProcessRunner, ToolAvailability};
