//! tvbridge Library
//!
//! Runs one adb device session headlessly and reports its events as NDJSON.

pub mod headless;

// Re-export main entry points
pub use headless::runner::run_headless;
