//! tvbridge - keep an adb session to a TV device and report its status
//!
//! This is the binary entry point. All logic lives in the library crates.

use std::path::PathBuf;

use clap::Parser;
use tvbridge_app::config::{load_settings, load_settings_from, Settings};

/// tvbridge - keep an adb session to a TV device and report its status
#[derive(Parser, Debug)]
#[command(name = "tvbridge")]
#[command(about = "Keep an adb session to a TV device and report its status", long_about = None)]
struct Args {
    /// Device endpoint (host:port); overrides the settings file
    #[arg(value_name = "ENDPOINT")]
    endpoint: Option<String>,

    /// Settings file (default: ./tvbridge.toml, then the user config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// adb executable, or the directory containing it
    #[arg(long, value_name = "PATH")]
    adb: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(long, value_name = "MS")]
    interval: Option<u64>,

    /// Per-command timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    /// CLI flags take precedence over file values
    fn apply(self, settings: &mut Settings) {
        if let Some(endpoint) = self.endpoint {
            settings.endpoint = endpoint;
        }
        if let Some(adb) = self.adb {
            settings.adb_path = Some(adb);
        }
        if let Some(interval) = self.interval {
            settings.polling.interval_ms = interval;
        }
        if let Some(timeout) = self.timeout {
            settings.polling.command_timeout_ms = timeout;
        }
        if self.debug {
            settings.logging.debug = true;
        }
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => load_settings_from(path)?,
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            load_settings(&cwd)
        }
    };
    args.apply(&mut settings);

    tvbridge_core::logging::init(settings.logging.debug)?;

    tvbridge::run_headless(settings).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let args = Args::parse_from([
            "tvbridge",
            "10.0.0.9:5555",
            "--interval",
            "2500",
            "--timeout",
            "750",
            "--debug",
        ]);
        let mut settings = Settings::for_endpoint("192.168.1.2:5555");
        args.apply(&mut settings);

        assert_eq!(settings.endpoint, "10.0.0.9:5555");
        assert_eq!(settings.polling.interval_ms, 2500);
        assert_eq!(settings.polling.command_timeout_ms, 750);
        assert!(settings.logging.debug);
        assert!(settings.adb_path.is_none());
    }

    #[test]
    fn test_missing_flags_keep_file_values() {
        let args = Args::parse_from(["tvbridge"]);
        let mut settings = Settings::for_endpoint("192.168.1.2:5555");
        settings.polling.interval_ms = 4000;
        args.apply(&mut settings);

        assert_eq!(settings.endpoint, "192.168.1.2:5555");
        assert_eq!(settings.polling.interval_ms, 4000);
        assert!(!settings.logging.debug);
    }
}
