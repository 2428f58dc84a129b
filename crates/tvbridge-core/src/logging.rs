//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable that overrides the log filter
pub const LOG_ENV: &str = "TVBRIDGE_LOG";

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/tvbridge/logs/`.
/// Log level is controlled by the `TVBRIDGE_LOG` environment variable;
/// `debug` raises the default filter when the variable is unset.
///
/// # Examples
/// ```bash
/// TVBRIDGE_LOG=debug tvbridge 192.168.1.20:5555
/// TVBRIDGE_LOG=tvbridge_daemon=trace tvbridge 192.168.1.20:5555
/// ```
pub fn init(debug: bool) -> Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "tvbridge.log");

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("tvbridge starting");
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

fn default_filter(debug: bool) -> &'static str {
    if debug {
        "tvbridge=debug,tvbridge_app=debug,tvbridge_daemon=debug,warn"
    } else {
        "tvbridge=info,tvbridge_app=info,tvbridge_daemon=info,warn"
    }
}

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("tvbridge").join("logs"))
}

/// Get the log file path for the current day
pub fn get_current_log_file() -> Result<PathBuf> {
    let dir = get_log_directory()?;
    Ok(dir.join("tvbridge.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_toggle_raises_filter() {
        assert!(default_filter(true).contains("tvbridge_app=debug"));
        assert!(default_filter(false).contains("tvbridge_app=info"));
    }

    #[test]
    fn test_log_file_lives_in_tvbridge_dir() {
        let path = get_current_log_file().unwrap();
        assert!(path.ends_with("tvbridge/logs/tvbridge.log"));
    }
}
