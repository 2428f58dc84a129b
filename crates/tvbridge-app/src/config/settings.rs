//! Settings loading and validation

use std::path::{Path, PathBuf};

use super::types::{Settings, MIN_COMMAND_TIMEOUT_MS, MIN_POLL_INTERVAL_MS};
use tvbridge_core::prelude::*;

/// Settings file looked up in the working directory
pub const LOCAL_CONFIG_FILENAME: &str = "tvbridge.toml";

const CONFIG_DIR: &str = "tvbridge";
const CONFIG_FILENAME: &str = "config.toml";

/// Candidate settings files, in lookup order
pub fn default_config_paths(working_dir: &Path) -> Vec<PathBuf> {
    let mut paths = vec![working_dir.join(LOCAL_CONFIG_FILENAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(CONFIG_DIR).join(CONFIG_FILENAME));
    }
    paths
}

/// Load settings from an explicit file. A missing or malformed file is an error.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let settings = toml::from_str(&content)
        .map_err(|e| Error::config_invalid(format!("{}: {}", path.display(), e)))?;
    debug!("Loaded settings from {:?}", path);
    Ok(settings)
}

/// Load settings from the first default location that exists.
///
/// Unreadable or invalid files are logged and replaced by defaults.
pub fn load_settings(working_dir: &Path) -> Settings {
    let Some(config_path) = default_config_paths(working_dir)
        .into_iter()
        .find(|p| p.exists())
    else {
        debug!("No config file found, using defaults");
        return Settings::default();
    };

    match load_settings_from(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Failed to load {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

impl Settings {
    /// Apply floors and reject settings a session cannot run with
    pub fn validate(&mut self) -> Result<()> {
        self.endpoint = self.endpoint.trim().to_string();
        if self.endpoint.is_empty() {
            return Err(Error::config_invalid("endpoint must not be empty"));
        }

        if self.polling.interval_ms < MIN_POLL_INTERVAL_MS {
            warn!(
                "Poll interval {}ms below minimum, using {}ms",
                self.polling.interval_ms, MIN_POLL_INTERVAL_MS
            );
            self.polling.interval_ms = MIN_POLL_INTERVAL_MS;
        }

        if self.polling.command_timeout_ms < MIN_COMMAND_TIMEOUT_MS {
            warn!(
                "Command timeout {}ms below minimum, using {}ms",
                self.polling.command_timeout_ms, MIN_COMMAND_TIMEOUT_MS
            );
            self.polling.command_timeout_ms = MIN_COMMAND_TIMEOUT_MS;
        }

        if self.power.retries == 0 {
            return Err(Error::config_invalid("power.retries must be at least 1"));
        }

        if self.power.query.trim().is_empty() {
            return Err(Error::config_invalid("power.query must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_POWER_KEYCODE;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.polling.interval_ms, 1000);
        assert_eq!(settings.polling.command_timeout_ms, 1000);
        assert_eq!(settings.polling.playback_delay_off_ms, 10_000);
        assert_eq!(settings.power.retries, 10);
        assert_eq!(settings.power.step_delay_ms, 300);
        assert_eq!(settings.power.wake_keycode, DEFAULT_POWER_KEYCODE);
        assert_eq!(settings.power.awake_token, "true");
        assert!(settings.apps.custom_launcher.is_none());
    }

    #[test]
    fn test_load_settings_from_missing_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(LOCAL_CONFIG_FILENAME);
        let err = load_settings_from(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_settings_custom() {
        let temp = tempdir().unwrap();
        let config = r#"
endpoint = "192.168.1.108:5555"

[polling]
interval_ms = 2500

[power]
retries = 4
wake_keycode = "KEYCODE_WAKEUP"

[apps]
custom_launcher = "com.nvidia.shield.home"
"#;
        std::fs::write(temp.path().join(LOCAL_CONFIG_FILENAME), config).unwrap();

        let settings = load_settings(temp.path());

        assert_eq!(settings.endpoint, "192.168.1.108:5555");
        assert_eq!(settings.polling.interval_ms, 2500);
        assert_eq!(settings.polling.command_timeout_ms, 1000);
        assert_eq!(settings.power.retries, 4);
        assert_eq!(settings.power.wake_keycode, "KEYCODE_WAKEUP");
        assert_eq!(settings.power.sleep_keycode, DEFAULT_POWER_KEYCODE);
        assert_eq!(
            settings.apps.custom_launcher.as_deref(),
            Some("com.nvidia.shield.home")
        );
    }

    #[test]
    fn test_load_settings_invalid_toml() {
        let temp = tempdir().unwrap();
        let path = temp.path().join(LOCAL_CONFIG_FILENAME);
        std::fs::write(&path, "not valid toml {{{{").unwrap();

        let err = load_settings_from(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_validate_applies_floors() {
        let mut settings = Settings::for_endpoint(" 10.0.0.2:5555 ");
        settings.polling.interval_ms = 100;
        settings.polling.command_timeout_ms = 50;

        settings.validate().unwrap();

        assert_eq!(settings.endpoint, "10.0.0.2:5555");
        assert_eq!(settings.polling.interval_ms, MIN_POLL_INTERVAL_MS);
        assert_eq!(settings.polling.command_timeout_ms, MIN_COMMAND_TIMEOUT_MS);
    }

    #[test]
    fn test_validate_rejects_empty_endpoint() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut settings = Settings::for_endpoint("10.0.0.2:5555");
        settings.power.retries = 0;
        assert!(settings.validate().is_err());
    }
}
