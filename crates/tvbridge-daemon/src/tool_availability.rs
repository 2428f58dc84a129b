//! Locating the adb executable
//!
//! Resolution order: configured path (a file, or a directory containing adb),
//! `PATH`, `$ANDROID_HOME/platform-tools`, `$ANDROID_SDK_ROOT/platform-tools`.

use std::path::{Path, PathBuf};

/// File name of the adb executable on this platform
#[cfg(windows)]
pub const ADB_BINARY: &str = "adb.exe";
#[cfg(not(windows))]
pub const ADB_BINARY: &str = "adb";

/// Cached result of looking for adb (run once at startup)
#[derive(Debug, Clone, Default)]
pub struct ToolAvailability {
    /// Absolute path to adb if found
    pub adb_path: Option<PathBuf>,
}

impl ToolAvailability {
    /// Look for adb, honouring an optional configured path
    pub fn resolve(configured: Option<&Path>) -> Self {
        let adb_path = Self::candidate_paths(configured)
            .into_iter()
            .find_map(|candidate| {
                which::which(&candidate)
                    .inspect_err(|e| {
                        tracing::debug!("adb not usable at {}: {}", candidate.display(), e)
                    })
                    .ok()
            });

        match &adb_path {
            Some(path) => tracing::info!("Using adb at {}", path.display()),
            None => tracing::warn!("adb executable not found"),
        }

        Self { adb_path }
    }

    /// Get list of paths to try for the adb command
    fn candidate_paths(configured: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(path) = configured {
            if path.is_dir() {
                paths.push(path.join(ADB_BINARY));
            } else {
                paths.push(path.to_path_buf());
            }
        }

        paths.push(PathBuf::from(ADB_BINARY));

        // Check ANDROID_HOME/platform-tools/adb
        if let Ok(android_home) = std::env::var("ANDROID_HOME") {
            paths.push(
                PathBuf::from(android_home)
                    .join("platform-tools")
                    .join(ADB_BINARY),
            );
        }

        // Check ANDROID_SDK_ROOT/platform-tools/adb
        if let Ok(sdk_root) = std::env::var("ANDROID_SDK_ROOT") {
            paths.push(PathBuf::from(sdk_root).join("platform-tools").join(ADB_BINARY));
        }

        paths
    }

    pub fn is_available(&self) -> bool {
        self.adb_path.is_some()
    }

    /// Program name to spawn; falls back to a bare `adb` so the runner reports NotFound
    pub fn adb_program(&self) -> String {
        self.adb_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| ADB_BINARY.to_string())
    }

    /// Get user-friendly message for a missing adb
    pub fn unavailable_message(&self) -> Option<&'static str> {
        if self.is_available() {
            None
        } else {
            Some("adb not found. Install Android platform-tools or set ANDROID_HOME.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_tool_availability_default() {
        let availability = ToolAvailability::default();
        assert!(!availability.is_available());
        assert_eq!(availability.adb_program(), ADB_BINARY);
        assert!(availability.unavailable_message().is_some());
    }

    #[test]
    fn test_available_no_message() {
        let availability = ToolAvailability {
            adb_path: Some(PathBuf::from("/opt/platform-tools/adb")),
        };
        assert!(availability.unavailable_message().is_none());
        assert_eq!(availability.adb_program(), "/opt/platform-tools/adb");
    }

    #[test]
    #[serial]
    fn test_paths_include_android_home() {
        std::env::set_var("ANDROID_HOME", "/test/android");
        let paths = ToolAvailability::candidate_paths(None);
        assert!(paths
            .iter()
            .any(|p| p.starts_with("/test/android/platform-tools")));
        std::env::remove_var("ANDROID_HOME");
    }

    #[test]
    #[serial]
    fn test_paths_include_sdk_root() {
        std::env::set_var("ANDROID_SDK_ROOT", "/test/sdk");
        let paths = ToolAvailability::candidate_paths(None);
        assert!(paths.iter().any(|p| p.starts_with("/test/sdk")));
        std::env::remove_var("ANDROID_SDK_ROOT");
    }

    #[test]
    fn test_configured_directory_gets_binary_appended() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ToolAvailability::candidate_paths(Some(dir.path()));
        assert_eq!(paths[0], dir.path().join(ADB_BINARY));
    }

    #[test]
    fn test_configured_file_is_used_verbatim() {
        let paths = ToolAvailability::candidate_paths(Some(Path::new("/usr/local/bin/adb")));
        assert_eq!(paths[0], PathBuf::from("/usr/local/bin/adb"));
        assert_eq!(paths[1], PathBuf::from(ADB_BINARY));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_finds_executable_in_configured_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let adb = dir.path().join(ADB_BINARY);
        std::fs::write(&adb, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&adb, std::fs::Permissions::from_mode(0o755)).unwrap();

        let availability = ToolAvailability::resolve(Some(dir.path()));
        let found = availability.adb_path.expect("adb should resolve");
        assert_eq!(found.file_name(), adb.file_name());
    }
}
