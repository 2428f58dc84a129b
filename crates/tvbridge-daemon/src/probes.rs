//! Device shell vocabulary and output parsing
//!
//! Diagnostic dumps are treated as opaque text: lines are picked out by fixed
//! markers and matched by substring or prefix, never structurally parsed.

use std::sync::LazyLock;

use regex::Regex;

use tvbridge_core::prelude::*;
use tvbridge_core::{AppIdentity, DeviceInfo};

// ─────────────────────────────────────────────────────────────────
// Command vocabulary
// ─────────────────────────────────────────────────────────────────

/// Default power/display diagnostic query
pub const POWER_QUERY: &str = "dumpsys power | grep mHoldingDisplay";

/// Value of the power query that means the display is on
pub const POWER_AWAKE_TOKEN: &str = "true";

/// Foreground app via window-manager focus
pub const WINDOWS_FOCUS_QUERY: &str = "dumpsys window windows | grep -E mFocusedApp";

/// Foreground app via activity-manager resumed activity
pub const RESUMED_ACTIVITY_QUERY: &str = "dumpsys activity activities | grep ResumedActivity";

pub const ALEXA_PROBE: &str = "dumpsys media_session | grep AlexaMediaPlayerRuntime";
pub const BUTTON_SESSION_PROBE: &str = "dumpsys media_session | grep 'Media button session is'";
pub const PLAYBACK_STATE_PROBE: &str =
    "dumpsys media_session | grep -e 'state=PlaybackState' -e 'state=resultState'";
pub const AUDIO_MIXER_PROBE: &str = "dumpsys audio | grep 'player piid:' | grep ' state:'";

/// Appended to the audio probe when the device's `tail` works
pub const TAIL_SUFFIX: &str = " | tail -1";

/// Checks whether `tail` exists on the device
pub const TAIL_CHECK: &str = "tail --help";

pub const DEVICE_INFO_QUERY: &str =
    "getprop ro.product.model && getprop ro.product.manufacturer && getprop ro.serialno";

/// Marker in the playback-state probe for an actively playing session
pub const PLAYING_STATE_MARKER: &str = "state=3";

/// Marker in the audio-mixer probe for a started player
pub const AUDIO_STARTED_MARKER: &str = "state:started";

/// Marker in the Alexa probe output
pub const ALEXA_MARKER: &str = "AlexaMediaPlayerRuntime";

/// Substrings of a focused component that mean "home screen"
pub const LAUNCHER_SIGNATURES: &[&str] = &["launcher", "mainactivity", "recentstvactivity"];

/// Prefix of named Android key codes
pub const KEYCODE_PREFIX: &str = "KEYCODE_";

static KEY_VALUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_.\-]+)\s*=\s*(\S*)").expect("Invalid key=value regex")
});

// ─────────────────────────────────────────────────────────────────
// Power
// ─────────────────────────────────────────────────────────────────

/// Parse the power query output into an awake flag.
///
/// The first `key=value` line decides; output without one is a parse failure.
pub fn parse_power_state(output: &str, awake_token: &str) -> Result<bool> {
    output
        .lines()
        .find_map(|line| KEY_VALUE_PATTERN.captures(line))
        .and_then(|caps| caps.get(2))
        .map(|value| value.as_str() == awake_token)
        .ok_or_else(|| Error::parse(format!("no key=value line in power output: {:?}", output)))
}

// ─────────────────────────────────────────────────────────────────
// Foreground app
// ─────────────────────────────────────────────────────────────────

/// Extract the package/component from a focus dump.
///
/// Takes the first non-empty line, the text before its first `/`, and the last
/// whitespace-delimited token of that text.
pub fn extract_app_identifier(output: &str) -> Option<String> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (before_slash, _) = line.split_once('/').unwrap_or((line, ""));
    before_slash
        .split_whitespace()
        .last()
        .map(|token| token.trim_start_matches('{').to_string())
        .filter(|token| !token.is_empty())
}

/// Whether an identifier looks like a launcher / home activity
pub fn is_launcher(identifier: &str, custom_launcher: Option<&str>) -> bool {
    let lower = identifier.to_lowercase();
    LAUNCHER_SIGNATURES.iter().any(|sig| lower.contains(sig))
        || custom_launcher
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .is_some_and(|custom| lower.contains(&custom.to_lowercase()))
}

/// Resolve a focus dump into an [`AppIdentity`]
pub fn resolve_app_identity(output: &str, custom_launcher: Option<&str>) -> AppIdentity {
    if output.trim().is_empty() {
        return AppIdentity::Home;
    }

    match extract_app_identifier(output) {
        Some(id) if is_launcher(&id, custom_launcher) => AppIdentity::Home,
        Some(id) => AppIdentity::Package(id),
        None => AppIdentity::Other,
    }
}

// ─────────────────────────────────────────────────────────────────
// Playback
// ─────────────────────────────────────────────────────────────────

/// Outputs of the playback probes for one cycle. `None` = probe disabled or unusable.
#[derive(Debug, Clone, Default)]
pub struct PlaybackOutputs {
    pub alexa: Option<String>,
    pub button_session: Option<String>,
    pub playback_state: Option<String>,
    pub audio_mixer: Option<String>,
}

/// Last non-empty line of some output
pub fn last_non_empty_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).rev().find(|l| !l.is_empty())
}

/// Decide whether media is playing.
///
/// `(home || button session names the app || Alexa) && state=3`, or the
/// audio mixer's last player line reports `state:started`.
pub fn evaluate_playback(outputs: &PlaybackOutputs, app: Option<&AppIdentity>) -> bool {
    let alexa = outputs
        .alexa
        .as_deref()
        .is_some_and(|o| o.contains(ALEXA_MARKER));

    let owns_button_session = match (app, outputs.button_session.as_deref()) {
        (Some(AppIdentity::Package(id)), Some(out)) => out.contains(id.as_str()),
        _ => false,
    };

    let is_home = app.is_some_and(AppIdentity::is_home);

    let session_active = outputs
        .playback_state
        .as_deref()
        .is_some_and(|o| o.contains(PLAYING_STATE_MARKER));

    let audio_started = outputs
        .audio_mixer
        .as_deref()
        .and_then(last_non_empty_line)
        .is_some_and(|line| line.contains(AUDIO_STARTED_MARKER));

    ((is_home || owns_button_session || alexa) && session_active) || audio_started
}

// ─────────────────────────────────────────────────────────────────
// Input / launch
// ─────────────────────────────────────────────────────────────────

/// Whether a token is an input-event code (`KEYCODE_HOME`, `3`, ...)
pub fn is_keycode(token: &str) -> bool {
    let upper = token.to_uppercase();
    (upper.starts_with(KEYCODE_PREFIX) && upper.len() > KEYCODE_PREFIX.len())
        || (!token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
}

pub fn keyevent_command(code: &str) -> String {
    format!("input keyevent {}", code)
}

pub fn monkey_command(package: &str) -> String {
    format!("monkey -p {} 1", package)
}

/// Whether monkey refused to launch the package
pub fn monkey_aborted(output: &str) -> bool {
    output.to_lowercase().contains("monkey aborted")
}

// ─────────────────────────────────────────────────────────────────
// Device info
// ─────────────────────────────────────────────────────────────────

/// Parse the three `getprop` lines (model, manufacturer, serial)
pub fn parse_device_info(output: &str) -> DeviceInfo {
    let mut lines = output.lines().map(|l| l.trim().to_string());
    DeviceInfo {
        model: lines.next().unwrap_or_default(),
        manufacturer: lines.next().unwrap_or_default(),
        serial: lines.next().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_power_awake() {
        let out = "  mHoldingDisplaySuspendBlocker=true";
        assert!(parse_power_state(out, POWER_AWAKE_TOKEN).unwrap());
    }

    #[test]
    fn test_parse_power_asleep() {
        let out = "mHoldingDisplaySuspendBlocker=false\n";
        assert!(!parse_power_state(out, POWER_AWAKE_TOKEN).unwrap());
    }

    #[test]
    fn test_parse_power_custom_token() {
        let out = "Display Power: state=ON";
        assert!(parse_power_state("mWakefulness=Awake", "Awake").unwrap());
        assert!(parse_power_state(out, "ON").is_err());
    }

    #[test]
    fn test_parse_power_rejects_garbage() {
        let err = parse_power_state("Can't find service: power", POWER_AWAKE_TOKEN).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(parse_power_state("", POWER_AWAKE_TOKEN).is_err());
    }

    #[test]
    fn test_launcher_normalizes_to_home() {
        assert_eq!(
            resolve_app_identity("com.android.tv.launcher/.MainActivity", None),
            AppIdentity::Home
        );
    }

    #[test]
    fn test_package_without_launcher_signature() {
        assert_eq!(
            resolve_app_identity("com.google.android.youtube.tv/.MainActivity", None),
            AppIdentity::Package("com.google.android.youtube.tv".to_string())
        );
    }

    #[test]
    fn test_focused_app_dump_line() {
        let out = "  mFocusedApp=AppWindowToken{8d3a1c6 token=Token{52e8f21 ActivityRecord{f3bb588 u0 com.netflix.ninja/.MainActivity t112}}}";
        assert_eq!(
            resolve_app_identity(out, None),
            AppIdentity::Package("com.netflix.ninja".to_string())
        );
    }

    #[test]
    fn test_resumed_activity_multi_line() {
        let out = "    mResumedActivity: ActivityRecord{2f4a u0 com.plexapp.android/com.plexapp.plex.activities.SplashActivity t53}\n  ResumedActivity: ActivityRecord{2f4a u0 com.plexapp.android/.Other t53}";
        assert_eq!(
            resolve_app_identity(out, None),
            AppIdentity::Package("com.plexapp.android".to_string())
        );
    }

    #[test]
    fn test_custom_launcher() {
        let out = "ActivityRecord{1 u0 com.nvidia.shield.home/.Root t1}";
        assert_eq!(
            resolve_app_identity(out, Some("com.nvidia.shield.home")),
            AppIdentity::Home
        );
        assert_eq!(
            resolve_app_identity(out, None),
            AppIdentity::Package("com.nvidia.shield.home".to_string())
        );
    }

    #[test]
    fn test_empty_output_is_home() {
        assert_eq!(resolve_app_identity("  \n", None), AppIdentity::Home);
    }

    #[test]
    fn test_recents_is_home() {
        let out = "ActivityRecord{1 u0 com.android.systemui/.recents.RecentsTvActivity t1}";
        // "recentstvactivity" sits after the slash, so only the package is checked
        assert_eq!(
            resolve_app_identity(out, None),
            AppIdentity::Package("com.android.systemui".to_string())
        );
        assert!(is_launcher("com.example.RecentsTvActivity", None));
    }

    #[test]
    fn test_playback_home_with_active_session() {
        let outputs = PlaybackOutputs {
            playback_state: Some("state=PlaybackState {state=3, position=1200}".into()),
            ..Default::default()
        };
        assert!(evaluate_playback(&outputs, Some(&AppIdentity::Home)));
    }

    #[test]
    fn test_playback_requires_session_owner() {
        let outputs = PlaybackOutputs {
            button_session: Some("Media button session is com.spotify.tv.android/...".into()),
            playback_state: Some("state=PlaybackState {state=3}".into()),
            ..Default::default()
        };
        let youtube = AppIdentity::Package("com.google.android.youtube.tv".into());
        let spotify = AppIdentity::Package("com.spotify.tv.android".into());

        assert!(!evaluate_playback(&outputs, Some(&youtube)));
        assert!(evaluate_playback(&outputs, Some(&spotify)));
    }

    #[test]
    fn test_playback_paused_state() {
        let outputs = PlaybackOutputs {
            alexa: Some("AlexaMediaPlayerRuntime".into()),
            playback_state: Some("state=PlaybackState {state=2}".into()),
            ..Default::default()
        };
        assert!(!evaluate_playback(&outputs, None));
    }

    #[test]
    fn test_playback_audio_mixer_last_line() {
        let outputs = PlaybackOutputs {
            audio_mixer: Some(
                "  AudioPlaybackConfiguration piid:15 state:started\n  AudioPlaybackConfiguration piid:23 state:paused\n"
                    .into(),
            ),
            ..Default::default()
        };
        assert!(!evaluate_playback(&outputs, None));

        let outputs = PlaybackOutputs {
            audio_mixer: Some("player piid:23 state:started".into()),
            ..Default::default()
        };
        assert!(evaluate_playback(&outputs, None));
    }

    #[test]
    fn test_is_keycode() {
        assert!(is_keycode("KEYCODE_HOME"));
        assert!(is_keycode("keycode_media_play_pause"));
        assert!(is_keycode("26"));
        assert!(!is_keycode("KEYCODE_"));
        assert!(!is_keycode("com.netflix.ninja"));
        assert!(!is_keycode(""));
    }

    #[test]
    fn test_monkey_aborted() {
        assert!(monkey_aborted("** No activities found to run, monkey aborted."));
        assert!(!monkey_aborted("Events injected: 1"));
    }

    #[test]
    fn test_parse_device_info() {
        let info = parse_device_info("SHIELD Android TV\nNVIDIA\n1323419012345\n");
        assert_eq!(info.model, "SHIELD Android TV");
        assert_eq!(info.manufacturer, "NVIDIA");
        assert_eq!(info.serial, "1323419012345");

        let partial = parse_device_info("Chromecast");
        assert_eq!(partial.manufacturer, "");
    }
}
