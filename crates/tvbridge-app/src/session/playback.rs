//! Playback probe bookkeeping and debounce

use std::time::Duration;

use tokio::time::Instant;

use tvbridge_daemon::probes::{
    ALEXA_PROBE, AUDIO_MIXER_PROBE, BUTTON_SESSION_PROBE, PLAYBACK_STATE_PROBE, TAIL_SUFFIX,
};
use tvbridge_daemon::{CommandOutput, CommandStatus};

/// Unusable answers in a row before a never-usable probe is switched off
pub const PROBE_DISABLE_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackProbe {
    Alexa,
    ButtonSession,
    PlaybackState,
    AudioMixer,
}

impl PlaybackProbe {
    pub const ALL: [PlaybackProbe; 4] = [
        PlaybackProbe::Alexa,
        PlaybackProbe::ButtonSession,
        PlaybackProbe::PlaybackState,
        PlaybackProbe::AudioMixer,
    ];

    /// Device command for this probe
    pub fn command(&self, tail_supported: bool) -> String {
        match self {
            PlaybackProbe::Alexa => ALEXA_PROBE.to_string(),
            PlaybackProbe::ButtonSession => BUTTON_SESSION_PROBE.to_string(),
            PlaybackProbe::PlaybackState => PLAYBACK_STATE_PROBE.to_string(),
            PlaybackProbe::AudioMixer if tail_supported => {
                format!("{}{}", AUDIO_MIXER_PROBE, TAIL_SUFFIX)
            }
            PlaybackProbe::AudioMixer => AUDIO_MIXER_PROBE.to_string(),
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Text of a usable probe answer. A grep with no match counts as an empty answer.
pub fn usable_output(output: &CommandOutput) -> Option<String> {
    match output.status {
        CommandStatus::Success => Some(output.output.clone()),
        CommandStatus::Failed if output.output.trim().is_empty() => Some(String::new()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ProbeHealth {
    ever_usable: bool,
    consecutive_unusable: u32,
    disabled: bool,
}

impl ProbeHealth {
    fn record(&mut self, usable: bool) {
        if usable {
            self.ever_usable = true;
            self.consecutive_unusable = 0;
            return;
        }

        self.consecutive_unusable += 1;
        if !self.ever_usable && self.consecutive_unusable >= PROBE_DISABLE_THRESHOLD {
            self.disabled = true;
        }
    }
}

/// Health of every playback probe plus the device's `tail` support
#[derive(Debug, Clone, Default)]
pub struct ProbeSet {
    health: [ProbeHealth; 4],
    /// `None` until checked
    pub tail_supported: Option<bool>,
}

impl ProbeSet {
    pub fn is_enabled(&self, probe: PlaybackProbe) -> bool {
        !self.health[probe.index()].disabled
    }

    /// Record one answer. Returns true if this disabled the probe.
    pub fn record(&mut self, probe: PlaybackProbe, usable: bool) -> bool {
        let health = &mut self.health[probe.index()];
        let was_disabled = health.disabled;
        health.record(usable);
        !was_disabled && health.disabled
    }
}

/// Debounced playing flag.
///
/// `true` is taken at once and refreshes the last-seen-playing time; `false`
/// only once `delay_off` has passed since then.
#[derive(Debug, Clone)]
pub struct PlaybackDebounce {
    delay_off: Duration,
    playing: bool,
    last_playing_at: Option<Instant>,
    reported: bool,
}

impl PlaybackDebounce {
    pub fn new(delay_off: Duration) -> Self {
        Self {
            delay_off,
            playing: false,
            last_playing_at: None,
            reported: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Feed one observation. Returns the value to publish, if any.
    pub fn observe(&mut self, observed: bool, now: Instant) -> Option<bool> {
        let accepted = if observed {
            self.last_playing_at = Some(now);
            true
        } else if !self.playing {
            false
        } else {
            self.last_playing_at
                .is_some_and(|at| now.duration_since(at) < self.delay_off)
        };

        self.settle(accepted)
    }

    /// Device went to sleep: stop immediately. Returns `Some(false)` if that is news.
    pub fn clear(&mut self) -> Option<bool> {
        self.last_playing_at = None;
        self.settle(false)
    }

    /// Disconnected: stop without publishing
    pub fn reset(&mut self) {
        self.playing = false;
        self.last_playing_at = None;
    }

    fn settle(&mut self, value: bool) -> Option<bool> {
        let changed = value != self.playing;
        let first = !self.reported;
        self.playing = value;
        if changed || first {
            self.reported = true;
            Some(value)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY_OFF: Duration = Duration::from_millis(10_000);

    #[test]
    fn test_audio_probe_uses_tail_when_supported() {
        assert!(PlaybackProbe::AudioMixer.command(true).ends_with("| tail -1"));
        assert!(!PlaybackProbe::AudioMixer.command(false).contains("tail"));
        assert!(!PlaybackProbe::Alexa.command(true).contains("tail"));
    }

    #[test]
    fn test_usable_output() {
        assert_eq!(
            usable_output(&CommandOutput::success("state=3")),
            Some("state=3".to_string())
        );
        assert_eq!(usable_output(&CommandOutput::failed("")), Some(String::new()));
        assert_eq!(usable_output(&CommandOutput::failed("Can't find service")), None);
        assert_eq!(usable_output(&CommandOutput::timed_out()), None);
    }

    #[test]
    fn test_probe_disabled_after_threshold_if_never_usable() {
        let mut probes = ProbeSet::default();
        assert!(!probes.record(PlaybackProbe::Alexa, false));
        assert!(!probes.record(PlaybackProbe::Alexa, false));
        assert!(probes.record(PlaybackProbe::Alexa, false));
        assert!(!probes.is_enabled(PlaybackProbe::Alexa));
        assert!(probes.is_enabled(PlaybackProbe::AudioMixer));
    }

    #[test]
    fn test_probe_that_once_worked_stays_enabled() {
        let mut probes = ProbeSet::default();
        probes.record(PlaybackProbe::PlaybackState, true);
        for _ in 0..10 {
            probes.record(PlaybackProbe::PlaybackState, false);
        }
        assert!(probes.is_enabled(PlaybackProbe::PlaybackState));
    }

    #[test]
    fn test_first_observation_always_reported() {
        let mut debounce = PlaybackDebounce::new(DELAY_OFF);
        assert_eq!(debounce.observe(false, Instant::now()), Some(false));
        assert_eq!(debounce.observe(false, Instant::now()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_false_held_until_delay_elapses() {
        let mut debounce = PlaybackDebounce::new(DELAY_OFF);
        let start = Instant::now();

        assert_eq!(debounce.observe(true, start), Some(true));

        // Stopped at t=0, still stopped at t=5000
        assert_eq!(debounce.observe(false, start), None);
        assert_eq!(debounce.observe(false, start + Duration::from_millis(5_000)), None);
        assert!(debounce.is_playing());

        // Persisting past the delay publishes exactly once
        assert_eq!(
            debounce.observe(false, start + Duration::from_millis(10_001)),
            Some(false)
        );
        assert_eq!(
            debounce.observe(false, start + Duration::from_millis(12_000)),
            None
        );
    }

    #[test]
    fn test_true_refreshes_hold() {
        let mut debounce = PlaybackDebounce::new(DELAY_OFF);
        let start = Instant::now();
        debounce.observe(true, start);
        debounce.observe(true, start + Duration::from_millis(8_000));

        assert_eq!(
            debounce.observe(false, start + Duration::from_millis(12_000)),
            None
        );
    }

    #[test]
    fn test_clear_reports_only_when_playing() {
        let mut debounce = PlaybackDebounce::new(DELAY_OFF);
        debounce.observe(true, Instant::now());
        assert_eq!(debounce.clear(), Some(false));
        assert_eq!(debounce.clear(), None);
    }
}
