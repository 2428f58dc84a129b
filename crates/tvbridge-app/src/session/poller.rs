//! Status polling: power state, foreground app, media playback

use tokio::time::Instant;

use tvbridge_core::prelude::*;
use tvbridge_core::{AppIdentity, FailureReason, SessionEvent};
use tvbridge_daemon::probes::{self, PlaybackOutputs, TAIL_CHECK};
use tvbridge_daemon::{CommandOutput, CommandRunner, CommandStatus};

use super::playback::{usable_output, PlaybackProbe};
use super::Session;

/// How a power sample publishes what it saw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    /// On change or first sample, unless a power cycle is running
    OnChange,
    /// Always
    Forced,
    /// Never; only the cache is updated
    Silent,
}

impl<R: CommandRunner + Sync> Session<R> {
    /// One poll cycle.
    ///
    /// The first cycle against a connected device runs each query in order to
    /// build a consistent baseline; later cycles run them concurrently.
    /// Returns `Err` only for conditions polling cannot recover from.
    pub async fn poll(&self) -> Result<()> {
        let first = !self.is_initialized();

        let connection = self.connect().await;
        if !connection.succeeded {
            self.publish_status();
            return match connection.reason {
                Some(FailureReason::ToolUnavailable) => {
                    Err(Error::tool_not_found(self.adb.program()))
                }
                _ => Ok(()),
            };
        }

        if first {
            let _ = self.refresh_power(Emission::OnChange).await;
            self.refresh_app(false).await;
            self.refresh_playback(false).await;

            self.with_state(|s| s.initialized = true);
            info!("{}: initial poll cycle complete", self.endpoint());
            self.events.emit(SessionEvent::FirstRun);
        } else {
            let _ = tokio::join!(
                self.refresh_power(Emission::OnChange),
                self.refresh_app(false),
                self.refresh_playback(false),
            );
        }

        self.publish_status();
        Ok(())
    }

    fn publish_status(&self) {
        self.events.emit(SessionEvent::Status {
            snapshot: self.snapshot(),
        });
    }

    // ─────────────────────────────────────────────────────────
    // Power
    // ─────────────────────────────────────────────────────────

    /// Query the display state. On failure the cached value is left as is,
    /// but is still published once if nothing has been reported yet.
    pub async fn refresh_power(
        &self,
        emission: Emission,
    ) -> std::result::Result<bool, FailureReason> {
        if let Some(reason) = self.connection_state().failure_reason() {
            return Err(reason);
        }

        let output = self.adb.shell(&self.settings.power.query).await;
        let parsed = if output.succeeded() {
            probes::parse_power_state(&output.output, &self.settings.power.awake_token)
        } else {
            Err(Error::parse(output.output.clone()))
        };

        let cycling = self.is_power_cycling();
        let awake = match parsed {
            Ok(awake) => awake,
            Err(e) => {
                debug!("Power query failed: {}", e);
                self.with_state(|s| {
                    s.power_sample_ok = false;
                    if emission != Emission::Silent && !s.awake_reported && !cycling {
                        s.awake_reported = true;
                        self.events.emit(if s.awake {
                            SessionEvent::Awake
                        } else {
                            SessionEvent::Sleep
                        });
                    }
                });
                return Err(match output.status {
                    CommandStatus::TimedOut => FailureReason::TimedOut,
                    _ => FailureReason::ParseFailure,
                });
            }
        };

        self.with_state(|s| {
            let changed = s.awake != awake || !s.awake_reported;
            s.awake = awake;
            s.power_sample_ok = true;

            if emission == Emission::Silent {
                return;
            }

            let publish = match emission {
                Emission::Forced => true,
                _ => changed && !cycling,
            };
            if publish {
                s.awake_reported = true;
                self.events.emit(if awake {
                    SessionEvent::Awake
                } else {
                    SessionEvent::Sleep
                });
            }

            if !awake {
                s.app = None;
                if let Some(playing) = s.playback.clear() {
                    self.events.emit(SessionEvent::Playback { playing });
                }
            }
        });

        Ok(awake)
    }

    // ─────────────────────────────────────────────────────────
    // Foreground app
    // ─────────────────────────────────────────────────────────

    /// Detect the foreground app. `force` publishes even without a change.
    pub async fn refresh_app(&self, force: bool) -> Option<AppIdentity> {
        if !self.is_connected() {
            return None;
        }

        if !self.is_awake() {
            self.with_state(|s| {
                s.app = None;
                if force || !s.app_reported {
                    s.app_reported = true;
                    self.events.emit(SessionEvent::AppChange { app: None });
                }
            });
            return None;
        }

        let mut strategy = self.with_state(|s| s.strategy);
        let mut answer: Option<CommandOutput> = None;

        for query in strategy.queries() {
            let output = self.adb.shell(query.command()).await;
            if output.succeeded() {
                strategy = strategy.on_success(*query);
                answer = Some(output);
                break;
            }
            debug!("App query {:?} failed: {}", query, output.output);
        }

        let Some(output) = answer else {
            warn!("{}: no app detection query succeeded", self.endpoint());
            return self.with_state(|s| {
                s.strategy = strategy.on_exhausted();
                // Undetermined still counts as the first report
                if force || !s.app_reported {
                    s.app_reported = true;
                    self.events.emit(SessionEvent::AppChange { app: s.app.clone() });
                }
                s.app.clone()
            });
        };

        let identity = probes::resolve_app_identity(
            &output.output,
            self.settings.apps.custom_launcher.as_deref(),
        );

        self.with_state(|s| {
            s.strategy = strategy;
            let changed = s.app.as_ref() != Some(&identity);
            s.app = Some(identity.clone());
            if changed || force || !s.app_reported {
                s.app_reported = true;
                self.events.emit(SessionEvent::AppChange {
                    app: Some(identity.clone()),
                });
            }
        });

        Some(identity)
    }

    // ─────────────────────────────────────────────────────────
    // Playback
    // ─────────────────────────────────────────────────────────

    /// Run the playback probes and feed the debounce. Returns the debounced flag.
    pub async fn refresh_playback(&self, force: bool) -> bool {
        if !self.is_connected() {
            return false;
        }

        if !self.is_awake() {
            return self.with_state(|s| {
                let published = s.playback.clear();
                if let Some(playing) = published.or(force.then_some(false)) {
                    self.events.emit(SessionEvent::Playback { playing });
                }
                false
            });
        }

        let tail_supported = self.tail_supported().await;

        let (alexa, button_session, playback_state, audio_mixer) = tokio::join!(
            self.run_probe(PlaybackProbe::Alexa, tail_supported),
            self.run_probe(PlaybackProbe::ButtonSession, tail_supported),
            self.run_probe(PlaybackProbe::PlaybackState, tail_supported),
            self.run_probe(PlaybackProbe::AudioMixer, tail_supported),
        );
        let outputs = PlaybackOutputs {
            alexa,
            button_session,
            playback_state,
            audio_mixer,
        };

        let now = Instant::now();
        self.with_state(|s| {
            let observed = probes::evaluate_playback(&outputs, s.app.as_ref());
            let published = s.playback.observe(observed, now);
            let playing = s.playback.is_playing();
            if let Some(value) = published.or(force.then_some(playing)) {
                self.events.emit(SessionEvent::Playback { playing: value });
            }
            playing
        })
    }

    /// Whether the device's `tail` works; checked once
    async fn tail_supported(&self) -> bool {
        if let Some(known) = self.with_state(|s| s.probes.tail_supported) {
            return known;
        }

        let output = self.adb.shell(TAIL_CHECK).await;
        if output.is_timeout() {
            return false;
        }

        let supported = output.succeeded();
        debug!("{}: tail supported = {}", self.endpoint(), supported);
        self.with_state(|s| s.probes.tail_supported = Some(supported));
        supported
    }

    async fn run_probe(&self, probe: PlaybackProbe, tail_supported: bool) -> Option<String> {
        if !self.with_state(|s| s.probes.is_enabled(probe)) {
            return None;
        }

        let output = self.adb.shell(&probe.command(tail_supported)).await;
        let usable = usable_output(&output);

        let disabled = self.with_state(|s| s.probes.record(probe, usable.is_some()));
        if disabled {
            warn!("{}: playback probe {:?} disabled", self.endpoint(), probe);
        }

        let text = usable?;
        Some(match probe {
            // Without tail the last line is picked out locally
            PlaybackProbe::AudioMixer if !tail_supported => probes::last_non_empty_line(&text)
                .unwrap_or_default()
                .to_string(),
            _ => text,
        })
    }
}
