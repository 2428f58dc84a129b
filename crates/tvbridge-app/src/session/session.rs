//! Device session: cached state plus the adb bridge that refreshes it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use tvbridge_core::{AppIdentity, ConnectionState, SessionEvent, SessionSnapshot};
use tvbridge_daemon::{AdbBridge, CommandRunner};

use super::playback::{PlaybackDebounce, ProbeSet};
use super::strategy::AppDetectionStrategy;
use crate::config::Settings;
use crate::emitter::EventBus;

/// Cached view of the device. Only touched under the session lock.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub connection: ConnectionState,
    /// Whether a connection event has been published yet
    pub connection_reported: bool,

    pub awake: bool,
    pub awake_reported: bool,
    /// The last power query parsed cleanly
    pub power_sample_ok: bool,

    /// `None` = undetermined
    pub app: Option<AppIdentity>,
    pub app_reported: bool,
    pub strategy: AppDetectionStrategy,

    pub playback: PlaybackDebounce,
    pub probes: ProbeSet,

    pub initialized: bool,
}

impl SessionState {
    fn new(settings: &Settings) -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            connection_reported: false,
            awake: false,
            awake_reported: false,
            power_sample_ok: false,
            app: None,
            app_reported: false,
            strategy: AppDetectionStrategy::default(),
            playback: PlaybackDebounce::new(settings.playback_delay_off()),
            probes: ProbeSet::default(),
            initialized: false,
        }
    }
}

/// One logical connection to one device.
///
/// All methods take `&self`; the session is shared behind an `Arc` between
/// the poll loop and callers issuing actions.
pub struct Session<R> {
    pub(crate) adb: AdbBridge<R>,
    pub(crate) settings: Settings,
    state: Mutex<SessionState>,
    pub(crate) power_cycling: AtomicBool,
    pub(crate) events: EventBus,
}

impl<R: CommandRunner + Sync> Session<R> {
    pub fn new(runner: Arc<R>, adb_program: impl Into<String>, settings: Settings) -> Self {
        let adb = AdbBridge::new(
            runner,
            adb_program,
            settings.endpoint.clone(),
            settings.command_timeout(),
        );

        Self {
            adb,
            state: Mutex::new(SessionState::new(&settings)),
            settings,
            power_cycling: AtomicBool::new(false),
            events: EventBus::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.adb.endpoint()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run `f` under the state lock. Never call across an `.await`.
    pub(crate) fn with_state<T>(&self, f: impl FnOnce(&mut SessionState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn is_awake(&self) -> bool {
        self.with_state(|s| s.awake)
    }

    pub fn is_playing(&self) -> bool {
        self.with_state(|s| s.playback.is_playing())
    }

    pub fn current_app(&self) -> Option<AppIdentity> {
        self.with_state(|s| s.app.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.with_state(|s| s.initialized)
    }

    pub fn is_power_cycling(&self) -> bool {
        self.power_cycling.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let power_cycling = self.is_power_cycling();
        self.with_state(|s| SessionSnapshot {
            endpoint: self.endpoint().to_string(),
            connection: s.connection,
            awake: s.awake,
            app: s.app.clone(),
            playing: s.playback.is_playing(),
            power_cycling,
            initialized: s.initialized,
        })
    }

    /// Force-kill every adb command still running
    pub fn kill_all(&self) -> usize {
        self.adb.kill_all()
    }
}
