//! Engine - owns a session and drives its poll loop
//!
//! The Engine starts the adb server, runs one poll tick per interval on a
//! background task, turns tick failures into `fatalerror` events without
//! stopping the loop, and on shutdown stops the timer and kills every adb
//! command still in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use tvbridge_core::prelude::*;
use tvbridge_core::SessionEvent;
use tvbridge_daemon::{CommandRunner, ProcessRunner, ToolAvailability};

use crate::config::Settings;
use crate::session::Session;
use crate::signals;

/// Orchestration engine for one device session
pub struct Engine<R> {
    session: Arc<Session<R>>,

    /// Send `true` to stop the poll loop
    shutdown_tx: watch::Sender<bool>,

    /// Clone for background tasks
    shutdown_rx: watch::Receiver<bool>,

    /// Background poll loop, once started
    poll_task: Option<JoinHandle<()>>,
}

impl Engine<ProcessRunner> {
    /// Validate settings, locate adb and build a session backed by real processes
    pub fn from_settings(mut settings: Settings) -> Result<Self> {
        settings.validate()?;

        let tools = ToolAvailability::resolve(settings.adb_path.as_deref());
        if let Some(message) = tools.unavailable_message() {
            warn!("{}", message);
        }

        let runner = Arc::new(ProcessRunner::new());
        let session = Session::new(runner, tools.adb_program(), settings);
        Ok(Self::new(Arc::new(session)))
    }
}

impl<R: CommandRunner + Sync + 'static> Engine<R> {
    pub fn new(session: Arc<Session<R>>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            session,
            shutdown_tx,
            shutdown_rx,
            poll_task: None,
        }
    }

    pub fn session(&self) -> &Arc<Session<R>> {
        &self.session
    }

    /// Subscribe to session events. Multiple subscribers are supported.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    /// Get a sender that requests shutdown
    pub fn shutdown_sender(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    /// Get a receiver for the shutdown signal
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Request shutdown on SIGINT / SIGTERM
    pub fn spawn_signal_handler(&self) {
        signals::spawn_signal_handler(self.shutdown_tx.clone());
    }

    pub fn is_running(&self) -> bool {
        self.poll_task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Start the adb server and the poll loop.
    ///
    /// Fails if adb cannot be executed at all.
    pub async fn start(&mut self) -> Result<()> {
        if self.poll_task.is_some() {
            return Err(Error::session("engine already started"));
        }

        self.session.start_server().await?;

        let interval = self.session.settings().poll_interval();
        info!(
            "Polling {} every {:?}",
            self.session.endpoint(),
            interval
        );

        self.poll_task = Some(tokio::spawn(poll_loop(
            self.session.clone(),
            interval,
            self.shutdown_rx.clone(),
        )));
        Ok(())
    }

    /// Stop polling and kill every tracked adb process
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);

        let mut killed = self.session.kill_all();

        if let Some(task) = self.poll_task.take() {
            if let Err(e) = task.await {
                warn!("Poll loop ended abnormally: {}", e);
            }
            // The tick that was running may have spawned more
            killed += self.session.kill_all();
        }

        if killed > 0 {
            debug!("Killed {} adb command(s) on shutdown", killed);
        }

        info!("Session for {} stopped", self.session.endpoint());
    }
}

async fn poll_loop<R: CommandRunner + Sync + 'static>(
    session: Arc<Session<R>>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => run_tick(&session).await,
            _ = shutdown_rx.changed() => {
                debug!("Poll loop received shutdown");
                break;
            }
        }
    }
}

/// Run one poll tick, reporting errors and panics as `fatalerror`
pub async fn run_tick<R: CommandRunner + Sync + 'static>(session: &Arc<Session<R>>) {
    let tick_session = session.clone();
    let outcome = tokio::spawn(async move { tick_session.poll().await }).await;

    let error = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e,
        Err(e) => Error::poll_task(e.to_string()),
    };

    if error.is_recoverable() {
        warn!("{}: {}", session.endpoint(), error);
    } else {
        error!("{}: {}", session.endpoint(), error);
    }
    let message = error.to_string();
    session
        .events()
        .emit(SessionEvent::FatalError { message });
}
