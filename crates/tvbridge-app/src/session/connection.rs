//! Connection management

use tvbridge_core::prelude::*;
use tvbridge_core::{ActionResult, ConnectionState, SessionEvent};
use tvbridge_daemon::{classify, classify_runner_failure, CommandRunner, CommandStatus, ConnectTranscript};

use super::Session;

/// Event announcing that the session entered `state`
pub fn connection_event(state: ConnectionState) -> SessionEvent {
    match state {
        ConnectionState::Connected => SessionEvent::Connected,
        ConnectionState::Authorizing => SessionEvent::Connecting,
        ConnectionState::Unauthorized => SessionEvent::Unauthorized,
        ConnectionState::TimedOut => SessionEvent::Timeout,
        other => SessionEvent::Disconnected { state: other },
    }
}

impl<R: CommandRunner + Sync> Session<R> {
    pub fn connection_state(&self) -> ConnectionState {
        self.with_state(|s| s.connection)
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    /// Make sure the adb server is running. A missing executable is fatal.
    pub async fn start_server(&self) -> Result<()> {
        let output = self.adb.start_server().await;
        match output.status {
            CommandStatus::Success => Ok(()),
            CommandStatus::NotFound => {
                self.apply_connection_state(ConnectionState::ToolMissing);
                let err = Error::tool_not_found(self.adb.program());
                self.events.emit(SessionEvent::FatalError {
                    message: err.to_string(),
                });
                Err(err)
            }
            _ => {
                // connect() starts the server on demand as well
                warn!("adb start-server did not succeed: {}", output.output);
                Ok(())
            }
        }
    }

    /// Establish or verify the connection and publish any state change
    pub async fn connect(&self) -> ActionResult {
        let (healthy, previous) = self.with_state(|s| {
            (
                s.connection.is_connected() && s.awake && s.power_sample_ok,
                s.connection,
            )
        });

        if healthy {
            return ActionResult::success(ConnectionState::Connected.label());
        }

        if previous == ConnectionState::Unauthorized {
            // adb keeps a stale unauthorized transport around otherwise
            self.adb.disconnect().await;
        }

        let connect = self.adb.connect().await;
        let next = match classify_runner_failure(&connect) {
            Some(state) => state,
            None => {
                let devices = self.adb.devices().await;
                let transcript =
                    ConnectTranscript::new(&connect.output, &devices.output, self.endpoint());
                classify(&transcript)
            }
        };

        self.apply_connection_state(next);

        match next.failure_reason() {
            None => ActionResult::success(next.label()),
            Some(reason) => ActionResult::failure(reason, next.label()),
        }
    }

    /// Store a new connection state; emits only on change or first report
    pub(crate) fn apply_connection_state(&self, next: ConnectionState) {
        self.with_state(|s| {
            let previous = s.connection;
            if previous == next && s.connection_reported {
                return;
            }

            s.connection = next;
            s.connection_reported = true;

            if previous.is_connected() && !next.is_connected() {
                s.awake = false;
                s.power_sample_ok = false;
                s.app = None;
                s.playback.reset();
            }

            info!("{}: {} -> {}", self.endpoint(), previous, next);

            if previous == ConnectionState::Unauthorized && next != ConnectionState::Unauthorized {
                self.events.emit(SessionEvent::Authorized);
            }
            self.events.emit(connection_event(next));
        });
    }
}
