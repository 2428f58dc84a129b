//! Headless mode runner - event loop without a UI
//!
//! Prints every session event as NDJSON and accepts line commands on stdin:
//!
//! | line | action |
//! |---|---|
//! | `input <codes>` | send key events (or launch, for non key codes) |
//! | `launch <instruction>` | launch a package or run a command |
//! | `power on [KEYCODE]` / `power off [KEYCODE]` | power cycle |
//! | `connect` | force a connection check |
//! | `info` | device model, manufacturer and serial |
//! | `status` | print the cached session snapshot |
//! | `q` / `quit` | shut down |

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use tvbridge_app::{CommandRunner, Engine, Session, Settings};
use tvbridge_core::prelude::Result;
use tvbridge_core::SessionEvent;

use super::HeadlessEvent;

/// Command read from stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadlessCommand {
    Input(String),
    Launch(String),
    PowerOn(Option<String>),
    PowerOff(Option<String>),
    Connect,
    Info,
    Status,
}

/// Parsed stdin line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdinLine {
    Command(HeadlessCommand),
    Quit,
    Empty,
    Unknown,
}

impl StdinLine {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (trimmed, ""),
        };

        let command = match (verb, rest) {
            ("", _) => return Self::Empty,
            ("q" | "quit", "") => return Self::Quit,
            ("input", code) if !code.is_empty() => HeadlessCommand::Input(code.to_string()),
            ("launch", instruction) if !instruction.is_empty() => {
                HeadlessCommand::Launch(instruction.to_string())
            }
            ("power", "on") => HeadlessCommand::PowerOn(None),
            ("power", "off") => HeadlessCommand::PowerOff(None),
            ("power", args) => match args.split_once(char::is_whitespace) {
                Some(("on", keycode)) => {
                    HeadlessCommand::PowerOn(Some(keycode.trim().to_string()))
                }
                Some(("off", keycode)) => {
                    HeadlessCommand::PowerOff(Some(keycode.trim().to_string()))
                }
                _ => return Self::Unknown,
            },
            ("connect", "") => HeadlessCommand::Connect,
            ("info", "") => HeadlessCommand::Info,
            ("status", "") => HeadlessCommand::Status,
            _ => return Self::Unknown,
        };
        Self::Command(command)
    }
}

/// Run in headless mode - output JSON events until quit or a signal
pub async fn run_headless(settings: Settings) -> Result<()> {
    info!("═══════════════════════════════════════════════════════");
    info!("tvbridge starting in HEADLESS mode");
    info!("Endpoint: {}", settings.endpoint);
    info!("═══════════════════════════════════════════════════════");

    let mut engine = Engine::from_settings(settings)?;
    engine.spawn_signal_handler();

    let mut events = engine.subscribe();
    let mut shutdown_rx = engine.shutdown_receiver();

    let (cmd_tx, mut cmd_rx) = mpsc::channel(16);
    let quit_tx = engine.shutdown_sender();
    std::thread::spawn(move || {
        spawn_stdin_reader_blocking(cmd_tx, quit_tx);
    });

    if let Err(e) = engine.start().await {
        flush_events(&mut events);
        HeadlessEvent::error(e.to_string(), e.is_fatal()).emit();
        engine.shutdown().await;
        return Err(e);
    }

    let mut stdin_open = true;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => HeadlessEvent::session(&event).emit(),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Headless output lagged, {} event(s) dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            command = cmd_rx.recv(), if stdin_open => match command {
                Some(command) => {
                    let session = engine.session().clone();
                    tokio::spawn(async move {
                        execute(&session, command).await.emit();
                    });
                }
                None => stdin_open = false,
            },
            _ = shutdown_rx.changed() => {
                info!("Quit requested");
                break;
            }
        }
    }

    engine.shutdown().await;
    flush_events(&mut events);

    info!("tvbridge headless mode exiting");
    Ok(())
}

/// Print events already queued on the receiver
fn flush_events(events: &mut tokio::sync::broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        HeadlessEvent::session(&event).emit();
    }
}

/// Run one stdin command against the session
pub async fn execute<R: CommandRunner + Sync>(
    session: &Arc<Session<R>>,
    command: HeadlessCommand,
) -> HeadlessEvent {
    match command {
        HeadlessCommand::Input(code) => {
            let result = session.send_input(&code).await;
            HeadlessEvent::command_result(format!("input {}", code), result)
        }
        HeadlessCommand::Launch(instruction) => {
            let result = session.launch_app(&instruction).await;
            HeadlessEvent::command_result(format!("launch {}", instruction), result)
        }
        HeadlessCommand::PowerOn(keycode) => {
            let result = session.power_on(keycode.as_deref()).await;
            HeadlessEvent::command_result("power on", result)
        }
        HeadlessCommand::PowerOff(keycode) => {
            let result = session.power_off(keycode.as_deref()).await;
            HeadlessEvent::command_result("power off", result)
        }
        HeadlessCommand::Connect => {
            HeadlessEvent::command_result("connect", session.connect().await)
        }
        HeadlessCommand::Info => match session.device_info().await {
            Ok(info) => HeadlessEvent::device_info(info),
            Err(e) => HeadlessEvent::error(e.to_string(), false),
        },
        HeadlessCommand::Status => HeadlessEvent::session(&SessionEvent::Status {
            snapshot: session.snapshot(),
        }),
    }
}

/// Read stdin lines and forward commands (blocking version)
fn spawn_stdin_reader_blocking(
    cmd_tx: mpsc::Sender<HeadlessCommand>,
    quit_tx: watch::Sender<bool>,
) {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let reader = stdin.lock();

    for line in reader.lines() {
        match line {
            Ok(line) => match StdinLine::parse(&line) {
                StdinLine::Command(command) => {
                    info!("Stdin: {:?}", command);
                    if cmd_tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                StdinLine::Quit => {
                    info!("Stdin: quit requested");
                    let _ = quit_tx.send(true);
                    break;
                }
                StdinLine::Empty => {}
                StdinLine::Unknown => {
                    warn!("Unknown stdin command: {}", line.trim());
                    HeadlessEvent::error(format!("unknown command: {}", line.trim()), false)
                        .emit();
                }
            },
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    info!("Stdin reader exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tvbridge_daemon::test_utils::ScriptedRunner;
    use tvbridge_daemon::CommandOutput;

    const ENDPOINT: &str = "192.168.1.50:5555";

    fn session() -> (Arc<ScriptedRunner>, Arc<Session<ScriptedRunner>>) {
        let runner = Arc::new(ScriptedRunner::new());
        let session = Session::new(runner.clone(), "adb", Settings::for_endpoint(ENDPOINT));
        (runner, Arc::new(session))
    }

    fn to_value(event: &HeadlessEvent) -> Value {
        serde_json::to_value(event).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            StdinLine::parse("input KEYCODE_HOME KEYCODE_DPAD_DOWN"),
            StdinLine::Command(HeadlessCommand::Input(
                "KEYCODE_HOME KEYCODE_DPAD_DOWN".into()
            ))
        );
        assert_eq!(
            StdinLine::parse("launch com.netflix.ninja"),
            StdinLine::Command(HeadlessCommand::Launch("com.netflix.ninja".into()))
        );
        assert_eq!(
            StdinLine::parse("power on"),
            StdinLine::Command(HeadlessCommand::PowerOn(None))
        );
        assert_eq!(
            StdinLine::parse("power on KEYCODE_WAKEUP"),
            StdinLine::Command(HeadlessCommand::PowerOn(Some("KEYCODE_WAKEUP".into())))
        );
        assert_eq!(
            StdinLine::parse("power off"),
            StdinLine::Command(HeadlessCommand::PowerOff(None))
        );
        assert_eq!(
            StdinLine::parse("power off KEYCODE_SLEEP"),
            StdinLine::Command(HeadlessCommand::PowerOff(Some("KEYCODE_SLEEP".into())))
        );
        assert_eq!(StdinLine::parse("  info "), StdinLine::Command(HeadlessCommand::Info));
        assert_eq!(StdinLine::parse("q"), StdinLine::Quit);
        assert_eq!(StdinLine::parse("   "), StdinLine::Empty);
    }

    #[test]
    fn test_parse_rejects_incomplete_commands() {
        assert_eq!(StdinLine::parse("input"), StdinLine::Unknown);
        assert_eq!(StdinLine::parse("launch"), StdinLine::Unknown);
        assert_eq!(StdinLine::parse("power"), StdinLine::Unknown);
        assert_eq!(StdinLine::parse("power sideways"), StdinLine::Unknown);
        assert_eq!(StdinLine::parse("reboot now"), StdinLine::Unknown);
    }

    #[tokio::test]
    async fn test_execute_status_reports_snapshot() {
        let (_runner, session) = session();
        let value = to_value(&execute(&session, HeadlessCommand::Status).await);
        assert_eq!(value["name"], "status");
        assert_eq!(value["debug"]["endpoint"], ENDPOINT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_power_on_with_custom_keycode() {
        let (runner, session) = session();
        runner.respond(
            "connect",
            CommandOutput::success(format!("connected to {}", ENDPOINT)),
        );
        runner.respond(
            "devices",
            CommandOutput::success(format!("List of devices attached\n{}\tdevice", ENDPOINT)),
        );
        runner.respond(
            "mHoldingDisplay",
            CommandOutput::success("mHoldingDisplaySuspendBlocker=false"),
        );
        session.poll().await.unwrap();

        // The key lands on the first attempt
        runner.respond(
            "mHoldingDisplay",
            CommandOutput::success("mHoldingDisplaySuspendBlocker=true"),
        );
        let command = StdinLine::parse("power on KEYCODE_WAKEUP");
        let StdinLine::Command(command) = command else {
            panic!("expected a command, got {:?}", command);
        };
        let value = to_value(&execute(&session, command).await);

        assert_eq!(value["command"], "power on");
        assert_eq!(value["succeeded"], true);
        assert_eq!(runner.calls_matching("input keyevent KEYCODE_WAKEUP"), 1);
        assert_eq!(runner.calls_matching("KEYCODE_POWER"), 0);
    }

    #[tokio::test]
    async fn test_execute_info_while_disconnected_is_an_error() {
        let (_runner, session) = session();
        let value = to_value(&execute(&session, HeadlessCommand::Info).await);
        assert_eq!(value["event"], "error");
        assert_eq!(value["fatal"], false);
    }

    #[tokio::test]
    async fn test_execute_local_shell_passthrough() {
        let (runner, session) = session();
        runner.respond("echo hi", CommandOutput::success("hi"));

        let command = HeadlessCommand::Launch("shell echo hi".into());
        let value = to_value(&execute(&session, command).await);
        assert_eq!(value["event"], "command_result");
        assert_eq!(value["command"], "launch shell echo hi");
        assert_eq!(value["succeeded"], true);
        assert_eq!(value["detail"], "hi");
    }
}
