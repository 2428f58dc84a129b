//! Bounded execution of external commands
//!
//! [`ProcessRunner`] spawns one process per call and never waits longer than
//! the caller's deadline. The child handle stays owned by the run call; the
//! [`ProcessRegistry`] only holds a kill channel, so a shutdown can terminate
//! every in-flight command without racing `child.wait()`.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::registry::ProcessRegistry;
use tvbridge_core::prelude::*;

/// Output text reported for a command that hit its deadline
pub const TIMEOUT_OUTPUT: &str = "Timeout";

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// Non-zero exit or I/O failure
    Failed,
    TimedOut,
    /// The executable does not exist
    NotFound,
    /// Terminated by `kill_all()`
    Killed,
}

/// Normalized result of a single command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: CommandStatus,
    /// Trimmed stdout on success, trimmed stderr (or stdout) on failure
    pub output: String,
}

impl CommandOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Success,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Failed,
            output: output.into(),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            status: CommandStatus::TimedOut,
            output: TIMEOUT_OUTPUT.to_string(),
        }
    }

    pub fn not_found(program: &str) -> Self {
        Self {
            status: CommandStatus::NotFound,
            output: format!("executable not found: {}", program),
        }
    }

    pub fn killed() -> Self {
        Self {
            status: CommandStatus::Killed,
            output: "Killed".to_string(),
        }
    }

    /// Build from a finished process
    pub fn from_exit(success: bool, stdout: &str, stderr: &str) -> Self {
        if success {
            return Self::success(stdout.trim());
        }

        let stderr = stderr.trim();
        if stderr.is_empty() {
            Self::failed(stdout.trim())
        } else {
            Self::failed(stderr)
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == CommandStatus::Success
    }

    pub fn is_timeout(&self) -> bool {
        self.status == CommandStatus::TimedOut
    }

    pub fn is_not_found(&self) -> bool {
        self.status == CommandStatus::NotFound
    }
}

/// Executes external commands with a deadline.
///
/// The session is generic over this trait so tests can substitute a scripted
/// runner for real processes.
#[trait_variant::make(CommandRunner: Send)]
pub trait LocalCommandRunner {
    /// Run `program` with `args`, returning within `deadline`
    async fn run(&self, program: &str, args: &[String], deadline: Duration) -> CommandOutput;

    /// Force-kill every command still in flight
    fn kill_all(&self) -> usize;
}

/// Runner backed by real OS processes
#[derive(Clone, Default)]
pub struct ProcessRunner {
    registry: Arc<ProcessRegistry>,
}

enum Finish {
    Exited(io::Result<(ExitStatus, String, String)>),
    TimedOut,
    Killed,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of in-flight processes spawned by this runner
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String], deadline: Duration) -> CommandOutput {
        let description = format!("{} {}", program, args.join(" "));
        trace!("Running: {}", description);

        let mut child = match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true) // Critical: cleanup if this future is dropped
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Executable not found: {}", program);
                return CommandOutput::not_found(program);
            }
            Err(e) => {
                error!("Failed to spawn {}: {}", description, e);
                return CommandOutput::failed(format!("Failed to spawn {}: {}", program, e));
            }
        };

        let (id, mut kill_rx) = self.registry.register(&description);

        let finish = tokio::select! {
            result = collect_output(&mut child) => Finish::Exited(result),
            _ = tokio::time::sleep(deadline) => Finish::TimedOut,
            Ok(()) = &mut kill_rx => Finish::Killed,
        };

        self.registry.complete(id);

        match finish {
            Finish::Exited(Ok((status, stdout, stderr))) => {
                trace!("{} exited with {:?}", description, status.code());
                CommandOutput::from_exit(status.success(), &stdout, &stderr)
            }
            Finish::Exited(Err(e)) => {
                error!("Error waiting for {}: {}", description, e);
                CommandOutput::failed(e.to_string())
            }
            Finish::TimedOut => {
                debug!("{} timed out after {:?}", description, deadline);
                terminate(&mut child).await;
                CommandOutput::timed_out()
            }
            Finish::Killed => {
                terminate(&mut child).await;
                CommandOutput::killed()
            }
        }
    }

    fn kill_all(&self) -> usize {
        self.registry.kill_all()
    }
}

/// Wait for exit while draining both pipes
async fn collect_output(child: &mut Child) -> io::Result<(ExitStatus, String, String)> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (status, stdout, stderr) =
        tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));

    Ok((status?, stdout, stderr))
}

async fn read_pipe<P: AsyncRead + Unpin>(pipe: Option<P>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!("Failed to read process output: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        // Already reaped is fine
        debug!("Failed to kill process: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_from_exit_trims_stdout_on_success() {
        let out = CommandOutput::from_exit(true, "  mHoldingDisplaySuspendBlocker=true\n", "warn");
        assert!(out.succeeded());
        assert_eq!(out.output, "mHoldingDisplaySuspendBlocker=true");
    }

    #[test]
    fn test_from_exit_prefers_stderr_on_failure() {
        let out = CommandOutput::from_exit(false, "stdout", " error: closed \n");
        assert_eq!(out.status, CommandStatus::Failed);
        assert_eq!(out.output, "error: closed");

        let out = CommandOutput::from_exit(false, "failed to connect\n", "");
        assert_eq!(out.output, "failed to connect");
    }

    #[tokio::test]
    async fn test_run_success() {
        let runner = ProcessRunner::new();
        let out = CommandRunner::run(&runner, "sh", &sh("echo hello"), Duration::from_secs(5))
            .await;
        assert_eq!(out, CommandOutput::success("hello"));
        assert_eq!(runner.registry().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_run_nonzero_exit() {
        let runner = ProcessRunner::new();
        let out = CommandRunner::run(&runner, "sh", &sh("echo oops >&2; exit 3"), Duration::from_secs(5))
            .await;
        assert_eq!(out, CommandOutput::failed("oops"));
    }

    #[tokio::test]
    async fn test_run_missing_executable() {
        let runner = ProcessRunner::new();
        let out = CommandRunner::run(&runner, 
                "/definitely/not/a/real/adb",
                &["devices".to_string()],
                Duration::from_secs(1),
            )
            .await;
        assert!(out.is_not_found());
        assert!(!out.succeeded());
    }

    #[tokio::test]
    async fn test_run_times_out_and_unregisters() {
        let runner = ProcessRunner::new();
        let started = std::time::Instant::now();
        let out = CommandRunner::run(&runner, "sh", &sh("sleep 30"), Duration::from_millis(200))
            .await;

        assert!(out.is_timeout());
        assert_eq!(out.output, TIMEOUT_OUTPUT);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(runner.registry().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_kill_all_terminates_in_flight_command() {
        let runner = ProcessRunner::new();
        let background = runner.clone();
        let handle = tokio::spawn(async move {
            CommandRunner::run(&background, "sh", &sh("sleep 30"), Duration::from_secs(30))
                .await
        });

        // Wait until the process shows up in the registry
        for _ in 0..100 {
            if runner.registry().in_flight() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(CommandRunner::kill_all(&runner), 1);
        let out = handle.await.unwrap();
        assert_eq!(out.status, CommandStatus::Killed);
    }
}
