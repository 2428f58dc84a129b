//! adb invocation
//!
//! [`AdbBridge`] turns session-level requests into adb command lines for one
//! endpoint and runs them through a [`CommandRunner`].

use std::sync::Arc;
use std::time::Duration;

use crate::runner::{CommandOutput, CommandRunner};
use tvbridge_core::prelude::*;

/// `adb start-server` may need to fork the server daemon
pub const SERVER_START_TIMEOUT: Duration = Duration::from_secs(5);

/// Separator for batched shell commands
pub const SHELL_BATCH_SEPARATOR: &str = " && ";

/// adb command builder bound to one device endpoint
pub struct AdbBridge<R> {
    runner: Arc<R>,
    program: String,
    endpoint: String,
    timeout: Duration,
}

impl<R: CommandRunner + Sync> AdbBridge<R> {
    pub fn new(
        runner: Arc<R>,
        program: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn adb(&self, args: Vec<String>, deadline: Duration) -> CommandOutput {
        let output = self.runner.run(&self.program, &args, deadline).await;
        if !output.succeeded() {
            debug!(
                "adb {} -> {:?}: {}",
                args.join(" "),
                output.status,
                output.output
            );
        }
        output
    }

    /// `adb start-server`
    pub async fn start_server(&self) -> CommandOutput {
        self.adb(vec!["start-server".to_string()], SERVER_START_TIMEOUT)
            .await
    }

    /// `adb connect <endpoint>`
    pub async fn connect(&self) -> CommandOutput {
        self.adb(
            vec!["connect".to_string(), self.endpoint.clone()],
            self.timeout,
        )
        .await
    }

    /// `adb disconnect <endpoint>`
    pub async fn disconnect(&self) -> CommandOutput {
        self.adb(
            vec!["disconnect".to_string(), self.endpoint.clone()],
            self.timeout,
        )
        .await
    }

    /// `adb devices`
    pub async fn devices(&self) -> CommandOutput {
        self.adb(vec!["devices".to_string()], self.timeout).await
    }

    /// `adb -s <endpoint> shell <command>`
    pub async fn shell(&self, command: &str) -> CommandOutput {
        self.adb(
            vec![
                "-s".to_string(),
                self.endpoint.clone(),
                "shell".to_string(),
                command.to_string(),
            ],
            self.timeout,
        )
        .await
    }

    /// Several device commands joined with `&&` in a single shell call
    pub async fn shell_batch(&self, commands: &[String]) -> CommandOutput {
        self.shell(&commands.join(SHELL_BATCH_SEPARATOR)).await
    }

    /// Run a command in the local OS shell
    pub async fn os_shell(&self, command: &str) -> CommandOutput {
        let (program, flag) = local_shell();
        self.runner
            .run(program, &[flag.to_string(), command.to_string()], self.timeout)
            .await
    }

    /// Force-kill every command this bridge's runner still has in flight
    pub fn kill_all(&self) -> usize {
        self.runner.kill_all()
    }
}

#[cfg(windows)]
fn local_shell() -> (&'static str, &'static str) {
    ("cmd", "/C")
}

#[cfg(not(windows))]
fn local_shell() -> (&'static str, &'static str) {
    ("sh", "-c")
}
