//! Input events, app launches and ad-hoc commands

use tvbridge_core::prelude::*;
use tvbridge_core::{ActionResult, AppIdentity, DeviceInfo, FailureReason, SessionEvent};
use tvbridge_daemon::probes::{
    is_keycode, keyevent_command, monkey_aborted, monkey_command, parse_device_info,
    DEVICE_INFO_QUERY,
};
use tvbridge_daemon::{CommandOutput, CommandRunner, CommandStatus};

use super::Session;

/// Prefix routing an instruction to the local OS shell
pub const LOCAL_SHELL_PREFIX: &str = "shell ";

/// Failure reason for a command that did not succeed
pub fn failure_reason(output: &CommandOutput) -> FailureReason {
    match output.status {
        CommandStatus::TimedOut => FailureReason::TimedOut,
        CommandStatus::NotFound => FailureReason::ToolUnavailable,
        _ => FailureReason::GenericFailure,
    }
}

/// Mirror a command's outcome, with `detail` as the message either way
fn mirror(output: &CommandOutput, detail: impl Into<String>) -> ActionResult {
    if output.succeeded() {
        ActionResult::success(detail)
    } else {
        ActionResult::failure(failure_reason(output), detail)
    }
}

/// A single token that looks like a package id
fn single_package(instruction: &str) -> Option<&str> {
    let mut tokens = instruction.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(token), None) if token.contains('.') => Some(token),
        _ => None,
    }
}

impl<R: CommandRunner + Sync> Session<R> {
    /// Send key events, or launch when `code` is not made of key codes.
    ///
    /// Several whitespace-separated key codes go out in one shell call.
    pub async fn send_input(&self, code: &str) -> ActionResult {
        let tokens: Vec<&str> = code.split_whitespace().collect();
        if tokens.is_empty() || !tokens.iter().all(|t| is_keycode(t)) {
            return self.launch_app(code).await;
        }

        if let Some(reason) = self.connection_state().failure_reason() {
            return ActionResult::failure(reason, code);
        }

        let commands: Vec<String> = tokens.iter().map(|t| keyevent_command(t)).collect();
        let output = self.adb.shell_batch(&commands).await;
        mirror(&output, code)
    }

    /// Launch a package, run a device command, or run a local command.
    ///
    /// - `shell <cmd>` runs `<cmd>` locally, in any connection state
    /// - a single dotted token launches that package via monkey
    /// - anything else runs verbatim in the device shell
    pub async fn launch_app(&self, instruction: &str) -> ActionResult {
        let instruction = instruction.trim();

        if let Some(command) = instruction.strip_prefix(LOCAL_SHELL_PREFIX) {
            let output = self.adb.os_shell(command.trim()).await;
            return mirror(&output, output.output.clone());
        }

        if let Some(reason) = self.connection_state().failure_reason() {
            return ActionResult::failure(reason, self.connection_state().label());
        }

        if !self.is_awake() {
            let woke = self.power_on(None).await;
            if !woke.succeeded {
                return woke;
            }
        }

        if self.current_app().is_none() {
            self.refresh_app(true).await;
        }

        let Some(package) = single_package(instruction) else {
            let output = self.adb.shell(instruction).await;
            return mirror(&output, output.output.clone());
        };

        if self
            .current_app()
            .is_some_and(|app| app.as_str() == package)
        {
            return ActionResult::success("already launched");
        }

        let output = self.adb.shell(&monkey_command(package)).await;
        if !output.succeeded() || monkey_aborted(&output.output) {
            warn!(
                "{}: failed to launch {}: {}",
                self.endpoint(),
                package,
                output.output
            );
            return ActionResult::failure(failure_reason(&output), "failed to launch");
        }

        let app = AppIdentity::Package(package.to_string());
        self.with_state(|s| {
            s.app = Some(app.clone());
            s.app_reported = true;
        });
        self.events.emit(SessionEvent::AppChange { app: Some(app) });

        ActionResult::success(package)
    }

    /// Model, manufacturer and serial number
    pub async fn device_info(&self) -> Result<DeviceInfo> {
        if !self.is_connected() {
            return Err(Error::session(format!(
                "{} is {}",
                self.endpoint(),
                self.connection_state()
            )));
        }

        let output = self.adb.shell(DEVICE_INFO_QUERY).await;
        if !output.succeeded() {
            return Err(Error::process(output.output));
        }
        Ok(parse_device_info(&output.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_package() {
        assert_eq!(single_package("com.netflix.ninja"), Some("com.netflix.ninja"));
        assert_eq!(single_package(" com.netflix.ninja "), Some("com.netflix.ninja"));
        assert_eq!(single_package("am start com.netflix.ninja"), None);
        assert_eq!(single_package("reboot"), None);
    }

    #[test]
    fn test_failure_reason_mapping() {
        assert_eq!(
            failure_reason(&CommandOutput::timed_out()),
            FailureReason::TimedOut
        );
        assert_eq!(
            failure_reason(&CommandOutput::not_found("adb")),
            FailureReason::ToolUnavailable
        );
        assert_eq!(
            failure_reason(&CommandOutput::failed("error: closed")),
            FailureReason::GenericFailure
        );
    }
}
