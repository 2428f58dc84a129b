//! Test utilities for session code
//!
//! [`ScriptedRunner`] stands in for real processes: responses are registered
//! against substrings of the command line and every call is recorded.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::runner::{CommandOutput, CommandRunner};

struct Script {
    pattern: String,
    /// Played in order; the last entry repeats forever
    responses: VecDeque<CommandOutput>,
}

#[derive(Default)]
struct ScriptState {
    scripts: Vec<Script>,
    calls: Vec<String>,
    kills: usize,
}

/// A [`CommandRunner`] that answers from a script.
///
/// Later registrations take precedence over earlier ones. Unmatched commands
/// succeed with empty output.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Always answer commands containing `pattern` with `output`
    pub fn respond(&self, pattern: &str, output: CommandOutput) {
        self.respond_sequence(pattern, vec![output]);
    }

    /// Answer with `outputs` in order, repeating the last one
    pub fn respond_sequence(&self, pattern: &str, outputs: Vec<CommandOutput>) {
        self.state().scripts.push(Script {
            pattern: pattern.to_string(),
            responses: outputs.into(),
        });
    }

    /// Every command line run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of recorded calls containing `pattern`
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.contains(pattern))
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// How many times `kill_all()` was called
    pub fn kill_count(&self) -> usize {
        self.state().kills
    }

    fn answer(&self, line: String) -> CommandOutput {
        let mut state = self.state();
        let output = state
            .scripts
            .iter_mut()
            .rev()
            .find(|script| line.contains(&script.pattern))
            .and_then(|script| {
                if script.responses.len() > 1 {
                    script.responses.pop_front()
                } else {
                    script.responses.front().cloned()
                }
            })
            .unwrap_or_else(|| CommandOutput::success(""));
        state.calls.push(line);
        output
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[String], _deadline: Duration) -> CommandOutput {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.answer(line)
    }

    fn kill_all(&self) -> usize {
        self.state().kills += 1;
        0
    }
}
