//! Power cycling
//!
//! Android TV exposes power only as a toggle key, so a cycle presses the key,
//! waits, samples the display state and repeats until the target is reached or
//! the retries run out.

use std::sync::atomic::Ordering;

use tvbridge_core::prelude::*;
use tvbridge_core::{ActionResult, FailureReason, PowerOutcome, PowerTarget, SessionEvent};
use tvbridge_daemon::probes::keyevent_command;
use tvbridge_daemon::CommandRunner;

use super::poller::Emission;
use super::Session;

impl<R: CommandRunner + Sync> Session<R> {
    /// Wake the device. `keycode` overrides the configured wake key.
    pub async fn power_on(&self, keycode: Option<&str>) -> ActionResult {
        self.power_cycle(PowerTarget::On, keycode).await
    }

    /// Put the device to sleep. `keycode` overrides the configured sleep key.
    pub async fn power_off(&self, keycode: Option<&str>) -> ActionResult {
        self.power_cycle(PowerTarget::Off, keycode).await
    }

    async fn power_cycle(&self, target: PowerTarget, keycode: Option<&str>) -> ActionResult {
        if self.is_power_cycling() {
            return ActionResult::failure(FailureReason::Busy, "power cycle already running");
        }

        if let Some(reason) = self.connection_state().failure_reason() {
            return ActionResult::failure(reason, self.connection_state().label());
        }

        if target.is_reached(self.is_awake()) {
            return ActionResult::success(already_message(target));
        }

        if self
            .power_cycling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return ActionResult::failure(FailureReason::Busy, "power cycle already running");
        }

        let keycode = keycode.unwrap_or(match target {
            PowerTarget::On => self.settings.power.wake_keycode.as_str(),
            PowerTarget::Off => self.settings.power.sleep_keycode.as_str(),
        });
        let retries = self.settings.power.retries;
        let step_delay = self.settings.power_step_delay();

        self.events.emit(match target {
            PowerTarget::On => SessionEvent::PowerOn,
            PowerTarget::Off => SessionEvent::PowerOff,
        });
        info!(
            "{}: power {:?} with {} (up to {} attempts)",
            self.endpoint(),
            target,
            keycode,
            retries
        );

        let command = keyevent_command(keycode);
        let mut reached = false;

        for attempt in 1..=retries {
            let sent = self.adb.shell(&command).await;
            if !sent.succeeded() {
                debug!("Power key attempt {} failed: {}", attempt, sent.output);
            }

            tokio::time::sleep(step_delay).await;

            let sample = self.refresh_power(Emission::Silent).await;
            let awake = sample.unwrap_or_else(|_| self.is_awake());
            let remaining = retries - attempt;

            self.events.emit(match target {
                PowerTarget::On => SessionEvent::DebugPowerOn { awake, remaining },
                PowerTarget::Off => SessionEvent::DebugPowerOff { awake, remaining },
            });

            if sample.is_ok_and(|awake| target.is_reached(awake)) {
                reached = true;
                break;
            }
        }

        self.power_cycling.store(false, Ordering::SeqCst);
        let _ = self.refresh_power(Emission::Forced).await;

        let outcome = if reached {
            PowerOutcome::Success
        } else {
            PowerOutcome::Failed
        };
        self.events.emit(match target {
            PowerTarget::On => SessionEvent::PowerOnStatus { outcome },
            PowerTarget::Off => SessionEvent::PowerOffStatus { outcome },
        });

        if reached {
            ActionResult::success(reached_message(target))
        } else {
            warn!(
                "{}: power {:?} gave up after {} attempts",
                self.endpoint(),
                target,
                retries
            );
            ActionResult::failure(
                FailureReason::PowerCycleExhausted,
                match target {
                    PowerTarget::On => "device did not wake up",
                    PowerTarget::Off => "device did not go to sleep",
                },
            )
        }
    }
}

fn already_message(target: PowerTarget) -> &'static str {
    match target {
        PowerTarget::On => "already awake",
        PowerTarget::Off => "already asleep",
    }
}

fn reached_message(target: PowerTarget) -> &'static str {
    match target {
        PowerTarget::On => "device is awake",
        PowerTarget::Off => "device is asleep",
    }
}
