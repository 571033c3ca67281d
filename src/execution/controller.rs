//! Execution controller — run/pause/stop state and the per-action cycle.
//!
//! Every action goes through the same three steps: wait until the controller
//! is runnable, get a verdict from the approval handler, and (only when
//! approved) run the action's command. Pausing holds back the next action
//! but never interrupts one that is already running. Stopping is terminal.

use crate::approval::types::Verdict;
use crate::approval::ApprovalHandler;
use crate::execution::runner::CommandRunner;
use crate::goal::types::Action;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Process-wide execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    Running,
    Paused,
    Stopped,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionState::Running => write!(f, "RUNNING"),
            ExecutionState::Paused => write!(f, "PAUSED"),
            ExecutionState::Stopped => write!(f, "STOPPED"),
        }
    }
}

pub struct ExecutionController {
    state: watch::Sender<ExecutionState>,
    current_action: Mutex<Option<String>>,
    runner: Arc<dyn CommandRunner>,
}

impl ExecutionController {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let (state, _) = watch::channel(ExecutionState::Running);
        Self {
            state,
            current_action: Mutex::new(None),
            runner,
        }
    }

    pub fn state(&self) -> ExecutionState {
        *self.state.borrow()
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == ExecutionState::Stopped
    }

    /// Hold back new actions. No effect once stopped.
    pub fn pause(&self) {
        if self.transition(ExecutionState::Paused) {
            tracing::info!("Execution paused");
        }
    }

    /// Let new actions start again. No effect once stopped.
    pub fn resume(&self) {
        if self.transition(ExecutionState::Running) {
            tracing::info!("Execution resumed");
        }
    }

    /// Stop for good. Anyone parked in `wait_until_runnable` wakes up and
    /// sees the stop.
    pub fn stop(&self) {
        let changed = self.state.send_if_modified(|state| {
            let changed = *state != ExecutionState::Stopped;
            *state = ExecutionState::Stopped;
            changed
        });
        if changed {
            tracing::info!("Execution stopped");
        }
    }

    // Stopped is terminal; every other transition is allowed.
    fn transition(&self, to: ExecutionState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ExecutionState::Stopped || *state == to {
                return false;
            }
            *state = to;
            true
        })
    }

    /// Return once the controller is running or stopped. Callers must
    /// re-check `is_stopped` afterwards.
    pub async fn wait_until_runnable(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|state| *state != ExecutionState::Paused).await;
    }

    /// Summary of the action being approved or run, if any.
    pub fn current_action(&self) -> Option<String> {
        self.current_action
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Run one action through the pause gate, the approval handler and,
    /// if approved, the command runner.
    pub async fn execute(&self, action: &Action, approvals: &dyn ApprovalHandler) -> Verdict {
        self.wait_until_runnable().await;
        if self.is_stopped() {
            return Verdict::Denied;
        }

        let _current = CurrentAction::set(&self.current_action, &action.summary);

        let verdict = approvals.request_and_await(action).await;
        if !verdict.is_approved() {
            return verdict;
        }
        if self.is_stopped() {
            tracing::info!("Approved after stop, not running | action={}", action.summary);
            return Verdict::Denied;
        }

        if let Some(command) = action.command.as_deref() {
            match self.runner.run(command).await {
                Ok(outcome) if outcome.success() => {
                    tracing::info!("Command finished | command={}", command);
                }
                Ok(outcome) => {
                    tracing::warn!(
                        "Command failed | command={} | exit_code={}",
                        command,
                        outcome.exit_code
                    );
                }
                Err(e) => {
                    tracing::warn!("Command could not be run | command={} | error={:#}", command, e);
                }
            }
        }

        verdict
    }
}

/// Marks an action as current for as long as it is alive.
struct CurrentAction<'a> {
    slot: &'a Mutex<Option<String>>,
}

impl<'a> CurrentAction<'a> {
    fn set(slot: &'a Mutex<Option<String>>, summary: &str) -> Self {
        *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(summary.to_string());
        Self { slot }
    }
}

impl Drop for CurrentAction<'_> {
    fn drop(&mut self) {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}
