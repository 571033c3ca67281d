//! The control loop: one goal at a time, one action at a time.
//!
//! Interruption is cooperative. The loop checks the queue's interruption flag
//! before and after every action, so a command already running always
//! finishes before a newer goal takes over.

use crate::control::ControlPlane;
use crate::goal::types::Goal;

/// How a plan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOutcome {
    /// Every action went through its approval cycle
    Completed,
    /// A newer goal arrived; the remaining actions were dropped
    Interrupted,
    /// Execution was stopped
    Stopped,
}

impl ControlPlane {
    /// Drive goals until the controller is stopped.
    pub async fn run(&self) {
        tracing::info!("Control loop started");

        while !self.is_stopped() {
            let goal = self.queue.next().await;
            if self.is_stopped() {
                break;
            }
            let Goal::Instruction(goal) = goal else {
                // A stop sentinel without a stop: nothing to do.
                continue;
            };

            self.set_current_goal(Some(goal.clone()));
            let outcome = self.run_goal(&goal).await;
            tracing::info!("Plan finished | goal={} | outcome={:?}", goal, outcome);
            self.set_current_goal(None);
        }

        tracing::info!("Control loop stopped");
    }

    /// Plan `goal` and push each action through the controller in order.
    pub async fn run_goal(&self, goal: &str) -> PlanOutcome {
        let actions = self.planner.plan(goal);
        tracing::info!("Plan created | goal={} | actions={}", goal, actions.len());

        for action in &actions {
            if self.is_stopped() {
                return PlanOutcome::Stopped;
            }
            if self.queue.was_interrupted() {
                tracing::info!("Plan interrupted | new goal received");
                return PlanOutcome::Interrupted;
            }

            tracing::info!("Execution start | action={}", action.summary);
            let verdict = self.controller.execute(action, &self.gate).await;
            tracing::info!(
                "Execution end | action={} | status={}",
                action.summary,
                verdict
            );

            if self.is_stopped() {
                return PlanOutcome::Stopped;
            }
            if self.queue.was_interrupted() {
                tracing::info!("Plan interrupted after action | new goal received");
                return PlanOutcome::Interrupted;
            }
        }

        PlanOutcome::Completed
    }
}
