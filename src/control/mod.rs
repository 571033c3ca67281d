//! The control plane: everything a transport needs, behind one handle.
//!
//! Owns the goal queue, the execution controller and the approval gate, and
//! drives them with the control loop (see `control_loop`). All methods except
//! `run` are synchronous and safe to call from any task or thread.

pub mod control_loop;
pub mod status;

pub use control_loop::PlanOutcome;
pub use status::StatusSnapshot;

use crate::approval::types::{ApprovalRequest, Verdict};
use crate::approval::ApprovalGate;
use crate::error::ControlError;
use crate::execution::ExecutionController;
use crate::goal::{GoalQueue, Planner};
use std::sync::{Arc, Mutex};

pub struct ControlPlane {
    queue: GoalQueue,
    controller: ExecutionController,
    gate: ApprovalGate,
    planner: Arc<dyn Planner>,
    current_goal: Mutex<Option<String>>,
}

impl ControlPlane {
    pub fn new(
        controller: ExecutionController,
        gate: ApprovalGate,
        planner: Arc<dyn Planner>,
    ) -> Self {
        Self {
            queue: GoalQueue::new(),
            controller,
            gate,
            planner,
            current_goal: Mutex::new(None),
        }
    }

    /// Queue a goal, replacing any goal not yet started and interrupting
    /// the plan in progress.
    pub fn submit_goal(&self, goal: &str) -> Result<(), ControlError> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(ControlError::EmptyGoal);
        }
        tracing::info!("Goal received | goal={}", goal);
        self.queue.submit(goal);
        Ok(())
    }

    /// Wake the control loop so it can notice a stop.
    pub fn signal_stop(&self) {
        self.queue.signal_stop();
    }

    pub fn pause(&self) {
        self.controller.pause();
    }

    pub fn resume(&self) {
        self.controller.resume();
    }

    /// Stop execution for good: deny outstanding approvals and let the
    /// control loop exit.
    pub fn stop(&self) {
        tracing::info!("Stop requested");
        self.controller.stop();
        self.gate.cancel_pending();
        self.queue.signal_stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.controller.is_stopped()
    }

    pub fn list_pending_approvals(&self) -> Vec<ApprovalRequest> {
        self.gate.list_pending()
    }

    pub fn get_approval_request(&self, request_id: &str) -> Option<ApprovalRequest> {
        self.gate.get_request(request_id)
    }

    /// Approve or deny a request. Repeated decisions return the first outcome.
    pub fn decide_approval(
        &self,
        request_id: &str,
        approved: bool,
    ) -> Result<Verdict, ControlError> {
        Ok(self.gate.decide(request_id, approved)?)
    }

    /// Attach transport routing data to a request.
    pub fn attach_routing(&self, request_id: &str, routing: &str) -> Result<(), ControlError> {
        Ok(self.gate.registry().attach_routing(request_id, routing)?)
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.controller.state(),
            current_goal: self.current_goal(),
            queued_goal: self
                .queue
                .peek_pending()
                .and_then(|goal| goal.text().map(str::to_string)),
            current_action: self.controller.current_action(),
            pending_approvals: self.gate.list_pending(),
        }
    }

    pub fn current_goal(&self) -> Option<String> {
        self.current_goal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_current_goal(&self, goal: Option<String>) {
        *self
            .current_goal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = goal;
    }

    pub fn controller(&self) -> &ExecutionController {
        &self.controller
    }

    pub fn gate(&self) -> &ApprovalGate {
        &self.gate
    }
}
