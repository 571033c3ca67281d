//! Point-in-time view of the control plane for status reporting.

use crate::approval::types::ApprovalRequest;
use crate::execution::ExecutionState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: ExecutionState,
    /// Goal whose plan is running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_goal: Option<String>,
    /// Goal submitted but not yet picked up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued_goal: Option<String>,
    /// Action waiting for approval or running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_action: Option<String>,
    #[serde(default)]
    pub pending_approvals: Vec<ApprovalRequest>,
}

impl StatusSnapshot {
    pub fn pending_count(&self) -> usize {
        self.pending_approvals.len()
    }

    /// Plain-text rendering for chat-style transports.
    pub fn render(&self) -> String {
        let mut text = format!(
            "State: {}\nCurrent goal: {}\nCurrent action: {}\nPending approvals: {}",
            self.state,
            self.current_goal.as_deref().unwrap_or("None"),
            self.current_action.as_deref().unwrap_or("Idle"),
            self.pending_count()
        );
        for request in &self.pending_approvals {
            text.push_str(&format!(
                "\n- {}: {}",
                request.request_id, request.action_summary
            ));
        }
        if let Some(queued) = &self.queued_goal {
            text.push_str(&format!("\nQueued goal: {}", queued));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::types::Risk;

    #[test]
    fn test_render_idle() {
        let snapshot = StatusSnapshot {
            state: ExecutionState::Running,
            current_goal: None,
            queued_goal: None,
            current_action: None,
            pending_approvals: Vec::new(),
        };
        assert_eq!(
            snapshot.render(),
            "State: RUNNING\nCurrent goal: None\nCurrent action: Idle\nPending approvals: 0"
        );
    }

    #[test]
    fn test_render_lists_pending() {
        let request = ApprovalRequest::new("Execute command: ls", Risk::High);
        let snapshot = StatusSnapshot {
            state: ExecutionState::Paused,
            current_goal: Some("cmd: ls".into()),
            queued_goal: Some("next".into()),
            current_action: Some("Execute command: ls".into()),
            pending_approvals: vec![request.clone()],
        };

        let text = snapshot.render();
        assert!(text.contains("State: PAUSED"));
        assert!(text.contains("Pending approvals: 1"));
        assert!(text.contains(&format!("- {}: Execute command: ls", request.request_id)));
        assert!(text.ends_with("Queued goal: next"));
    }
}
