//! Control channel protocol types.
//!
//! The operator's transport sends `ControlRequest`s as JSON lines over the
//! control socket and gets one `ControlResponse` line back per request.
//! A `watch` request instead keeps the connection open and receives one
//! response line per new approval request.

use crate::approval::types::{ApprovalRequest, Verdict};
use crate::control::StatusSnapshot;
use serde::{Deserialize, Serialize};

/// A request from the operator's transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Submit a new goal (interrupts the current plan)
    Run { goal: String },
    Status,
    Pause,
    Resume,
    Stop,
    /// List approval requests still waiting
    Pending,
    /// Look up one approval request
    Get { request_id: String },
    Approve { request_id: String },
    Deny { request_id: String },
    /// Stream approval notifications until the client disconnects
    Watch,
}

/// A response from the control plane.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControlResponse {
    pub ok: bool,

    /// If not ok: why
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Human-readable reply, suitable for relaying to a chat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusSnapshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approvals: Option<Vec<ApprovalRequest>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

impl ControlResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: StatusSnapshot) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_approvals(mut self, approvals: Vec<ApprovalRequest>) -> Self {
        self.approvals = Some(approvals);
        self
    }

    pub fn with_verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = Some(verdict);
        self
    }

    /// Attach the verdict of an already-resolved request, if it has one.
    pub fn with_verdict_of(self, request: &ApprovalRequest) -> Self {
        match request.status.verdict() {
            Some(verdict) => self.with_verdict(verdict),
            None => self,
        }
    }

    /// The line pushed to `watch` clients for a new approval request.
    pub fn approval_required(request: &ApprovalRequest) -> Self {
        Self::ok(format!(
            "Approval required\nAction: {}\nRisk: {}\nID: {}",
            request.action_summary, request.risk, request.request_id
        ))
        .with_approvals(vec![request.clone()])
    }
}
