//! Types for the approval audit log.
//!
//! Every approval request leaves at least two lines behind: one when it is
//! raised and one when it resolves, whichever way that happened.

use crate::approval::types::{ApprovalRequest, ApprovalStatus, Resolution};
use crate::goal::types::Risk;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    Requested,
    Decided,
    TimedOut,
    Cancelled,
}

impl AuditEvent {
    /// The event recorded when a request resolves through `source`.
    pub fn for_resolution(source: Resolution) -> Self {
        match source {
            Resolution::Operator => AuditEvent::Decided,
            Resolution::Timeout => AuditEvent::TimedOut,
            Resolution::Stop => AuditEvent::Cancelled,
        }
    }

    pub fn from_str_loose(s: &str) -> Option<AuditEvent> {
        match s.to_lowercase().trim() {
            "requested" | "request" => Some(AuditEvent::Requested),
            "decided" | "decision" => Some(AuditEvent::Decided),
            "timed_out" | "timeout" | "timedout" => Some(AuditEvent::TimedOut),
            "cancelled" | "canceled" | "stop" => Some(AuditEvent::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::Requested => write!(f, "requested"),
            AuditEvent::Decided => write!(f, "decided"),
            AuditEvent::TimedOut => write!(f, "timed_out"),
            AuditEvent::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A single line in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,

    /// Session identifier (UUID, generated at `goalgate serve` start)
    pub session_id: String,

    pub event: AuditEvent,

    pub request_id: String,

    pub action_summary: String,

    pub risk: Risk,

    /// Status of the request when the entry was written
    pub status: ApprovalStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<Resolution>,

    /// Time between creation and resolution (milliseconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_ms: Option<u64>,
}

impl AuditEntry {
    /// Build an entry describing the current state of `request`.
    pub fn from_request(session_id: &str, event: AuditEvent, request: &ApprovalRequest) -> Self {
        let wait_ms = request
            .decision_at
            .map(|at| (at - request.created_at).num_milliseconds().max(0) as u64);
        Self {
            timestamp: Utc::now(),
            session_id: session_id.to_string(),
            event,
            request_id: request.request_id.clone(),
            action_summary: request.action_summary.clone(),
            risk: request.risk,
            status: request.status,
            resolved_by: request.resolved_by,
            wait_ms,
        }
    }
}

/// Summary statistics for a session's audit log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub requested: usize,
    pub approved: usize,
    pub denied: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SessionSummary {
    /// Format as a human-readable one-liner for terminal output.
    pub fn one_line(&self) -> String {
        format!(
            "{} requested | {} approved | {} denied | {} timed out | {} cancelled",
            self.requested, self.approved, self.denied, self.timed_out, self.cancelled
        )
    }
}

/// Filter criteria for querying audit logs.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub event: Option<AuditEvent>,
    pub risk: Option<Risk>,
    pub limit: Option<usize>,
}
