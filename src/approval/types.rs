//! Types for the approval flow.

use crate::goal::types::Risk;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of an approval request. `Waiting` moves to exactly one terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Waiting,
    Approved,
    Denied,
    TimedOut,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Waiting)
    }

    /// The verdict for a terminal status, None while still waiting.
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            ApprovalStatus::Waiting => None,
            ApprovalStatus::Approved => Some(Verdict::Approved),
            ApprovalStatus::Denied => Some(Verdict::Denied),
            ApprovalStatus::TimedOut => Some(Verdict::TimedOut),
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalStatus::Waiting => write!(f, "WAITING"),
            ApprovalStatus::Approved => write!(f, "APPROVED"),
            ApprovalStatus::Denied => write!(f, "DENIED"),
            ApprovalStatus::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}

/// Outcome of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approved,
    Denied,
    TimedOut,
}

impl Verdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved)
    }
}

impl From<Verdict> for ApprovalStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Approved => ApprovalStatus::Approved,
            Verdict::Denied => ApprovalStatus::Denied,
            Verdict::TimedOut => ApprovalStatus::TimedOut,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ApprovalStatus::from(*self).fmt(f)
    }
}

/// Which event source resolved a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// An explicit approve/deny from the operator
    Operator,
    /// The request's timeout fired first
    Timeout,
    /// The controller was stopped while the request was outstanding
    Stop,
}

/// A pending or resolved request for human approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique request ID (UUID v4)
    pub request_id: String,
    /// Summary of the action awaiting approval
    pub action_summary: String,
    pub risk: Risk,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    /// Set once, when the request leaves `Waiting`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<Resolution>,
    /// Opaque transport routing data (e.g. which watcher was notified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
}

impl ApprovalRequest {
    pub(crate) fn new(action_summary: impl Into<String>, risk: Risk) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            action_summary: action_summary.into(),
            risk,
            status: ApprovalStatus::Waiting,
            created_at: Utc::now(),
            decision_at: None,
            resolved_by: None,
            routing: None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.status == ApprovalStatus::Waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_as_upper_tag() {
        let json = serde_json::to_string(&ApprovalStatus::TimedOut).unwrap();
        assert_eq!(json, "\"TIMED_OUT\"");
        assert_eq!(Verdict::TimedOut.to_string(), "TIMED_OUT");
    }

    #[test]
    fn test_only_waiting_has_no_verdict() {
        assert_eq!(ApprovalStatus::Waiting.verdict(), None);
        assert_eq!(ApprovalStatus::Denied.verdict(), Some(Verdict::Denied));
        assert!(ApprovalStatus::Approved.is_terminal());
    }
}
