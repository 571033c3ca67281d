//! Core types for goals and the actions planned from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How risky an action is. Shown to the approver, never consulted for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    Low,
    Medium,
    High,
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Risk::Low => write!(f, "low"),
            Risk::Medium => write!(f, "medium"),
            Risk::High => write!(f, "high"),
        }
    }
}

impl Risk {
    /// Parse a risk tag, accepting a few common spellings.
    pub fn from_str_loose(s: &str) -> Option<Risk> {
        match s.to_lowercase().trim() {
            "low" | "l" => Some(Risk::Low),
            "medium" | "med" | "m" => Some(Risk::Medium),
            "high" | "h" => Some(Risk::High),
            _ => None,
        }
    }
}

/// One approvable unit of work derived from a goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Unique action identifier (UUID v4)
    pub action_id: String,
    /// Human-readable description shown in the approval request
    pub summary: String,
    /// Shell command to run once approved (None = nothing to run)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Informational risk tag
    pub risk: Risk,
}

impl Action {
    pub fn new(summary: impl Into<String>, command: Option<String>, risk: Risk) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            summary: summary.into(),
            command,
            risk,
        }
    }
}

/// An entry in the goal queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Goal {
    /// A free-form instruction from the operator.
    Instruction(String),
    /// Sentinel pushed by `signal_stop` so a waiting loop wakes up and sees the stop.
    Stop,
}

impl Goal {
    /// The instruction text, or None for the stop sentinel.
    pub fn text(&self) -> Option<&str> {
        match self {
            Goal::Instruction(text) => Some(text),
            Goal::Stop => None,
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Goal::Instruction(text) => write!(f, "{}", text),
            Goal::Stop => write!(f, "<stop>"),
        }
    }
}
