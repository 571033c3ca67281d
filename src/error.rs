//! Error types surfaced by the control plane to its callers.

use thiserror::Error;

/// Errors from the approval registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApprovalError {
    /// No request was ever created with this id.
    #[error("Unknown approval request: {0}")]
    NotFound(String),

    /// Someone is already waiting on (or has consumed) this request's outcome.
    #[error("Approval request {0} is already being awaited")]
    AlreadyAwaited(String),
}

/// Errors from the collaborator-facing control plane.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("Goal is empty")]
    EmptyGoal,

    #[error(transparent)]
    Approval(#[from] ApprovalError),
}
