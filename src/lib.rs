//! Goalgate — supervised task execution.
//!
//! Goals come in from an operator, get planned into actions, and every
//! action waits for a human decision before it runs. This library exposes
//! the control plane for the binary in `main.rs` and for integration tests.

pub mod approval;
pub mod audit;
pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod execution;
pub mod gateway;
pub mod goal;

pub use control::ControlPlane;
pub use error::{ApprovalError, ControlError};
