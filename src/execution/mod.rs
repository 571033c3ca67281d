pub mod controller;
pub mod runner;

pub use controller::{ExecutionController, ExecutionState};
pub use runner::{CommandOutcome, CommandRunner, ShellRunner};
