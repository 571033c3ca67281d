pub mod planner;
pub mod queue;
pub mod types;

pub use planner::{Planner, PrefixPlanner};
pub use queue::GoalQueue;
pub use types::*;
