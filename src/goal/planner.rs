//! Turns a goal into the ordered actions the controller will gate and run.

use crate::goal::types::{Action, Risk};

/// Prefix marking a goal as a literal shell command.
pub const COMMAND_PREFIX: &str = "cmd:";

/// Maps a goal to an ordered sequence of actions. Must not block.
pub trait Planner: Send + Sync {
    fn plan(&self, goal: &str) -> Vec<Action>;
}

/// Default planner: `cmd: <command>` becomes a high-risk command action,
/// anything else a medium-risk instruction with nothing to run.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrefixPlanner;

impl Planner for PrefixPlanner {
    fn plan(&self, goal: &str) -> Vec<Action> {
        let trimmed = goal.trim();
        let is_command = trimmed
            .get(..COMMAND_PREFIX.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(COMMAND_PREFIX));

        let action = if is_command {
            let command = trimmed[COMMAND_PREFIX.len()..].trim().to_string();
            Action::new(
                format!("Execute command: {}", command),
                Some(command),
                Risk::High,
            )
        } else {
            Action::new(format!("Process instruction: {}", goal), None, Risk::Medium)
        };

        vec![action]
    }
}
