pub mod gate;
pub mod notifier;
pub mod registry;
pub mod types;

use crate::goal::types::Action;
use async_trait::async_trait;

pub use gate::ApprovalGate;
pub use notifier::{BroadcastNotifier, NoopNotifier, Notifier};
pub use registry::ApprovalRegistry;
pub use types::*;

/// Trait for approval handlers.
/// The controller only needs a verdict per action; the gate is the real
/// implementation, tests substitute scripted ones.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    async fn request_and_await(&self, action: &Action) -> Verdict;
}
