//! Goal queue with "latest goal wins" semantics and a sticky interruption flag.
//!
//! The queue is a single slot: submitting a goal discards any goal that has
//! not been picked up yet. Every submission also raises the interruption flag,
//! which the control loop polls between actions to abandon a stale plan. The
//! flag is cleared only when a goal is dequeued, so a plan can never be
//! interrupted by the goal that started it.

use crate::goal::types::Goal;
use std::sync::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Slot {
    pending: Option<Goal>,
    interrupted: bool,
}

/// Single-slot goal queue shared between the transport and the control loop.
#[derive(Debug, Default)]
pub struct GoalQueue {
    slot: Mutex<Slot>,
    available: Notify,
}

impl GoalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any unconsumed goal with `goal` and raise the interruption flag.
    pub fn submit(&self, goal: impl Into<String>) {
        self.push(Goal::Instruction(goal.into()));
    }

    /// Replace any unconsumed goal with the stop sentinel and raise the flag.
    pub fn signal_stop(&self) {
        self.push(Goal::Stop);
    }

    // Drain, push and flag-set happen under one lock so `next` can never
    // observe the new goal without the interruption that came with it.
    fn push(&self, goal: Goal) {
        {
            let mut slot = lock(&self.slot);
            if let Some(dropped) = slot.pending.replace(goal) {
                tracing::debug!("Discarding unconsumed goal: {}", dropped);
            }
            slot.interrupted = true;
        }
        self.available.notify_one();
    }

    /// Wait for the next goal. Clears the interruption flag on return.
    pub async fn next(&self) -> Goal {
        loop {
            let notified = self.available.notified();
            if let Some(goal) = self.try_take() {
                return goal;
            }
            notified.await;
        }
    }

    /// Take the queued goal without waiting, if there is one.
    pub fn try_take(&self) -> Option<Goal> {
        let mut slot = lock(&self.slot);
        let goal = slot.pending.take()?;
        slot.interrupted = false;
        Some(goal)
    }

    /// Whether a goal (or stop) has been submitted since the last dequeue.
    pub fn was_interrupted(&self) -> bool {
        lock(&self.slot).interrupted
    }

    /// The goal waiting to be picked up, without consuming it.
    pub fn peek_pending(&self) -> Option<Goal> {
        lock(&self.slot).pending.clone()
    }
}

// The slot holds plain data, so a poisoned lock is still consistent.
fn lock(slot: &Mutex<Slot>) -> std::sync::MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[tokio::test]
    async fn test_latest_goal_wins() {
        let queue = GoalQueue::new();
        queue.submit("first");
        queue.submit("second");

        assert_eq!(queue.next().await, Goal::Instruction("second".into()));
        assert!(queue.try_take().is_none(), "first goal must never be delivered");
    }

    #[tokio::test]
    async fn test_interruption_cleared_on_dequeue() {
        let queue = GoalQueue::new();
        assert!(!queue.was_interrupted());

        queue.submit("build");
        assert!(queue.was_interrupted());

        queue.next().await;
        assert!(!queue.was_interrupted());
    }

    #[tokio::test]
    async fn test_stop_then_submit_delivers_submission() {
        let queue = GoalQueue::new();
        queue.signal_stop();
        queue.submit("after stop");

        assert_eq!(queue.next().await, Goal::Instruction("after stop".into()));
        assert!(!queue.was_interrupted());
    }

    #[tokio::test]
    async fn test_submit_during_plan_sets_flag() {
        let queue = GoalQueue::new();
        queue.submit("one");
        queue.next().await;

        queue.submit("two");
        assert!(queue.was_interrupted());
        assert_eq!(queue.peek_pending(), Some(Goal::Instruction("two".into())));
        // Peeking leaves both the goal and the flag in place.
        assert!(queue.was_interrupted());
    }

    #[test]
    fn test_next_blocks_until_submit() {
        let queue = GoalQueue::new();
        let mut next = task::spawn(queue.next());
        assert_pending!(next.poll());

        queue.submit("wake up");
        assert!(next.is_woken());
        assert_ready_eq!(next.poll(), Goal::Instruction("wake up".into()));
    }

    #[test]
    fn test_signal_stop_wakes_waiter() {
        let queue = GoalQueue::new();
        let mut next = task::spawn(queue.next());
        assert_pending!(next.poll());

        queue.signal_stop();
        assert_ready_eq!(next.poll(), Goal::Stop);
    }

    #[tokio::test]
    async fn test_submit_from_another_task() {
        let queue = Arc::new(GoalQueue::new());
        let producer = queue.clone();

        let consumer = tokio::spawn(async move { queue.next().await });
        tokio::task::yield_now().await;
        producer.submit("from elsewhere");

        let goal = consumer.await.unwrap();
        assert_eq!(goal.text(), Some("from elsewhere"));
    }
}
