//! Notifiers tell the outside world that an approval is waiting.
//!
//! The registry calls `notify` synchronously while creating a request, so
//! implementations must hand the work off and return straight away.

use crate::approval::types::ApprovalRequest;
use tokio::sync::broadcast;

/// Fire-and-forget sink for newly created approval requests.
pub trait Notifier: Send + Sync {
    fn notify(&self, request: &ApprovalRequest);
}

/// Drops every notification. Used when nothing is listening.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _request: &ApprovalRequest) {}
}

/// Fans requests out to every subscriber (e.g. `watch` connections).
/// Sending with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ApprovalRequest>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ApprovalRequest> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, request: &ApprovalRequest) {
        if self.tx.send(request.clone()).is_err() {
            tracing::debug!("No watchers for approval {}", request.request_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goal::types::Risk;

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let notifier = BroadcastNotifier::new(4);
        let mut rx = notifier.subscribe();
        let request = ApprovalRequest::new("Execute command: ls", Risk::High);

        notifier.notify(&request);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.request_id, request.request_id);
    }

    #[test]
    fn test_broadcast_without_subscribers_is_silent() {
        let notifier = BroadcastNotifier::default();
        assert_eq!(notifier.subscriber_count(), 0);
        notifier.notify(&ApprovalRequest::new("nobody listening", Risk::Low));
    }
}
