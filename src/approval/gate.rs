//! Approval gate — the controller's view of the approval flow.
//!
//! Wraps the registry with logging: every request, decision and resolution
//! goes to `tracing`, and (when configured) to the JSONL audit log.

use crate::approval::registry::ApprovalRegistry;
use crate::approval::types::{ApprovalRequest, Resolution, Verdict};
use crate::approval::ApprovalHandler;
use crate::audit::{AuditEntry, AuditEvent, AuditLogger};
use crate::error::ApprovalError;
use crate::goal::types::Action;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Audit sink shared by the gate: a logger plus the session it writes for.
struct AuditSink {
    session_id: String,
    logger: Mutex<AuditLogger>,
}

/// Registry façade adding audit logging.
#[derive(Clone)]
pub struct ApprovalGate {
    registry: ApprovalRegistry,
    audit: Option<Arc<AuditSink>>,
}

impl ApprovalGate {
    pub fn new(registry: ApprovalRegistry) -> Self {
        Self {
            registry,
            audit: None,
        }
    }

    /// Also append every approval event to `logger`.
    pub fn with_audit(mut self, session_id: impl Into<String>, logger: AuditLogger) -> Self {
        self.audit = Some(Arc::new(AuditSink {
            session_id: session_id.into(),
            logger: Mutex::new(logger),
        }));
        self
    }

    pub fn registry(&self) -> &ApprovalRegistry {
        &self.registry
    }

    pub fn list_pending(&self) -> Vec<ApprovalRequest> {
        self.registry.list_pending()
    }

    pub fn get_request(&self, request_id: &str) -> Option<ApprovalRequest> {
        self.registry.get_request(request_id)
    }

    /// Record an operator decision. Safe to call from any thread.
    pub fn decide(&self, request_id: &str, approved: bool) -> Result<Verdict, ApprovalError> {
        let verdict = self.registry.decide(request_id, approved)?;
        tracing::info!("Approval decision | id={} | status={}", request_id, verdict);
        Ok(verdict)
    }

    /// Deny every outstanding request because execution was stopped.
    pub fn cancel_pending(&self) -> Vec<ApprovalRequest> {
        let cancelled = self.registry.cancel_pending();
        for request in &cancelled {
            tracing::info!("Approval cancelled by stop | id={}", request.request_id);
        }
        cancelled
    }

    fn audit(&self, event: AuditEvent, request: &ApprovalRequest) {
        let Some(sink) = &self.audit else {
            return;
        };
        let entry = AuditEntry::from_request(&sink.session_id, event, request);
        let mut logger = sink
            .logger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = logger.log(&entry) {
            tracing::error!("Failed to write audit log: {}", e);
        }
    }
}

#[async_trait]
impl ApprovalHandler for ApprovalGate {
    async fn request_and_await(&self, action: &Action) -> Verdict {
        let request = self.registry.create_request(&action.summary, action.risk);
        tracing::info!(
            "Approval requested | id={} | risk={} | action={}",
            request.request_id,
            action.risk,
            action.summary
        );
        self.audit(AuditEvent::Requested, &request);

        let verdict = match self.registry.wait_for_decision(&request.request_id).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::error!("Approval wait failed: {}", e);
                Verdict::Denied
            }
        };

        if let Some(resolved) = self.registry.get_request(&request.request_id) {
            let source = resolved.resolved_by.unwrap_or(Resolution::Operator);
            if source == Resolution::Timeout {
                tracing::info!("Approval timed out | id={}", resolved.request_id);
            }
            self.audit(AuditEvent::for_resolution(source), &resolved);
        }

        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::types::ApprovalStatus;
    use crate::audit::AuditReader;
    use crate::goal::types::Risk;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn first_pending(gate: &ApprovalGate) -> ApprovalRequest {
        loop {
            if let Some(request) = gate.list_pending().into_iter().next() {
                return request;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_request_and_await_approved() {
        let gate = ApprovalGate::new(ApprovalRegistry::new(Duration::from_secs(60)));
        let action = Action::new("Execute command: ls", Some("ls".into()), Risk::High);

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.request_and_await(&action).await })
        };

        let pending = first_pending(&gate).await;
        assert_eq!(pending.action_summary, "Execute command: ls");
        assert_eq!(gate.decide(&pending.request_id, true).unwrap(), Verdict::Approved);
        assert_eq!(waiter.await.unwrap(), Verdict::Approved);
    }

    #[tokio::test]
    async fn test_audit_records_request_and_timeout() {
        let tmp = TempDir::new().unwrap();
        let logger = AuditLogger::new(tmp.path(), "gate-session").unwrap();
        let gate = ApprovalGate::new(ApprovalRegistry::new(Duration::from_millis(20)))
            .with_audit("gate-session", logger);

        let action = Action::new("Process instruction: hi", None, Risk::Medium);
        assert_eq!(gate.request_and_await(&action).await, Verdict::TimedOut);

        let entries = AuditReader::new(tmp.path()).read_session("gate-session").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event, AuditEvent::Requested);
        assert_eq!(entries[0].status, ApprovalStatus::Waiting);
        assert_eq!(entries[1].event, AuditEvent::TimedOut);
        assert_eq!(entries[1].status, ApprovalStatus::TimedOut);
        assert!(entries[1].wait_ms.is_some());
    }

    #[tokio::test]
    async fn test_cancel_pending_releases_waiter() {
        let gate = ApprovalGate::new(ApprovalRegistry::new(Duration::from_secs(60)));
        let action = Action::new("long wait", None, Risk::Low);

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.request_and_await(&action).await })
        };
        first_pending(&gate).await;

        assert_eq!(gate.cancel_pending().len(), 1);
        assert_eq!(waiter.await.unwrap(), Verdict::Denied);
    }

    #[test]
    fn test_decide_unknown_is_not_found() {
        let gate = ApprovalGate::new(ApprovalRegistry::new(Duration::from_secs(1)));
        assert!(matches!(
            gate.decide("missing", true),
            Err(ApprovalError::NotFound(_))
        ));
    }
}
