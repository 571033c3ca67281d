//! Approval registry, the single source of truth for approval requests.
//!
//! Three event sources race to resolve a request: the operator's decision,
//! the request's own timeout, and a controller stop. All three go through
//! `resolve`, which only ever moves a request out of `Waiting` once and
//! consumes the request's oneshot sender in the same critical section. The
//! first resolution wins; later ones see a terminal status and do nothing.
//!
//! `decide` is synchronous and may be called from any thread. The oneshot
//! send is what hands the verdict over to the task parked in
//! `wait_for_decision`, whichever runtime worker it happens to live on.

use crate::approval::notifier::{NoopNotifier, Notifier};
use crate::approval::types::{ApprovalRequest, Resolution, Verdict};
use crate::error::ApprovalError;
use crate::goal::types::Risk;
use chrono::Utc;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

/// Book-keeping for one request.
struct Entry {
    request: ApprovalRequest,
    /// Taken by the first resolution
    resolver: Option<oneshot::Sender<Verdict>>,
    /// Taken by the single waiter
    waiter: Option<oneshot::Receiver<Verdict>>,
    /// Timeout watcher, aborted once the request resolves another way
    timeout: Option<AbortHandle>,
}

struct Inner {
    entries: Mutex<HashMap<String, Entry>>,
    /// Set by `cancel_pending`; read and written only under `entries`
    closed: AtomicBool,
    timeout: Duration,
    notifier: Arc<dyn Notifier>,
}

/// Shared registry of approval requests. Cheap to clone.
#[derive(Clone)]
pub struct ApprovalRegistry {
    inner: Arc<Inner>,
}

impl ApprovalRegistry {
    /// Create a registry with no notifier.
    pub fn new(timeout: Duration) -> Self {
        Self::with_notifier(timeout, Arc::new(NoopNotifier))
    }

    pub fn with_notifier(timeout: Duration, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
                timeout,
                notifier,
            }),
        }
    }

    /// How long a request may wait before it times out.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Register a new `Waiting` request, notify, and start its timeout.
    /// Returns immediately. Must be called from within a Tokio runtime.
    ///
    /// Once the registry is closed, the request is born denied by stop and
    /// nobody is notified.
    pub fn create_request(&self, summary: impl Into<String>, risk: Risk) -> ApprovalRequest {
        let mut request = ApprovalRequest::new(summary, risk);
        let request_id = request.request_id.clone();
        let (tx, rx) = oneshot::channel();

        {
            let mut entries = self.entries();
            let mut resolver = Some(tx);
            if self.inner.closed.load(Ordering::SeqCst) {
                request.status = Verdict::Denied.into();
                request.decision_at = Some(Utc::now());
                request.resolved_by = Some(Resolution::Stop);
                if let Some(tx) = resolver.take() {
                    let _ = tx.send(Verdict::Denied);
                }
            }
            entries.insert(
                request_id.clone(),
                Entry {
                    request: request.clone(),
                    resolver,
                    waiter: Some(rx),
                    timeout: None,
                },
            );
        }
        if !request.is_waiting() {
            tracing::info!("Approval {} denied: execution already stopped", request_id);
            return request;
        }

        // Outside the lock: a notifier may call back into the registry.
        let notifier = self.inner.notifier.clone();
        if panic::catch_unwind(AssertUnwindSafe(|| notifier.notify(&request))).is_err() {
            tracing::error!("Notifier panicked for approval {}", request_id);
        }

        let watcher = tokio::spawn(watch_timeout(
            Arc::downgrade(&self.inner),
            request_id.clone(),
            self.inner.timeout,
        ));
        if let Some(entry) = self.entries().get_mut(&request_id) {
            if entry.request.is_waiting() {
                entry.timeout = Some(watcher.abort_handle());
            } else {
                watcher.abort();
            }
        }

        request
    }

    /// Wait until the request is decided, times out, or is cancelled.
    /// Only one caller may wait on a given request.
    pub async fn wait_for_decision(&self, request_id: &str) -> Result<Verdict, ApprovalError> {
        let waiter = {
            let mut entries = self.entries();
            let entry = entries
                .get_mut(request_id)
                .ok_or_else(|| ApprovalError::NotFound(request_id.to_string()))?;
            entry
                .waiter
                .take()
                .ok_or_else(|| ApprovalError::AlreadyAwaited(request_id.to_string()))?
        };

        match waiter.await {
            Ok(verdict) => Ok(verdict),
            // The sender is only dropped after sending, so this means the
            // registry itself is being torn down.
            Err(_) => {
                tracing::warn!("Approval {} abandoned; treating as denied", request_id);
                Ok(Verdict::Denied)
            }
        }
    }

    /// Record the operator's decision.
    ///
    /// Deciding an already-resolved request is a no-op that returns the
    /// existing verdict; `decision_at` keeps its original value.
    pub fn decide(&self, request_id: &str, approved: bool) -> Result<Verdict, ApprovalError> {
        let verdict = if approved {
            Verdict::Approved
        } else {
            Verdict::Denied
        };
        self.resolve(request_id, verdict, Resolution::Operator)
            .map(|(verdict, _)| verdict)
    }

    /// Close the registry and deny every request still waiting, attributing
    /// the outcome to a stop. Requests created afterwards are denied on
    /// creation. Returns the requests this call resolved.
    pub fn cancel_pending(&self) -> Vec<ApprovalRequest> {
        let waiting: Vec<String> = {
            let entries = self.entries();
            self.inner.closed.store(true, Ordering::SeqCst);
            entries
                .values()
                .filter(|e| e.request.is_waiting())
                .map(|e| e.request.request_id.clone())
                .collect()
        };

        waiting
            .into_iter()
            .filter_map(|id| match self.resolve(&id, Verdict::Denied, Resolution::Stop) {
                Ok((_, true)) => self.get_request(&id),
                _ => None,
            })
            .collect()
    }

    /// Whether `cancel_pending` has closed the registry.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Snapshot of every request still waiting. Order is unspecified.
    pub fn list_pending(&self) -> Vec<ApprovalRequest> {
        self.entries()
            .values()
            .filter(|e| e.request.is_waiting())
            .map(|e| e.request.clone())
            .collect()
    }

    pub fn get_request(&self, request_id: &str) -> Option<ApprovalRequest> {
        self.entries()
            .get(request_id)
            .map(|e| e.request.clone())
    }

    /// Store transport routing data on a request (e.g. which watcher saw it).
    pub fn attach_routing(
        &self,
        request_id: &str,
        routing: impl Into<String>,
    ) -> Result<(), ApprovalError> {
        let mut entries = self.entries();
        let entry = entries
            .get_mut(request_id)
            .ok_or_else(|| ApprovalError::NotFound(request_id.to_string()))?;
        entry.request.routing = Some(routing.into());
        Ok(())
    }

    /// The one place a request leaves `Waiting`. Returns the request's verdict
    /// and whether this call was the one that set it.
    fn resolve(
        &self,
        request_id: &str,
        verdict: Verdict,
        source: Resolution,
    ) -> Result<(Verdict, bool), ApprovalError> {
        self.inner.resolve(request_id, verdict, source)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.inner.entries()
    }
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // Entries are only mutated field-by-field, so a poisoned map is still usable.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn resolve(
        &self,
        request_id: &str,
        verdict: Verdict,
        source: Resolution,
    ) -> Result<(Verdict, bool), ApprovalError> {
        let mut entries = self.entries();
        let entry = entries
            .get_mut(request_id)
            .ok_or_else(|| ApprovalError::NotFound(request_id.to_string()))?;

        if let Some(existing) = entry.request.status.verdict() {
            return Ok((existing, false));
        }

        entry.request.status = verdict.into();
        entry.request.decision_at = Some(Utc::now());
        entry.request.resolved_by = Some(source);

        if let Some(resolver) = entry.resolver.take() {
            // The waiter may already be gone; the status above is still authoritative.
            let _ = resolver.send(verdict);
        }
        if source != Resolution::Timeout {
            if let Some(timeout) = entry.timeout.take() {
                timeout.abort();
            }
        }

        Ok((verdict, true))
    }
}

/// Timeout watcher for a single request.
async fn watch_timeout(inner: Weak<Inner>, request_id: String, timeout: Duration) {
    tokio::time::sleep(timeout).await;

    let Some(inner) = inner.upgrade() else {
        return;
    };
    if let Ok((_, true)) = inner.resolve(&request_id, Verdict::TimedOut, Resolution::Timeout) {
        tracing::debug!("Timeout fired for approval {}", request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::types::ApprovalStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LONG: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_create_request_is_waiting() {
        let registry = ApprovalRegistry::new(LONG);
        let request = registry.create_request("Execute command: ls", Risk::High);

        assert_eq!(request.status, ApprovalStatus::Waiting);
        assert!(request.decision_at.is_none());
        assert_eq!(registry.list_pending().len(), 1);
        assert_eq!(
            registry.get_request(&request.request_id).unwrap().action_summary,
            "Execute command: ls"
        );
    }

    #[tokio::test]
    async fn test_decide_approves_and_wakes_waiter() {
        let registry = ApprovalRegistry::new(LONG);
        let request = registry.create_request("Execute command: ls", Risk::High);

        let decided = registry.decide(&request.request_id, true).unwrap();
        assert_eq!(decided, Verdict::Approved);

        let verdict = registry.wait_for_decision(&request.request_id).await.unwrap();
        assert_eq!(verdict, Verdict::Approved);

        let stored = registry.get_request(&request.request_id).unwrap();
        assert_eq!(stored.status, ApprovalStatus::Approved);
        assert_eq!(stored.resolved_by, Some(Resolution::Operator));
        assert!(stored.decision_at.is_some());
        assert!(registry.list_pending().is_empty());
    }

    #[tokio::test]
    async fn test_decide_is_idempotent() {
        let registry = ApprovalRegistry::new(LONG);
        let request = registry.create_request("double tap", Risk::Low);

        let first = registry.decide(&request.request_id, true).unwrap();
        let decided_at = registry
            .get_request(&request.request_id)
            .unwrap()
            .decision_at;

        let second = registry.decide(&request.request_id, false).unwrap();
        assert_eq!(first, Verdict::Approved);
        assert_eq!(second, Verdict::Approved);

        let stored = registry.get_request(&request.request_id).unwrap();
        assert_eq!(stored.status, ApprovalStatus::Approved);
        assert_eq!(stored.decision_at, decided_at);
    }

    #[tokio::test]
    async fn test_decide_unknown_id_is_not_found() {
        let registry = ApprovalRegistry::new(LONG);
        let err = registry.decide("no-such-request", true).unwrap_err();
        assert_eq!(err, ApprovalError::NotFound("no-such-request".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_resolves_waiting_request() {
        let registry = ApprovalRegistry::new(Duration::from_millis(20));
        let request = registry.create_request("nobody answers", Risk::Medium);

        let verdict = registry.wait_for_decision(&request.request_id).await.unwrap();
        assert_eq!(verdict, Verdict::TimedOut);

        let stored = registry.get_request(&request.request_id).unwrap();
        assert_eq!(stored.status, ApprovalStatus::TimedOut);
        assert_eq!(stored.resolved_by, Some(Resolution::Timeout));
        assert!(stored.decision_at.is_some());

        // Late decisions leave the timeout in place.
        assert_eq!(
            registry.decide(&request.request_id, true).unwrap(),
            Verdict::TimedOut
        );
    }

    #[tokio::test]
    async fn test_timeout_after_decision_is_noop() {
        let registry = ApprovalRegistry::new(Duration::from_millis(20));
        let request = registry.create_request("quick answer", Risk::Low);
        registry.decide(&request.request_id, false).unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        let stored = registry.get_request(&request.request_id).unwrap();
        assert_eq!(stored.status, ApprovalStatus::Denied);
        assert_eq!(stored.resolved_by, Some(Resolution::Operator));
    }

    #[tokio::test]
    async fn test_second_waiter_is_rejected() {
        let registry = ApprovalRegistry::new(LONG);
        let request = registry.create_request("one waiter", Risk::Low);
        let id = request.request_id.clone();

        let first = {
            let registry = registry.clone();
            let id = id.clone();
            tokio::spawn(async move { registry.wait_for_decision(&id).await })
        };
        tokio::task::yield_now().await;

        let err = registry.wait_for_decision(&id).await.unwrap_err();
        assert_eq!(err, ApprovalError::AlreadyAwaited(id.clone()));

        registry.decide(&id, true).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), Verdict::Approved);
    }

    #[tokio::test]
    async fn test_cancel_pending_denies_only_waiting() {
        let registry = ApprovalRegistry::new(LONG);
        let decided = registry.create_request("already approved", Risk::Low);
        let waiting = registry.create_request("still waiting", Risk::High);
        registry.decide(&decided.request_id, true).unwrap();

        let cancelled = registry.cancel_pending();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].request_id, waiting.request_id);
        assert_eq!(cancelled[0].resolved_by, Some(Resolution::Stop));

        let verdict = registry.wait_for_decision(&waiting.request_id).await.unwrap();
        assert_eq!(verdict, Verdict::Denied);
        assert_eq!(
            registry.get_request(&decided.request_id).unwrap().status,
            ApprovalStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_request_after_cancel_is_denied_on_creation() {
        let notifier = Arc::new(CountingNotifier(AtomicUsize::new(0)));
        let registry = ApprovalRegistry::with_notifier(LONG, notifier.clone());
        registry.cancel_pending();
        assert!(registry.is_closed());

        let late = registry.create_request("raised after stop", Risk::High);
        assert_eq!(late.status, ApprovalStatus::Denied);
        assert_eq!(late.resolved_by, Some(Resolution::Stop));
        assert!(registry.list_pending().is_empty());
        assert_eq!(notifier.0.load(Ordering::SeqCst), 0);

        let verdict = tokio::time::timeout(
            Duration::from_millis(200),
            registry.wait_for_decision(&late.request_id),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(verdict, Verdict::Denied);
        assert_eq!(registry.decide(&late.request_id, true).unwrap(), Verdict::Denied);
    }

    #[tokio::test]
    async fn test_decide_from_another_thread() {
        let registry = ApprovalRegistry::new(LONG);
        let request = registry.create_request("cross thread", Risk::Medium);
        let id = request.request_id.clone();

        let deciding = registry.clone();
        let decider_id = id.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            deciding.decide(&decider_id, true).unwrap();
        });

        let verdict = registry.wait_for_decision(&id).await.unwrap();
        assert_eq!(verdict, Verdict::Approved);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_decisions_resolve_once() {
        for _ in 0..20 {
            let registry = ApprovalRegistry::new(Duration::from_millis(1));
            let request = registry.create_request("race", Risk::Low);
            let id = request.request_id.clone();

            let approve = {
                let r = registry.clone();
                let id = id.clone();
                tokio::spawn(async move { r.decide(&id, true).unwrap() })
            };
            let deny = {
                let r = registry.clone();
                let id = id.clone();
                tokio::spawn(async move { r.decide(&id, false).unwrap() })
            };

            let waited = registry.wait_for_decision(&id).await.unwrap();
            let a = approve.await.unwrap();
            let d = deny.await.unwrap();
            let stored = registry.get_request(&id).unwrap().status;

            // Every observer sees the same single outcome.
            assert_eq!(ApprovalStatus::from(waited), stored);
            assert_eq!(a, d);
            assert_eq!(a, waited);
        }
    }

    struct CountingNotifier(AtomicUsize);

    impl Notifier for CountingNotifier {
        fn notify(&self, _request: &ApprovalRequest) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingNotifier;

    impl Notifier for PanickingNotifier {
        fn notify(&self, _request: &ApprovalRequest) {
            panic!("transport down");
        }
    }

    #[tokio::test]
    async fn test_notifier_called_once_per_request() {
        let notifier = Arc::new(CountingNotifier(AtomicUsize::new(0)));
        let registry = ApprovalRegistry::with_notifier(LONG, notifier.clone());

        registry.create_request("a", Risk::Low);
        registry.create_request("b", Risk::Low);

        assert_eq!(notifier.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_notifier_does_not_block_creation() {
        let registry =
            ApprovalRegistry::with_notifier(Duration::from_millis(20), Arc::new(PanickingNotifier));
        let request = registry.create_request("still created", Risk::Low);

        assert!(registry.get_request(&request.request_id).is_some());
        // The timeout backstop still applies.
        let verdict = registry.wait_for_decision(&request.request_id).await.unwrap();
        assert_eq!(verdict, Verdict::TimedOut);
    }

    #[tokio::test]
    async fn test_attach_routing() {
        let registry = ApprovalRegistry::new(LONG);
        let request = registry.create_request("routed", Risk::Low);

        registry
            .attach_routing(&request.request_id, "watcher-1")
            .unwrap();
        assert_eq!(
            registry.get_request(&request.request_id).unwrap().routing.as_deref(),
            Some("watcher-1")
        );
        assert!(registry.attach_routing("missing", "x").is_err());
    }
}
