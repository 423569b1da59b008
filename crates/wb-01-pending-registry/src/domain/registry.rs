//! Pending request table.
//!
//! Flow:
//! 1. Caller builds a [`PendingRequest`] and calls `register()` to get a handle
//! 2. Caller transmits the request carrying the same id
//! 3. Whoever receives the answer calls `settle()` (or `take()` then settle)
//! 4. Caller awaits `wait(handle)`, which expires the entry at its deadline
//!
//! Every path out of the table is a single `DashMap::remove`, so a response,
//! a timeout and a disconnect racing for one id settle it exactly once.

use crate::domain::errors::RegistryError;
use crate::domain::fingerprint::RequestFingerprint;
use crate::domain::request::{PendingRequest, RegistryConfig, Settlement};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use shared_types::{ProviderError, RequestId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A live entry.
struct Slot {
    sender: oneshot::Sender<Settlement>,
    followers: Vec<oneshot::Sender<Settlement>>,
    method: String,
    params: Vec<Value>,
    created_at: Instant,
    deadline: Instant,
    expiry_error: ProviderError,
    retry_count: u32,
    fingerprint: Option<RequestFingerprint>,
}

#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    pub total_settled: AtomicU64,
    pub total_timeouts: AtomicU64,
    pub total_cancelled: AtomicU64,
    pub total_coalesced: AtomicU64,
    /// Settlements whose caller had already gone away.
    pub total_abandoned: AtomicU64,
}

/// Receiving end for one registered (or coalesced) caller.
#[derive(Debug)]
pub struct PendingHandle {
    id: RequestId,
    deadline: Instant,
    receiver: oneshot::Receiver<Settlement>,
}

impl PendingHandle {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// An entry removed from the table but not yet settled.
///
/// Lets the caller inspect the request (to update local state, say) between
/// the atomic removal and the settlement.
pub struct TakenRequest {
    id: RequestId,
    slot: Slot,
    stats: Arc<PendingStats>,
}

impl TakenRequest {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn method(&self) -> &str {
        &self.slot.method
    }

    pub fn params(&self) -> &[Value] {
        &self.slot.params
    }

    pub fn retry_count(&self) -> u32 {
        self.slot.retry_count
    }

    pub fn elapsed(&self) -> Duration {
        self.slot.created_at.elapsed()
    }

    /// Deliver the settlement to the caller and every coalesced follower.
    ///
    /// Returns `false` when nobody was listening any more.
    pub fn settle(self, result: Settlement) -> bool {
        let TakenRequest { id, slot, stats } = self;
        for follower in slot.followers {
            let _ = follower.send(result.clone());
        }
        let elapsed_ms = slot.created_at.elapsed().as_millis();
        match slot.sender.send(result) {
            Ok(()) => {
                stats.total_settled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = %id,
                    method = %slot.method,
                    elapsed_ms = elapsed_ms,
                    "Settled pending request"
                );
                true
            }
            Err(_) => {
                stats.total_abandoned.fetch_add(1, Ordering::Relaxed);
                debug!(request_id = %id, method = %slot.method, "Pending request receiver dropped");
                false
            }
        }
    }
}

pub struct PendingRegistry {
    pending: DashMap<RequestId, Slot>,
    by_fingerprint: DashMap<RequestFingerprint, RequestId>,
    default_timeout: Duration,
    stats: Arc<PendingStats>,
}

impl PendingRegistry {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            by_fingerprint: DashMap::new(),
            default_timeout,
            stats: Arc::new(PendingStats::default()),
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.default_timeout)
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Register a request and get the handle its caller will wait on.
    pub fn register(&self, request: PendingRequest) -> Result<PendingHandle, RegistryError> {
        let PendingRequest {
            id,
            method,
            params,
            timeout,
            expiry_error,
            fingerprint,
        } = request;

        let (tx, rx) = oneshot::channel();
        let created_at = Instant::now();
        let timeout = timeout.unwrap_or(self.default_timeout);
        let deadline = created_at + timeout;

        match self.pending.entry(id.clone()) {
            Entry::Occupied(_) => return Err(RegistryError::DuplicateId(id)),
            Entry::Vacant(vacant) => {
                let expiry_error = expiry_error.unwrap_or_else(|| ProviderError::timeout(&method));
                if let Some(ref fp) = fingerprint {
                    self.by_fingerprint.insert(fp.clone(), id.clone());
                }
                debug!(
                    request_id = %id,
                    method = %method,
                    timeout_ms = timeout.as_millis(),
                    "Registered pending request"
                );
                vacant.insert(Slot {
                    sender: tx,
                    followers: Vec::new(),
                    method,
                    params,
                    created_at,
                    deadline,
                    expiry_error,
                    retry_count: 0,
                    fingerprint,
                });
            }
        }

        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        Ok(PendingHandle {
            id,
            deadline,
            receiver: rx,
        })
    }

    /// Atomically remove an entry without settling it.
    pub fn take(&self, id: &RequestId) -> Option<TakenRequest> {
        let (id, slot) = self.pending.remove(id)?;
        if let Some(ref fp) = slot.fingerprint {
            self.by_fingerprint.remove_if(fp, |_, owner| *owner == id);
        }
        Some(TakenRequest {
            id,
            slot,
            stats: self.stats.clone(),
        })
    }

    /// Settle an entry. Returns `false` if the id is not live (already
    /// settled, expired, cancelled or never registered).
    pub fn settle(&self, id: &RequestId, result: Settlement) -> bool {
        match self.take(id) {
            Some(taken) => taken.settle(result),
            None => {
                debug!(request_id = %id, "Settlement for unknown or finished request ignored");
                false
            }
        }
    }

    /// Settle an entry with its own expiry error.
    pub fn expire(&self, id: &RequestId) -> bool {
        let Some(taken) = self.take(id) else {
            return false;
        };
        let error = taken.slot.expiry_error.clone();
        warn!(
            request_id = %id,
            method = %taken.method(),
            elapsed_ms = taken.elapsed().as_millis(),
            code = error.code,
            "Pending request expired"
        );
        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
        taken.settle(Err(error));
        true
    }

    /// Reject every live entry with `error`. Returns how many were cancelled.
    pub fn cancel_all(&self, error: ProviderError) -> usize {
        let ids: Vec<RequestId> = self.pending.iter().map(|e| e.key().clone()).collect();
        let mut cancelled = 0;
        for id in ids {
            if let Some(taken) = self.take(&id) {
                taken.settle(Err(error.clone()));
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            self.stats
                .total_cancelled
                .fetch_add(cancelled as u64, Ordering::Relaxed);
            warn!(cancelled = cancelled, code = error.code, "Cancelled all pending requests");
        }
        cancelled
    }

    /// Expire every entry past its deadline.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|e| e.value().deadline <= now)
            .map(|e| e.key().clone())
            .collect();
        expired.iter().filter(|id| self.expire(id)).count()
    }

    /// Wait for a handle to settle, expiring its entry at the deadline.
    pub async fn wait(&self, handle: PendingHandle) -> Settlement {
        let PendingHandle {
            id,
            deadline,
            mut receiver,
        } = handle;

        if let Ok(outcome) = tokio::time::timeout_at(deadline, &mut receiver).await {
            return outcome.unwrap_or_else(|_| Err(ProviderError::internal()));
        }

        // Deadline passed. Whether we expire it or a settlement won the race,
        // the receiver now holds exactly one value.
        self.expire(&id);
        receiver
            .await
            .unwrap_or_else(|_| Err(ProviderError::internal()))
    }

    /// Find a live entry with this fingerprint created within `window` and
    /// attach a follower to it.
    pub fn coalesce(
        &self,
        fingerprint: &RequestFingerprint,
        window: Duration,
    ) -> Option<PendingHandle> {
        let id = self.by_fingerprint.get(fingerprint)?.value().clone();
        let mut slot = self.pending.get_mut(&id)?;
        if slot.created_at.elapsed() > window {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        slot.followers.push(tx);
        let deadline = slot.deadline;
        drop(slot);

        self.stats.total_coalesced.fetch_add(1, Ordering::Relaxed);
        debug!(request_id = %id, fingerprint = %fingerprint, "Coalesced duplicate request");
        Some(PendingHandle {
            id,
            deadline,
            receiver: rx,
        })
    }

    /// Bump and return the retry counter of a live entry.
    pub fn increment_retry(&self, id: &RequestId) -> Option<u32> {
        let mut slot = self.pending.get_mut(id)?;
        slot.retry_count += 1;
        Some(slot.retry_count)
    }

    pub fn method_of(&self, id: &RequestId) -> Option<String> {
        self.pending.get(id).map(|slot| slot.method.clone())
    }

    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

/// Background task that expires abandoned entries.
pub async fn cleanup_task(registry: Arc<PendingRegistry>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let expired = registry.sweep_expired();
        if expired > 0 {
            debug!(expired = expired, "Swept expired pending requests");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_types::codes;

    fn registry() -> PendingRegistry {
        PendingRegistry::new(Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_register_and_settle() {
        let registry = registry();
        let id = RequestId::new();
        let handle = registry
            .register(PendingRequest::new(id.clone(), "eth_getBalance"))
            .unwrap();
        assert!(registry.is_pending(&id));
        assert_eq!(registry.len(), 1);

        assert!(registry.settle(&id, Ok(json!("0x1234"))));
        assert_eq!(registry.wait(handle).await.unwrap(), json!("0x1234"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_live_id_rejected() {
        let registry = registry();
        let id = RequestId::from("same");
        let _handle = registry
            .register(PendingRequest::new(id.clone(), "eth_chainId"))
            .unwrap();
        let err = registry
            .register(PendingRequest::new(id.clone(), "eth_chainId"))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId(id));
    }

    #[tokio::test]
    async fn test_second_settlement_is_noop() {
        let registry = registry();
        let id = RequestId::new();
        let handle = registry
            .register(PendingRequest::new(id.clone(), "eth_chainId"))
            .unwrap();

        assert!(registry.settle(&id, Ok(json!("0x1"))));
        assert!(!registry.settle(&id, Ok(json!("0x2"))));
        assert!(!registry.expire(&id));
        assert_eq!(registry.wait(handle).await.unwrap(), json!("0x1"));
        assert_eq!(registry.stats().total_settled.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_at_deadline() {
        let registry = registry();
        let id = RequestId::new();
        let handle = registry
            .register(PendingRequest::new(id.clone(), "eth_call").with_timeout(Duration::from_secs(5)))
            .unwrap();

        let started = Instant::now();
        let err = registry.wait(handle).await.unwrap_err();
        assert_eq!(err.code, codes::TIMEOUT);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(5) && waited < Duration::from_secs(6));
        assert!(!registry.is_pending(&id));
        assert_eq!(registry.stats().total_timeouts.load(Ordering::Relaxed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_expiry_error() {
        let registry = registry();
        let handle = registry
            .register(
                PendingRequest::new(RequestId::new(), "eth_sendTransaction")
                    .with_timeout(Duration::from_secs(60))
                    .with_expiry_error(ProviderError::user_rejected()),
            )
            .unwrap();
        let err = registry.wait(handle).await.unwrap_err();
        assert_eq!(err.code, codes::USER_REJECTED);
    }

    #[tokio::test]
    async fn test_cancel_all_rejects_everything() {
        let registry = registry();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                registry
                    .register(PendingRequest::new(RequestId::new(), "eth_blockNumber"))
                    .unwrap()
            })
            .collect();

        assert_eq!(registry.cancel_all(ProviderError::disconnected()), 4);
        assert!(registry.is_empty());
        for handle in handles {
            assert_eq!(registry.wait(handle).await.unwrap_err().code, codes::DISCONNECTED);
        }
        assert_eq!(registry.cancel_all(ProviderError::disconnected()), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expired() {
        let registry = registry();
        let short = registry
            .register(PendingRequest::new(RequestId::new(), "a").with_timeout(Duration::from_millis(10)))
            .unwrap();
        let _long = registry
            .register(PendingRequest::new(RequestId::new(), "b").with_timeout(Duration::from_secs(60)))
            .unwrap();

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(registry.sweep_expired(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.wait(short).await.unwrap_err().code, codes::TIMEOUT);
    }

    #[tokio::test]
    async fn test_take_exposes_request_before_settling() {
        let registry = registry();
        let id = RequestId::new();
        let handle = registry
            .register(PendingRequest::new(id.clone(), "eth_accounts").with_params(vec![json!(1)]))
            .unwrap();
        registry.increment_retry(&id);

        let taken = registry.take(&id).unwrap();
        assert_eq!(taken.method(), "eth_accounts");
        assert_eq!(taken.params(), &[json!(1)]);
        assert_eq!(taken.retry_count(), 1);
        assert!(!registry.is_pending(&id));

        assert!(taken.settle(Ok(json!([]))));
        assert_eq!(registry.wait(handle).await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_dropped_taken_request_surfaces_internal_error() {
        let registry = registry();
        let id = RequestId::new();
        let handle = registry
            .register(PendingRequest::new(id.clone(), "eth_chainId"))
            .unwrap();
        drop(registry.take(&id));
        assert_eq!(registry.wait(handle).await.unwrap_err().code, codes::INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn test_coalesced_followers_share_settlement() {
        let registry = registry();
        let id = RequestId::new();
        let fp = RequestFingerprint::compute("eth_requestAccounts", &[], Some("https://a.io"));
        let primary = registry
            .register(PendingRequest::new(id.clone(), "eth_requestAccounts").with_fingerprint(fp.clone()))
            .unwrap();

        let follower = registry.coalesce(&fp, Duration::from_secs(5)).unwrap();
        assert_eq!(follower.id(), &id);
        assert_eq!(registry.len(), 1);

        registry.settle(&id, Ok(json!(["0xabc"])));
        assert_eq!(registry.wait(primary).await.unwrap(), json!(["0xabc"]));
        assert_eq!(registry.wait(follower).await.unwrap(), json!(["0xabc"]));

        // Index entry goes away with the request.
        assert!(registry.coalesce(&fp, Duration::from_secs(5)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesce_respects_window() {
        let registry = registry();
        let fp = RequestFingerprint::compute("eth_requestAccounts", &[], None);
        let _primary = registry
            .register(PendingRequest::new(RequestId::new(), "eth_requestAccounts").with_fingerprint(fp.clone()))
            .unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(registry.coalesce(&fp, Duration::from_secs(5)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_follower_expires_with_primary() {
        let registry = registry();
        let fp = RequestFingerprint::compute("personal_sign", &[json!("0x00")], None);
        let _primary = registry
            .register(
                PendingRequest::new(RequestId::new(), "personal_sign")
                    .with_timeout(Duration::from_secs(2))
                    .with_fingerprint(fp.clone()),
            )
            .unwrap();
        let follower = registry.coalesce(&fp, Duration::from_secs(5)).unwrap();
        assert_eq!(registry.wait(follower).await.unwrap_err().code, codes::TIMEOUT);
        assert!(registry.is_empty());
    }
}
