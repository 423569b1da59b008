//! Ticket lifecycle and decision handling.

use crate::config::ApprovalConfig;
use crate::surface::ApprovalSurface;
use crate::ticket::ApprovalTicket;
use bridge_telemetry::{metric_inc, metrics};
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_bus::EventPublisher;
use shared_types::{ApprovalDecision, ProviderError, ProviderEvent, RequestId};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use wb_01_pending_registry::{PendingRegistry, PendingRequest, RequestFingerprint, Settlement};

const REASON_TIMED_OUT: &str = "approval timed out";
const REASON_QUEUE_FULL: &str = "approval queue full";
const REASON_SURFACE_FAILED: &str = "approval surface unavailable";

fn rejected_because(reason: &str) -> ProviderError {
    ProviderError::user_rejected().with_data(json!({ "reason": reason }))
}

pub struct ApprovalOrchestrator {
    config: ApprovalConfig,
    registry: Arc<PendingRegistry>,
    surface: Arc<dyn ApprovalSurface>,
    publisher: Arc<dyn EventPublisher>,
    tickets: DashMap<RequestId, ApprovalTicket>,
    active_chain: watch::Sender<String>,
}

impl ApprovalOrchestrator {
    pub fn new(
        config: ApprovalConfig,
        registry: Arc<PendingRegistry>,
        surface: Arc<dyn ApprovalSurface>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let (active_chain, _) = watch::channel(config.initial_chain_id.clone());
        Self {
            config,
            registry,
            surface,
            publisher,
            tickets: DashMap::new(),
            active_chain,
        }
    }

    /// Show a ticket to the user and wait for its settlement.
    ///
    /// Always settles: a decision, the approval timeout, a full queue and a
    /// surface failure all produce a result.
    pub async fn submit(&self, ticket: ApprovalTicket) -> Settlement {
        let fingerprint = RequestFingerprint::compute(
            &ticket.method,
            &ticket.params,
            Some(ticket.origin.as_str()),
        );

        if let Some(handle) = self.registry.coalesce(&fingerprint, self.config.coalesce_window) {
            info!(
                request_id = %ticket.request_id,
                primary = %handle.id(),
                method = %ticket.method,
                "Joined identical pending approval"
            );
            metric_inc!(metrics::APPROVALS_TOTAL, &["coalesced"]);
            return self.registry.wait(handle).await;
        }

        if self.tickets.len() >= self.config.max_pending {
            warn!(
                request_id = %ticket.request_id,
                origin = %ticket.origin,
                pending = self.tickets.len(),
                "Approval queue full"
            );
            metric_inc!(metrics::APPROVALS_TOTAL, &["queue_full"]);
            return Err(rejected_because(REASON_QUEUE_FULL));
        }

        let id = ticket.request_id.clone();
        let handle = self.registry.register(
            PendingRequest::new(id.clone(), ticket.method.clone())
                .with_params(ticket.params.clone())
                .with_timeout(self.config.timeout)
                .with_expiry_error(rejected_because(REASON_TIMED_OUT))
                .with_fingerprint(fingerprint),
        )?;
        self.tickets.insert(id.clone(), ticket.clone());
        self.update_pending_gauge();

        info!(
            request_id = %id,
            method = %ticket.method,
            origin = %ticket.origin,
            summary = %ticket.summary,
            "Awaiting approval"
        );

        if let Err(error) = self.surface.open(&ticket).await {
            warn!(request_id = %id, %error, "Could not open approval surface");
            self.registry
                .settle(&id, Err(rejected_because(REASON_SURFACE_FAILED)));
        }

        let outcome = self.registry.wait(handle).await;
        self.tickets.remove(&id);
        self.update_pending_gauge();

        match &outcome {
            Ok(value) => {
                metric_inc!(metrics::APPROVALS_TOTAL, &["approved"]);
                info!(request_id = %id, method = %ticket.method, "Approved");
                self.publish_approved(&ticket, value).await;
            }
            Err(error) if is_timeout(error) => {
                metric_inc!(metrics::APPROVALS_TOTAL, &["timed_out"]);
                info!(request_id = %id, method = %ticket.method, "Approval timed out");
            }
            Err(error) => {
                metric_inc!(metrics::APPROVALS_TOTAL, &["rejected"]);
                info!(request_id = %id, method = %ticket.method, code = error.code, "Rejected");
            }
        }
        outcome
    }

    /// Apply a decision from the approval surface. Returns false when no
    /// ticket with that id is waiting.
    pub fn decide(&self, decision: ApprovalDecision) -> bool {
        let id = decision.request_id.clone();
        if !self.tickets.contains_key(&id) {
            warn!(request_id = %id, "Decision for unknown or settled ticket ignored");
            return false;
        }
        debug!(request_id = %id, action = ?decision.action, "Decision received");
        self.registry.settle(&id, decision.into_settlement())
    }

    /// Reject every outstanding ticket, e.g. on shutdown.
    pub fn reject_all(&self) -> usize {
        let ids: Vec<RequestId> = self.tickets.iter().map(|t| t.key().clone()).collect();
        ids.iter()
            .filter(|id| self.registry.settle(id, Err(ProviderError::user_rejected())))
            .count()
    }

    pub fn pending_tickets(&self) -> Vec<ApprovalTicket> {
        let mut tickets: Vec<ApprovalTicket> =
            self.tickets.iter().map(|t| t.value().clone()).collect();
        tickets.sort_by_key(|t| t.created_at);
        tickets
    }

    pub fn ticket(&self, id: &RequestId) -> Option<ApprovalTicket> {
        self.tickets.get(id).map(|t| t.value().clone())
    }

    pub fn pending_count(&self) -> usize {
        self.tickets.len()
    }

    /// Chain the wallet is currently on.
    pub fn active_chain_id(&self) -> String {
        self.active_chain.borrow().clone()
    }

    pub fn subscribe_chain(&self) -> watch::Receiver<String> {
        self.active_chain.subscribe()
    }

    pub fn config(&self) -> &ApprovalConfig {
        &self.config
    }

    fn update_pending_gauge(&self) {
        metrics::PENDING_APPROVALS.set(self.tickets.len() as f64);
    }

    async fn publish_approved(&self, ticket: &ApprovalTicket, result: &Value) {
        // Accounts are granted per origin; only that origin's pages hear about them.
        if ticket.traits.reveals_identity {
            match Vec::<String>::deserialize(result) {
                Ok(accounts) => {
                    self.publisher
                        .publish_to(&ticket.origin, ProviderEvent::AccountsChanged(accounts))
                        .await;
                }
                // Permission grants answer with descriptors, not addresses.
                Err(_) => debug!(request_id = %ticket.request_id, "Result carries no account list"),
            }
            let chain_id = self.active_chain_id();
            self.publisher
                .publish_to(&ticket.origin, ProviderEvent::Connect { chain_id })
                .await;
        }

        if ticket.traits.changes_chain {
            let Some(chain_id) = ticket.target_chain_id() else {
                warn!(request_id = %ticket.request_id, "Approved chain change without chainId");
                return;
            };
            self.active_chain.send_replace(chain_id.to_string());
            self.publisher
                .publish(ProviderEvent::ChainChanged(chain_id.to_string()))
                .await;
            self.publish_connect().await;
        }
    }

    async fn publish_connect(&self) {
        let chain_id = self.active_chain_id();
        self.publisher
            .publish(ProviderEvent::Connect { chain_id })
            .await;
    }
}

fn is_timeout(error: &ProviderError) -> bool {
    error
        .data
        .as_ref()
        .and_then(|data| data.get("reason"))
        .and_then(Value::as_str)
        == Some(REASON_TIMED_OUT)
}
