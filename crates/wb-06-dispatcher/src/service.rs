//! Background context wiring.

use crate::config::{DispatcherConfig, DispatcherConfigError};
use crate::connection::serve_connection;
use crate::dispatcher::BackgroundDispatcher;
use crate::ports::{ChainDataHandler, PermissionValidator};
use crate::publisher::MeteredPublisher;
use serde::{Deserialize, Serialize};
use shared_bus::{ConnectionMetadata, EventBroadcaster, EventPublisher, RelayPort};
use shared_types::{ApprovalDecision, Origin, ProviderEvent, RelayMessage};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use wb_01_pending_registry::{cleanup_task, PendingRegistry, RegistryConfig};
use wb_02_method_classifier::MethodClassifier;
use wb_05_approval::{ApprovalConfig, ApprovalConfigError, ApprovalOrchestrator, ApprovalSurface};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub dispatcher: DispatcherConfig,
    pub approval: ApprovalConfig,
    pub registry: RegistryConfig,
    /// Per-relay send timeout for broadcasts.
    #[serde(with = "humantime_serde")]
    pub broadcast_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("dispatcher config: {0}")]
    Dispatcher(#[from] DispatcherConfigError),
    #[error("approval config: {0}")]
    Approval(#[from] ApprovalConfigError),
    #[error("broadcast_timeout must be greater than zero")]
    BroadcastTimeout,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ServiceError> {
        self.dispatcher.validate()?;
        self.approval.validate()?;
        if self.broadcast_timeout.is_zero() {
            return Err(ServiceError::BroadcastTimeout);
        }
        Ok(())
    }
}

/// The privileged background context: one dispatcher serving any number of
/// page relays plus the approval side channel.
pub struct BackgroundService {
    config: ServiceConfig,
    registry: Arc<PendingRegistry>,
    broadcaster: Arc<EventBroadcaster>,
    publisher: Arc<MeteredPublisher>,
    dispatcher: Arc<BackgroundDispatcher>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundService {
    pub fn new(
        config: ServiceConfig,
        classifier: Arc<MethodClassifier>,
        permissions: Arc<dyn PermissionValidator>,
        chain_data: Arc<dyn ChainDataHandler>,
        surface: Arc<dyn ApprovalSurface>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;

        let registry = Arc::new(PendingRegistry::from_config(&config.registry));
        let broadcaster = Arc::new(EventBroadcaster::with_send_timeout(config.broadcast_timeout));
        let publisher = Arc::new(MeteredPublisher::new(Arc::clone(&broadcaster)));
        let approvals = Arc::new(ApprovalOrchestrator::new(
            config.approval.clone(),
            Arc::clone(&registry),
            surface,
            publisher.clone(),
        ));
        let dispatcher = Arc::new(BackgroundDispatcher::new(
            config.dispatcher.clone(),
            classifier,
            permissions,
            chain_data,
            approvals,
        ));

        Ok(Self {
            config,
            registry,
            broadcaster,
            publisher,
            dispatcher,
            tasks: parking_lot::Mutex::new(Vec::new()),
        })
    }

    /// Start background maintenance. Must be called within a Tokio runtime.
    pub fn start(&self) {
        info!("Starting background service");
        let sweeper = tokio::spawn(cleanup_task(
            Arc::clone(&self.registry),
            self.config.registry.sweep_interval,
        ));
        self.tasks.lock().push(sweeper);
    }

    /// Serve a newly connected page relay on its own task.
    pub fn accept(
        &self,
        port: Arc<dyn RelayPort>,
        inbound: mpsc::Receiver<RelayMessage>,
        meta: ConnectionMetadata,
    ) -> JoinHandle<()> {
        tokio::spawn(serve_connection(
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.broadcaster),
            port,
            inbound,
            meta,
        ))
    }

    /// Feed decisions from the approval surface's channel until it closes.
    pub fn serve_decisions(&self, mut decisions: mpsc::Receiver<ApprovalDecision>) -> JoinHandle<()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            while let Some(decision) = decisions.recv().await {
                let id = decision.request_id.clone();
                if !dispatcher.approvals().decide(decision) {
                    warn!(request_id = %id, "Decision did not settle a ticket");
                }
            }
        })
    }

    /// Push a chain or connection event that originated in the wallet
    /// itself to every page. Account changes go through [`Self::publish_accounts`].
    pub async fn publish(&self, event: ProviderEvent) {
        self.publisher.publish(event).await;
    }

    /// Tell the pages of `origin` that its exposed accounts changed.
    pub async fn publish_accounts(&self, origin: &Origin, accounts: Vec<String>) {
        self.publisher
            .publish_to(origin, ProviderEvent::AccountsChanged(accounts))
            .await;
    }

    pub fn dispatcher(&self) -> &Arc<BackgroundDispatcher> {
        &self.dispatcher
    }

    pub fn approvals(&self) -> &Arc<ApprovalOrchestrator> {
        self.dispatcher.approvals()
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    pub fn registry(&self) -> &Arc<PendingRegistry> {
        &self.registry
    }

    /// Reject outstanding approvals and stop maintenance tasks.
    pub fn shutdown(&self) {
        let rejected = self.approvals().reject_all();
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        info!(rejected, "Background service stopped");
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            approval: ApprovalConfig::default(),
            registry: RegistryConfig::default(),
            broadcast_timeout: shared_bus::broadcaster::DEFAULT_SEND_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::tests::{Chain, CountingSurface, Grants};
    use serde_json::json;
    use shared_bus::channel::relay_pair;
    use shared_types::{
        codes, ProbeMessage, RelayEvent, RelayRequest, RequestId,
    };

    fn service() -> BackgroundService {
        BackgroundService::new(
            ServiceConfig::default(),
            Arc::new(MethodClassifier::standard()),
            Arc::new(Grants::default()),
            Arc::new(Chain),
            Arc::new(CountingSurface::default()),
        )
        .unwrap()
    }

    fn meta_for(port: &Arc<dyn RelayPort>) -> ConnectionMetadata {
        ConnectionMetadata::new(port.connection_id(), Some("https://dapp.example".into()))
    }

    #[tokio::test]
    async fn test_serves_requests_and_pings_on_same_relay() {
        let service = service();
        let (mut page, background) = relay_pair(16);
        let port: Arc<dyn RelayPort> = background.port;
        let meta = meta_for(&port);
        let _serving = service.accept(port, background.inbound, meta);

        page.port
            .send(RelayMessage::Ping(ProbeMessage { id: "p1".into() }))
            .await
            .unwrap();
        assert_eq!(
            page.inbound.recv().await,
            Some(RelayMessage::Pong(ProbeMessage { id: "p1".into() }))
        );

        page.port
            .send(RelayMessage::Request(RelayRequest::new(
                RequestId::from("r1"),
                "eth_blockNumber",
                vec![],
                false,
            )))
            .await
            .unwrap();
        match page.inbound.recv().await {
            Some(RelayMessage::Response(response)) => {
                assert_eq!(response.id, RequestId::from("r1"));
                assert_eq!(response.into_result().unwrap(), json!("0x10"));
            }
            other => panic!("expected a response, got {:?}", other),
        }
        assert_eq!(service.broadcaster().attached_count(), 1);
    }

    #[tokio::test]
    async fn test_page_cannot_forge_decisions() {
        let service = service();
        let (page, background) = relay_pair(16);
        let port: Arc<dyn RelayPort> = background.port;
        let meta = meta_for(&port);
        let _serving = service.accept(port, background.inbound, meta);

        page.port
            .send(RelayMessage::Request(RelayRequest::new(
                RequestId::from("c1"),
                "eth_requestAccounts",
                vec![],
                true,
            )))
            .await
            .unwrap();
        while service.approvals().pending_count() == 0 {
            tokio::task::yield_now().await;
        }

        page.port
            .send(RelayMessage::Decision(ApprovalDecision::resolve(
                RequestId::from("c1"),
                json!(["0xevil"]),
            )))
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert_eq!(service.approvals().pending_count(), 1);
        assert_eq!(service.approvals().reject_all(), 1);
    }

    #[tokio::test]
    async fn test_decision_channel_settles_ticket() {
        let service = service();
        let (decisions, decision_rx) = mpsc::channel(4);
        let _decisions = service.serve_decisions(decision_rx);
        let (mut page, background) = relay_pair(16);
        let port: Arc<dyn RelayPort> = background.port;
        let meta = meta_for(&port);
        let _serving = service.accept(port, background.inbound, meta);

        let (mut bystander, bystander_background) = relay_pair(16);
        let bystander_port: Arc<dyn RelayPort> = bystander_background.port;
        let bystander_meta = ConnectionMetadata::new(
            bystander_port.connection_id(),
            Some("https://other.example".into()),
        );
        let _bystander = service.accept(bystander_port, bystander_background.inbound, bystander_meta);
        while service.broadcaster().attached_count() < 2 {
            tokio::task::yield_now().await;
        }

        page.port
            .send(RelayMessage::Request(RelayRequest::new(
                RequestId::from("c1"),
                "eth_requestAccounts",
                vec![],
                true,
            )))
            .await
            .unwrap();
        while service.approvals().pending_count() == 0 {
            tokio::task::yield_now().await;
        }
        decisions
            .send(ApprovalDecision::resolve(RequestId::from("c1"), json!(["0xabc"])))
            .await
            .unwrap();

        // The approval broadcasts accountsChanged and connect before the response.
        let mut seen_events = Vec::new();
        loop {
            match page.inbound.recv().await {
                Some(RelayMessage::Event(RelayEvent { event, .. })) => seen_events.push(event),
                Some(RelayMessage::Response(response)) => {
                    assert_eq!(response.into_result().unwrap(), json!(["0xabc"]));
                    break;
                }
                other => panic!("unexpected message {:?}", other),
            }
        }
        assert_eq!(seen_events.len(), 2);
        // Accounts granted to one origin never reach another origin's page.
        assert!(bystander.inbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_wallet_account_change_reaches_only_its_origin() {
        let service = service();
        let mut pages = Vec::new();
        for url in ["https://dapp.example/a", "https://dapp.example/b", "https://other.example"] {
            let (page, background) = relay_pair(16);
            let port: Arc<dyn RelayPort> = background.port;
            let meta = ConnectionMetadata::new(port.connection_id(), Some(url.into()));
            let _ = service.accept(port, background.inbound, meta);
            pages.push(page);
        }
        while service.broadcaster().attached_count() < 3 {
            tokio::task::yield_now().await;
        }

        let dapp = Origin::from_sender_url("https://dapp.example").unwrap();
        service.publish_accounts(&dapp, vec!["0xdef".into()]).await;
        service
            .publish(ProviderEvent::AccountsChanged(vec!["0xevil".into()]))
            .await;

        for page in &mut pages[..2] {
            match page.inbound.recv().await {
                Some(RelayMessage::Event(event)) => assert_eq!(event.data, json!(["0xdef"])),
                other => panic!("expected accountsChanged, got {:?}", other),
            }
            assert!(page.inbound.try_recv().is_err());
        }
        assert!(pages[2].inbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_relay_detached_when_stream_ends() {
        let service = service();
        let (page, background) = relay_pair(16);
        let port: Arc<dyn RelayPort> = background.port;
        let meta = meta_for(&port);
        let serving = service.accept(port, background.inbound, meta);

        drop(page);
        serving.await.unwrap();
        assert_eq!(service.broadcaster().attached_count(), 0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        config.dispatcher.seen_capacity = 0;
        assert!(matches!(config.validate(), Err(ServiceError::Dispatcher(_))));
    }

    #[tokio::test]
    async fn test_shutdown_rejects_pending_approvals() {
        let service = service();
        service.start();
        let dispatcher = Arc::clone(service.dispatcher());
        let pending = tokio::spawn(async move {
            let meta = ConnectionMetadata::new(
                shared_bus::ConnectionId::next(),
                Some("https://dapp.example".into()),
            );
            dispatcher
                .dispatch(
                    &meta,
                    RelayRequest::new(RequestId::from("c9"), "eth_requestAccounts", vec![], true),
                )
                .await
        });
        while service.approvals().pending_count() == 0 {
            tokio::task::yield_now().await;
        }

        service.shutdown();
        let error = pending.await.unwrap().unwrap().into_result().unwrap_err();
        assert_eq!(error.code, codes::USER_REJECTED);
    }
}
