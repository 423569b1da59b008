//! # Bridge Runtime
//!
//! Owns the background service and every page provider opened against it.

use crate::adapters::{ChannelApprovalSurface, ClientVersion, MemoryPermissionStore, StaticChainData};
use crate::config::{BridgeConfig, ConfigError};
use parking_lot::Mutex;
use shared_bus::channel::{relay_pair, RelayEnd};
use shared_bus::{ConnectionId, ConnectionMetadata, RelayPort};
use shared_types::ApprovalDecision;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use wb_02_method_classifier::MethodClassifier;
use wb_04_provider_client::{ProviderClient, ProviderConfigError};
use wb_05_approval::{ApprovalSurface, ApprovalTicket};
use wb_06_dispatcher::{
    BackgroundService, ChainDataHandler, ChainDataRouter, PermissionValidator, ServiceError,
};

const DECISION_BACKLOG: usize = 32;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("background service: {0}")]
    Service(#[from] ServiceError),
    #[error("provider client: {0}")]
    Provider(#[from] ProviderConfigError),
}

/// The wallet side of an approval prompt: tickets come out, decisions go in.
pub struct ApprovalDesk {
    pub prompts: mpsc::Receiver<ApprovalTicket>,
    pub decisions: mpsc::Sender<ApprovalDecision>,
}

struct OpenPage {
    connection_id: ConnectionId,
    client: Arc<ProviderClient>,
    relay_task: JoinHandle<()>,
}

pub struct BridgeRuntime {
    config: BridgeConfig,
    classifier: Arc<MethodClassifier>,
    service: BackgroundService,
    pages: Mutex<Vec<OpenPage>>,
    decision_task: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeRuntime {
    /// Build with in-memory adapters and start serving decisions.
    /// Must be called from within a Tokio runtime.
    pub fn start(config: BridgeConfig) -> Result<(Self, ApprovalDesk), RuntimeError> {
        let (surface, prompts) = ChannelApprovalSurface::new(config.service.approval.max_pending);
        let chain_data = ChainDataRouter::new()
            .route(ClientVersion::METHOD, Arc::new(ClientVersion))
            .fallback(Arc::new(StaticChainData::new()));
        let runtime = Self::with_adapters(
            config,
            Arc::new(MemoryPermissionStore::new()),
            Arc::new(chain_data),
            Arc::new(surface),
        )?;
        let decisions = runtime.open_decision_channel();
        Ok((runtime, ApprovalDesk { prompts, decisions }))
    }

    /// Build around caller-supplied ports. Call [`Self::open_decision_channel`]
    /// to accept decisions.
    pub fn with_adapters(
        config: BridgeConfig,
        permissions: Arc<dyn PermissionValidator>,
        chain_data: Arc<dyn ChainDataHandler>,
        surface: Arc<dyn ApprovalSurface>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        let classifier = Arc::new(MethodClassifier::standard());
        let service = BackgroundService::new(
            config.service.clone(),
            Arc::clone(&classifier),
            permissions,
            chain_data,
            surface,
        )?;
        service.start();
        info!(
            request_timeout = ?config.provider.request_timeout,
            approval_timeout = ?config.service.approval.timeout,
            "Bridge runtime started"
        );

        Ok(Self {
            config,
            classifier,
            service,
            pages: Mutex::new(Vec::new()),
            decision_task: Mutex::new(None),
        })
    }

    /// Replace the decision channel. Decisions sent on an earlier channel
    /// are no longer read.
    pub fn open_decision_channel(&self) -> mpsc::Sender<ApprovalDecision> {
        let (tx, rx) = mpsc::channel(DECISION_BACKLOG);
        let task = self.service.serve_decisions(rx);
        if let Some(previous) = self.decision_task.lock().replace(task) {
            previous.abort();
        }
        tx
    }

    /// Connect a new page, identified to the background by `sender_url`.
    pub fn open_page(&self, sender_url: Option<&str>) -> Result<Arc<ProviderClient>, RuntimeError> {
        let (page, background) = relay_pair(self.config.relay_capacity);
        self.attach_page(page, background, sender_url)
    }

    /// Connect a page over caller-built relay ends. `page` is handed to the
    /// provider client and `background` to the service.
    pub fn attach_page(
        &self,
        page: RelayEnd,
        background: RelayEnd,
        sender_url: Option<&str>,
    ) -> Result<Arc<ProviderClient>, RuntimeError> {
        let connection_id = background.port.connection_id();
        let meta = ConnectionMetadata::new(connection_id, sender_url.map(str::to_string));

        let relay_task = self.service.accept(background.port, background.inbound, meta);
        let client = match ProviderClient::connect(
            self.config.provider.clone(),
            self.config.monitor.clone(),
            Arc::clone(&self.classifier),
            page.port,
            page.inbound,
        ) {
            Ok(client) => client,
            Err(e) => {
                relay_task.abort();
                return Err(e.into());
            }
        };

        info!(connection = connection_id.as_u64(), sender_url = ?sender_url, "Page opened");
        self.pages.lock().push(OpenPage {
            connection_id,
            client: Arc::clone(&client),
            relay_task,
        });
        Ok(client)
    }

    /// Tear down one page: its client stops and its relay detaches.
    pub fn close_page(&self, client: &Arc<ProviderClient>) -> bool {
        let mut pages = self.pages.lock();
        let Some(index) = pages.iter().position(|p| Arc::ptr_eq(&p.client, client)) else {
            return false;
        };
        let page = pages.swap_remove(index);
        page.client.shutdown();
        page.relay_task.abort();
        self.service.broadcaster().detach(page.connection_id);
        info!(connection = page.connection_id.as_u64(), "Page closed");
        true
    }

    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }

    pub fn service(&self) -> &BackgroundService {
        &self.service
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn shutdown(&self) {
        for page in self.pages.lock().drain(..) {
            page.client.shutdown();
            page.relay_task.abort();
        }
        if let Some(task) = self.decision_task.lock().take() {
            task.abort();
        }
        self.service.shutdown();
        info!("Bridge runtime stopped");
    }
}
