//! Page-side provider.

use crate::announce::ProviderInfo;
use crate::config::{ProviderConfig, ProviderConfigError};
use crate::link::ClientLink;
use crate::listeners::{EventListeners, ListenerId};
use crate::state::ProviderState;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::{json, Value};
use shared_bus::{RelayPort, SeenIdCache, TransportError};
use shared_types::{
    codes, EventName, ProbeMessage, ProviderError, ProviderEvent, ProviderResult, RelayEvent,
    RelayMessage, RelayRequest, RelayResponse, RequestId,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wb_01_pending_registry::{cleanup_task, PendingRegistry, PendingRequest};
use wb_02_method_classifier::MethodClassifier;
use wb_03_connection_monitor::{ConnectionMonitor, ConnectionState, MonitorConfig, ProbeError};

/// Arguments of a provider `request()` call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RequestArguments {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl RequestArguments {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }
}

pub struct ProviderClient {
    config: ProviderConfig,
    classifier: Arc<MethodClassifier>,
    registry: Arc<PendingRegistry>,
    processed: Mutex<SeenIdCache<RequestId>>,
    state: RwLock<ProviderState>,
    listeners: EventListeners,
    relay: Arc<dyn RelayPort>,
    monitor: Arc<ConnectionMonitor>,
    probes: DashMap<String, oneshot::Sender<()>>,
    ready: watch::Sender<bool>,
    announcements: broadcast::Sender<ProviderInfo>,
    resyncs: AtomicU64,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Removes an in-flight probe when its waiter goes away, answered or not.
struct ProbeGuard<'a> {
    probes: &'a DashMap<String, oneshot::Sender<()>>,
    id: String,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        self.probes.remove(&self.id);
    }
}

impl ProviderClient {
    /// Build a client over an established relay and start its background
    /// tasks. Must be called from within a Tokio runtime.
    ///
    /// The client becomes ready once the relay answers a probe or the
    /// configured number of attempts is used up, whichever comes first.
    pub fn connect(
        config: ProviderConfig,
        monitor_config: MonitorConfig,
        classifier: Arc<MethodClassifier>,
        relay: Arc<dyn RelayPort>,
        inbound: mpsc::Receiver<RelayMessage>,
    ) -> Result<Arc<Self>, ProviderConfigError> {
        config.validate()?;
        monitor_config.validate()?;

        let registry = Arc::new(PendingRegistry::new(config.request_timeout));
        let (ready, _) = watch::channel(false);
        let (announcements, _) = broadcast::channel(16);

        let client = Arc::new_cyclic(|weak: &Weak<Self>| {
            let link = Arc::new(ClientLink(weak.clone()));
            let monitor = Arc::new(ConnectionMonitor::new(monitor_config, link.clone(), link));
            Self {
                processed: Mutex::new(SeenIdCache::new(config.processed_capacity)),
                config,
                classifier,
                registry,
                state: RwLock::new(ProviderState::default()),
                listeners: EventListeners::new(),
                relay,
                monitor,
                probes: DashMap::new(),
                ready,
                announcements,
                resyncs: AtomicU64::new(0),
                tasks: Mutex::new(Vec::new()),
            }
        });

        let sweeper = tokio::spawn(cleanup_task(
            Arc::clone(&client.registry),
            client.config.sweep_interval,
        ));
        let reader = tokio::spawn(Self::read_inbound(Arc::downgrade(&client), inbound));
        let init = tokio::spawn(Arc::clone(&client).initialize());
        client.tasks.lock().extend([sweeper, reader, init]);

        Ok(client)
    }

    // =========================================================================
    // Page-facing API
    // =========================================================================

    /// Resolve with the method's result or reject with a [`ProviderError`].
    ///
    /// Waits for readiness, answers cacheable reads locally while connected,
    /// and otherwise relays the call and waits for its response or timeout.
    pub async fn request(&self, args: RequestArguments) -> ProviderResult<Value> {
        self.ready().await;

        if let Some(cached) = self.cached(&args.method) {
            debug!(method = %args.method, "Served from cache");
            return Ok(cached);
        }

        self.relay_request(args.method, args.params).await
    }

    pub fn on<F>(&self, event: EventName, listener: F) -> ListenerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.listeners.on(event, listener)
    }

    pub fn off(&self, event: EventName, id: ListenerId) -> bool {
        self.listeners.off(event, id)
    }

    pub fn remove_all_listeners(&self, event: Option<EventName>) {
        self.listeners.remove_all(event);
    }

    /// Connected to a chain as far as the page can tell. Does not wait for
    /// readiness.
    pub fn is_connected(&self) -> bool {
        self.state.read().is_connected
    }

    pub fn chain_id(&self) -> String {
        self.state.read().chain_id.clone()
    }

    pub fn network_version(&self) -> String {
        self.state.read().network_version.clone()
    }

    pub fn selected_address(&self) -> Option<String> {
        self.state.read().selected_address().map(str::to_string)
    }

    pub fn state(&self) -> ProviderState {
        self.state.read().clone()
    }

    pub fn info(&self) -> &ProviderInfo {
        &self.config.info
    }

    /// Announcements sent on readiness and after every reconnect.
    pub fn subscribe_announcements(&self) -> broadcast::Receiver<ProviderInfo> {
        self.announcements.subscribe()
    }

    /// Resolves once the initial handshake has finished, successful or not.
    pub async fn ready(&self) {
        let mut ready = self.ready.subscribe();
        let _ = ready.wait_for(|ready| *ready).await;
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
        &self.monitor
    }

    pub fn registry(&self) -> &Arc<PendingRegistry> {
        &self.registry
    }

    /// Number of full chain/account resyncs performed.
    pub fn resync_count(&self) -> u64 {
        self.resyncs.load(Ordering::Relaxed)
    }

    /// Stop background tasks and fail everything still pending. Later
    /// requests fail as disconnected.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.monitor.mark_disconnected();
        self.state.write().is_connected = false;
        let cancelled = self.registry.cancel_all(ProviderError::disconnected());
        info!(cancelled, "Provider shut down");
    }

    // =========================================================================
    // Request path
    // =========================================================================

    fn cached(&self, method: &str) -> Option<Value> {
        if !self.classifier.is_cacheable(method) {
            return None;
        }
        let state = self.state.read();
        if !state.is_connected {
            return None;
        }
        match method {
            "eth_chainId" => Some(json!(state.chain_id)),
            "net_version" => Some(json!(state.network_version)),
            "eth_accounts" if !state.accounts().is_empty() => Some(json!(state.accounts())),
            _ => None,
        }
    }

    async fn relay_request(&self, method: String, params: Vec<Value>) -> ProviderResult<Value> {
        if !self.monitor.is_connected() {
            if self.monitor.state() == ConnectionState::Exhausted {
                self.monitor.restart();
            }
            return Err(ProviderError::disconnected());
        }

        let id = RequestId::new();
        let requires_approval = self.classifier.requires_approval(&method);
        // Approvals settle on the background's clock; wait past it.
        let timeout = if requires_approval {
            self.config.approval_wait
        } else {
            self.config.request_timeout
        };
        let handle = self.registry.register(
            PendingRequest::new(id.clone(), method.clone())
                .with_params(params.clone())
                .with_timeout(timeout),
        )?;

        let message = RelayMessage::Request(RelayRequest::new(
            id.clone(),
            method.clone(),
            params,
            requires_approval,
        ));
        debug!(request_id = %id, method = %method, requires_approval, "Relaying request");

        if let Err(error) = self.send_with_retry(&id, message).await {
            warn!(request_id = %id, %error, "Relay send failed");
            self.registry.settle(&id, Err(ProviderError::disconnected()));
        }

        self.registry.wait(handle).await
    }

    /// Send, retrying transient failures up to `send_retries` times. Each
    /// retry is counted on the pending entry.
    async fn send_with_retry(&self, id: &RequestId, message: RelayMessage) -> Result<(), TransportError> {
        loop {
            match self.relay.send(message.clone()).await {
                Ok(()) => return Ok(()),
                Err(TransportError::Closed) => return Err(TransportError::Closed),
                Err(error) => {
                    let Some(retries) = self.registry.increment_retry(id) else {
                        // Settled while we were sending (cancelled or expired).
                        return Ok(());
                    };
                    if retries > self.config.send_retries {
                        return Err(error);
                    }
                    debug!(request_id = %id, attempt = retries, %error, "Retrying relay send");
                }
            }
        }
    }

    // =========================================================================
    // Inbound path
    // =========================================================================

    async fn read_inbound(client: Weak<Self>, mut inbound: mpsc::Receiver<RelayMessage>) {
        while let Some(message) = inbound.recv().await {
            let Some(client) = client.upgrade() else {
                return;
            };
            client.handle_message(message);
        }

        if let Some(client) = client.upgrade() {
            warn!("Relay closed by the background context");
            client.monitor.mark_disconnected();
            client.on_connection_lost();
        }
    }

    fn handle_message(&self, message: RelayMessage) {
        match message {
            RelayMessage::Response(response) => self.handle_response(response),
            RelayMessage::Event(event) => self.handle_event(event),
            RelayMessage::Pong(pong) => {
                if let Some((_, waiter)) = self.probes.remove(&pong.id) {
                    let _ = waiter.send(());
                }
            }
            other => debug!(kind = other.kind(), "Ignoring message not meant for the page"),
        }
    }

    fn handle_response(&self, response: RelayResponse) {
        if !self.processed.lock().insert(response.id.clone()) {
            debug!(request_id = %response.id, "Duplicate response ignored");
            return;
        }

        let Some(taken) = self.registry.take(&response.id) else {
            debug!(request_id = %response.id, "Response for unknown request ignored");
            return;
        };

        if taken.retry_count() > 0 {
            debug!(request_id = %response.id, retries = taken.retry_count(), "Answered after send retries");
        }
        let result = response.into_result();
        if let Ok(value) = &result {
            self.apply_result(taken.method(), value);
        }
        taken.settle(result);
    }

    /// Fold state-affecting results into the cache.
    fn apply_result(&self, method: &str, value: &Value) {
        let mut state = self.state.write();
        match method {
            "eth_chainId" => {
                if let Some(chain_id) = value.as_str() {
                    state.set_chain_id(chain_id);
                }
            }
            "net_version" => {
                if let Some(version) = value.as_str() {
                    state.network_version = version.to_string();
                }
            }
            "eth_accounts" | "eth_requestAccounts" => {
                if let Ok(accounts) = Vec::<String>::deserialize(value) {
                    state.set_accounts(accounts);
                }
            }
            _ => {}
        }
    }

    fn handle_event(&self, event: RelayEvent) {
        let name = event.event;
        let event = match ProviderEvent::try_from(event) {
            Ok(event) => event,
            Err(error) => {
                warn!(event = %name, %error, "Malformed event dropped");
                return;
            }
        };

        let event = {
            let mut state = self.state.write();
            match event {
                ProviderEvent::AccountsChanged(accounts) => {
                    state.set_accounts(accounts);
                    ProviderEvent::AccountsChanged(state.accounts().to_vec())
                }
                ProviderEvent::ChainChanged(chain_id) => {
                    state.set_chain_id(&chain_id);
                    ProviderEvent::ChainChanged(chain_id)
                }
                ProviderEvent::Connect { chain_id } => {
                    state.is_connected = true;
                    state.set_chain_id(&chain_id);
                    ProviderEvent::Connect { chain_id }
                }
                disconnect @ ProviderEvent::Disconnect { .. } => {
                    state.is_connected = false;
                    state.clear_accounts();
                    disconnect
                }
                message @ ProviderEvent::Message(_) => message,
            }
        };

        if matches!(event, ProviderEvent::Disconnect { .. }) {
            let cancelled = self.registry.cancel_all(ProviderError::disconnected());
            info!(cancelled, "Backend reported disconnect");
        }

        let delivered = self.listeners.emit(&event);
        debug!(event = %name, delivered, "Event emitted");
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    async fn initialize(self: Arc<Self>) {
        let attempts = self.config.connect_attempts;
        let mut reachable = false;

        for attempt in 1..=attempts {
            match self.monitor.probe_once().await {
                Ok(()) => {
                    reachable = true;
                    break;
                }
                Err(error) => {
                    warn!(attempt, max_attempts = attempts, %error, "Relay not ready");
                    if attempt < attempts {
                        tokio::time::sleep(self.config.connect_retry_delay * attempt).await;
                    }
                }
            }
        }

        if reachable {
            self.monitor.mark_connected();
            self.state.write().is_connected = true;
            self.resync(false).await;
            let chain_id = self.chain_id();
            info!(chain_id = %chain_id, "Provider connected");
            self.listeners.emit(&ProviderEvent::Connect { chain_id });
            self.announce();
        } else {
            warn!(attempts, "Relay unreachable, provider starts disconnected");
            self.monitor.mark_disconnected();
        }

        self.ready.send_replace(true);
        let monitor = self.monitor.spawn();
        self.tasks.lock().push(monitor);
    }

    pub(crate) async fn send_probe(&self) -> Result<(), ProbeError> {
        let id = RequestId::new().to_string();
        let (waiter, answered) = oneshot::channel();
        self.probes.insert(id.clone(), waiter);
        let _guard = ProbeGuard {
            probes: &self.probes,
            id: id.clone(),
        };

        self.relay
            .send(RelayMessage::Ping(ProbeMessage { id }))
            .await
            .map_err(|error| ProbeError::Unreachable(error.to_string()))?;

        answered
            .await
            .map_err(|_| ProbeError::Unreachable("probe abandoned".to_string()))
    }

    pub(crate) fn on_connection_lost(&self) {
        let was_connected = {
            let mut state = self.state.write();
            std::mem::replace(&mut state.is_connected, false)
        };
        let cancelled = self.registry.cancel_all(ProviderError::disconnected());
        warn!(cancelled, "Relay connection lost");

        if was_connected {
            self.listeners.emit(&ProviderEvent::Disconnect {
                code: codes::DISCONNECTED,
                message: "Relay connection lost".to_string(),
            });
        }
    }

    pub(crate) async fn on_connection_restored(&self) {
        self.state.write().is_connected = true;
        self.resync(true).await;
        let chain_id = self.chain_id();
        info!(chain_id = %chain_id, "Relay connection restored");
        self.listeners.emit(&ProviderEvent::Connect { chain_id });
        self.announce();
    }

    /// Refetch chain id and accounts. With `notify`, emit change events for
    /// whatever differs from the cached view.
    async fn resync(&self, notify: bool) {
        self.resyncs.fetch_add(1, Ordering::Relaxed);
        let before = self.state();

        for method in ["eth_chainId", "eth_accounts"] {
            if let Err(error) = self.relay_request(method.to_string(), Vec::new()).await {
                warn!(method, %error, "State resync failed");
            }
        }

        if !notify {
            return;
        }
        let after = self.state();
        if after.chain_id != before.chain_id {
            self.listeners
                .emit(&ProviderEvent::ChainChanged(after.chain_id.clone()));
        }
        if after.accounts() != before.accounts() {
            self.listeners
                .emit(&ProviderEvent::AccountsChanged(after.accounts().to_vec()));
        }
    }

    fn announce(&self) {
        // No subscribers is not an error; the page may not be listening yet.
        let _ = self.announcements.send(self.config.info.clone());
        debug!(rdns = %self.config.info.rdns, "Provider announced");
    }
}

impl Drop for ProviderClient {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}
