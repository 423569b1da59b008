//! Fixtures shared by the integration flows.

use bridge_runtime::{ApprovalDesk, BridgeConfig, BridgeRuntime};
use parking_lot::Mutex;
use serde_json::Value;
use shared_bus::channel::{relay_pair, ChannelPort};
use shared_bus::RelayPort;
use shared_types::{ApprovalDecision, EventName, ProviderError, RelayMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use wb_04_provider_client::{ProviderClient, RequestArguments};
use wb_05_approval::ApprovalTicket;

pub const ORIGIN_URL: &str = "https://dapp.example/app";

/// Default timings with short probe intervals.
pub fn test_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.monitor.probe_interval = Duration::from_secs(10);
    config.monitor.probe_timeout = Duration::from_secs(1);
    config.monitor.base_backoff = Duration::from_secs(2);
    config
}

/// A running bridge plus the wallet side of its approval prompts.
pub struct Bridge {
    pub runtime: BridgeRuntime,
    pub desk: ApprovalDesk,
}

impl Bridge {
    pub fn start() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        let (runtime, desk) = BridgeRuntime::start(config).expect("bridge starts");
        Self { runtime, desk }
    }

    /// Open a page and wait until its provider is ready.
    pub async fn page(&self, sender_url: Option<&str>) -> Arc<ProviderClient> {
        let client = self.runtime.open_page(sender_url).expect("page opens");
        client.ready().await;
        client
    }

    /// Open a page whose relay runs through a [`Link`] the test controls.
    pub async fn linked_page(&self, sender_url: Option<&str>) -> (Arc<ProviderClient>, Link) {
        let capacity = self.runtime.config().relay_capacity;
        let (page, page_side) = relay_pair(capacity);
        let (background_side, background) = relay_pair(capacity);

        let link = Link::new();
        let upstream = link.forward(page_side.inbound, background_side.port, false);
        let downstream = link.forward(background_side.inbound, page_side.port, true);
        link.tasks.lock().extend([upstream, downstream]);

        let client = self
            .runtime
            .attach_page(page, background, sender_url)
            .expect("page attaches");
        client.ready().await;
        (client, link)
    }

    pub async fn next_prompt(&mut self) -> ApprovalTicket {
        tokio::time::timeout(Duration::from_secs(5), self.desk.prompts.recv())
            .await
            .expect("prompt arrives")
            .expect("surface open")
    }

    pub fn no_prompt_waiting(&mut self) -> bool {
        self.desk.prompts.try_recv().is_err()
    }

    pub async fn approve(&self, ticket: &ApprovalTicket, result: Value) {
        self.desk
            .decisions
            .send(ApprovalDecision::resolve(ticket.request_id.clone(), result))
            .await
            .expect("decision channel open");
    }

    pub async fn reject(&self, ticket: &ApprovalTicket) {
        self.desk
            .decisions
            .send(ApprovalDecision::reject(ticket.request_id.clone(), None))
            .await
            .expect("decision channel open");
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.runtime.shutdown();
    }
}

/// Relay hop that can drop every message or duplicate responses.
pub struct Link {
    up: Arc<AtomicBool>,
    duplicate_responses: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Link {
    fn new() -> Self {
        Self {
            up: Arc::new(AtomicBool::new(true)),
            duplicate_responses: Arc::new(AtomicBool::new(false)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    pub fn duplicate_responses(&self, on: bool) {
        self.duplicate_responses.store(on, Ordering::SeqCst);
    }

    fn forward(
        &self,
        mut from: mpsc::Receiver<RelayMessage>,
        to: Arc<ChannelPort>,
        towards_page: bool,
    ) -> JoinHandle<()> {
        let up = Arc::clone(&self.up);
        let duplicate = Arc::clone(&self.duplicate_responses);
        tokio::spawn(async move {
            while let Some(message) = from.recv().await {
                if !up.load(Ordering::SeqCst) {
                    continue;
                }
                let twice = towards_page
                    && duplicate.load(Ordering::SeqCst)
                    && matches!(message, RelayMessage::Response(_));
                if twice && to.send(message.clone()).await.is_err() {
                    return;
                }
                if to.send(message).await.is_err() {
                    return;
                }
            }
        })
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

/// Collects every payload a page listener receives for one event.
pub fn record(client: &ProviderClient, event: EventName) -> Arc<Mutex<Vec<Value>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.on(event, move |payload| sink.lock().push(payload.clone()));
    seen
}

/// Poll `condition` until it holds or `limit` elapses.
pub async fn eventually<F>(limit: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Issue a request on its own task so the test can act while it is pending.
pub fn spawn_request(
    client: &Arc<ProviderClient>,
    method: &str,
    params: Vec<Value>,
) -> JoinHandle<Result<Value, ProviderError>> {
    let client = Arc::clone(client);
    let args = RequestArguments::new(method).with_params(params);
    tokio::spawn(async move { client.request(args).await })
}

pub async fn call(client: &ProviderClient, method: &str, params: Vec<Value>) -> Result<Value, ProviderError> {
    client
        .request(RequestArguments::new(method).with_params(params))
        .await
}
