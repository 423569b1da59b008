//! Request dispatch.

use crate::config::DispatcherConfig;
use crate::ports::{ChainDataHandler, PermissionValidator};
use crate::validation::validate_params;
use bridge_telemetry::{metric_inc, metric_observe, metrics, request_span};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_bus::{ConnectionMetadata, SeenIdCache};
use shared_types::{
    network_version_of, Origin, ProviderError, ProviderResult, RelayRequest, RelayResponse,
    RequestId,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn, Instrument};
use wb_02_method_classifier::{MethodCategory, MethodClassifier, MethodInfo};
use wb_05_approval::{ApprovalOrchestrator, ApprovalTicket};

pub struct BackgroundDispatcher {
    config: DispatcherConfig,
    classifier: Arc<MethodClassifier>,
    permissions: Arc<dyn PermissionValidator>,
    chain_data: Arc<dyn ChainDataHandler>,
    approvals: Arc<ApprovalOrchestrator>,
    seen: Mutex<SeenIdCache<RequestId>>,
}

impl BackgroundDispatcher {
    pub fn new(
        config: DispatcherConfig,
        classifier: Arc<MethodClassifier>,
        permissions: Arc<dyn PermissionValidator>,
        chain_data: Arc<dyn ChainDataHandler>,
        approvals: Arc<ApprovalOrchestrator>,
    ) -> Self {
        Self {
            seen: Mutex::new(SeenIdCache::new(config.seen_capacity)),
            config,
            classifier,
            permissions,
            chain_data,
            approvals,
        }
    }

    pub fn approvals(&self) -> &Arc<ApprovalOrchestrator> {
        &self.approvals
    }

    /// Handle one inbound request.
    ///
    /// Returns `None` for a repeated id; the first delivery already owns the
    /// response. Everything else produces exactly one response tagged with
    /// the request's id.
    pub async fn dispatch(
        self: &Arc<Self>,
        meta: &ConnectionMetadata,
        request: RelayRequest,
    ) -> Option<RelayResponse> {
        if !self.seen.lock().insert(request.id.clone()) {
            metric_inc!(metrics::DUPLICATE_REQUESTS);
            debug!(request_id = %request.id, "Duplicate request dropped");
            return None;
        }

        let id = request.id.clone();
        let method = request.method.clone();
        let span = request_span!(
            "dispatch",
            id,
            method,
            connection_id = %meta.connection_id
        );

        let started = Instant::now();
        let this = Arc::clone(self);
        let meta = meta.clone();
        let task = tokio::spawn(async move { this.execute(&meta, request).await }.instrument(span));
        let result = match task.await {
            Ok(result) => result,
            Err(join_error) => {
                error!(
                    request_id = %id,
                    method = %method,
                    panicked = join_error.is_panic(),
                    "Dispatch aborted"
                );
                Err(ProviderError::internal())
            }
        };

        self.record(&method, &result, started);
        Some(RelayResponse::from_result(id, method, result))
    }

    async fn execute(&self, meta: &ConnectionMetadata, request: RelayRequest) -> ProviderResult<Value> {
        let info = *self.classifier.classify(&request.method)?;
        let origin = meta.origin();
        if origin.is_none() {
            debug!(request_id = %request.id, "No origin in transport metadata");
        }

        match info.category {
            MethodCategory::ReadOnly | MethodCategory::Simulation => {
                self.read(&info, origin.as_ref(), &request.params).await
            }
            MethodCategory::Write => self.write(&info, origin, request).await,
        }
    }

    async fn read(
        &self,
        info: &MethodInfo,
        origin: Option<&Origin>,
        params: &[Value],
    ) -> ProviderResult<Value> {
        if info.traits.exposes_identity {
            return Ok(self.identity_read(info.name, origin).await);
        }

        match info.name {
            "eth_chainId" => return Ok(json!(self.approvals.active_chain_id())),
            "net_version" => {
                let chain_id = self.approvals.active_chain_id();
                return network_version_of(&chain_id)
                    .map(Value::String)
                    .ok_or_else(ProviderError::internal);
            }
            _ => {}
        }

        match tokio::time::timeout(
            self.config.chain_data_timeout,
            self.chain_data.handle(info.name, params),
        )
        .await
        {
            Ok(result) => result.map_err(ProviderError::from),
            Err(_) => {
                warn!(method = info.name, "Chain data collaborator timed out");
                Err(ProviderError::timeout(info.name))
            }
        }
    }

    /// Identity-exposing reads answer with an empty default unless the
    /// origin holds a grant.
    async fn identity_read(&self, method: &str, origin: Option<&Origin>) -> Value {
        let accounts = match origin {
            Some(origin) if self.permissions.is_permission_valid(origin).await => {
                Some((origin, self.permissions.accounts_for(origin).await))
            }
            _ => None,
        };

        match (method, accounts) {
            ("eth_accounts", Some((_, accounts))) => json!(accounts),
            ("eth_coinbase", Some((_, accounts))) => json!(accounts.first()),
            ("wallet_getPermissions", Some((origin, accounts))) => json!([{
                "invoker": origin,
                "parentCapability": "eth_accounts",
                "caveats": [{ "type": "restrictReturnedAccounts", "value": accounts }],
            }]),
            ("eth_coinbase", None) => Value::Null,
            _ => json!([]),
        }
    }

    async fn write(
        &self,
        info: &MethodInfo,
        origin: Option<Origin>,
        request: RelayRequest,
    ) -> ProviderResult<Value> {
        // An approval without an origin cannot be attributed to anyone.
        let Some(origin) = origin else {
            warn!(request_id = %request.id, method = info.name, "Write refused without origin");
            return Err(ProviderError::unauthorized());
        };

        validate_params(info.name, &request.params)?;

        if info.traits.account_scoped && !self.permissions.is_permission_valid(&origin).await {
            warn!(
                request_id = %request.id,
                method = info.name,
                origin = %origin,
                "Origin not permitted"
            );
            return Err(ProviderError::unauthorized());
        }

        let ticket = ApprovalTicket::new(request.id, info, request.params, origin.clone());
        let result = self.approvals.submit(ticket).await?;

        if info.traits.reveals_identity {
            if let Ok(accounts) = Vec::<String>::deserialize(&result) {
                self.permissions.grant(&origin, accounts).await;
            }
        }
        if info.traits.revokes_permission {
            self.permissions.revoke(&origin).await;
        }
        Ok(result)
    }

    fn record(&self, method: &str, result: &ProviderResult<Value>, started: Instant) {
        let (method_label, category) = match self.classifier.get(method) {
            Some(info) => (info.name, info.category.as_str()),
            None => ("unknown", "unsupported"),
        };
        metric_inc!(metrics::REQUESTS_TOTAL, &[method_label, category]);
        let outcome = match result {
            Ok(_) => "ok",
            Err(error) => error.kind().as_str(),
        };
        metric_inc!(metrics::REQUEST_OUTCOMES, &[outcome]);
        metric_observe!(
            metrics::REQUEST_DURATION,
            &[category],
            started.elapsed().as_secs_f64()
        );
    }
}
