//! Method-keyed routing across chain-data collaborators.

use crate::ports::{ChainDataError, ChainDataHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Sends each method to the handler registered for it, or to the fallback.
#[derive(Default, Clone)]
pub struct ChainDataRouter {
    routes: HashMap<String, Arc<dyn ChainDataHandler>>,
    fallback: Option<Arc<dyn ChainDataHandler>>,
}

impl ChainDataRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, method: impl Into<String>, handler: Arc<dyn ChainDataHandler>) -> Self {
        self.routes.insert(method.into(), handler);
        self
    }

    pub fn fallback(mut self, handler: Arc<dyn ChainDataHandler>) -> Self {
        self.fallback = Some(handler);
        self
    }
}

#[async_trait]
impl ChainDataHandler for ChainDataRouter {
    async fn handle(&self, method: &str, params: &[Value]) -> Result<Value, ChainDataError> {
        match self.routes.get(method).or(self.fallback.as_ref()) {
            Some(handler) => handler.handle(method, params).await,
            None => Err(ChainDataError::Unsupported(method.to_string())),
        }
    }
}
