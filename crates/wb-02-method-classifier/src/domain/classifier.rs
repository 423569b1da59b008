//! Owned method table.

use crate::domain::methods::{MethodCategory, MethodInfo, STANDARD_METHODS};
use shared_types::ProviderError;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct MethodClassifier {
    table: HashMap<&'static str, MethodInfo>,
}

impl MethodClassifier {
    /// Classifier loaded with [`STANDARD_METHODS`].
    pub fn standard() -> Self {
        STANDARD_METHODS
            .iter()
            .copied()
            .fold(Self::empty(), Self::with_method)
    }

    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Add or replace one entry.
    pub fn with_method(mut self, info: MethodInfo) -> Self {
        self.table.insert(info.name, info);
        self
    }

    /// Look up a method. Unknown methods are `unsupported-method` errors.
    pub fn classify(&self, method: &str) -> Result<&MethodInfo, ProviderError> {
        self.table.get(method).ok_or_else(|| {
            debug!(method = %method, "Unsupported method");
            ProviderError::unsupported_method(method)
        })
    }

    pub fn get(&self, method: &str) -> Option<&MethodInfo> {
        self.table.get(method)
    }

    pub fn is_supported(&self, method: &str) -> bool {
        self.table.contains_key(method)
    }

    /// `false` for unknown methods; the backend rejects those anyway.
    pub fn requires_approval(&self, method: &str) -> bool {
        self.get(method).is_some_and(MethodInfo::requires_approval)
    }

    pub fn is_cacheable(&self, method: &str) -> bool {
        self.get(method).is_some_and(|info| info.traits.cacheable)
    }

    /// Sorted names of every method in `category`.
    pub fn methods_in(&self, category: MethodCategory) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .table
            .values()
            .filter(|info| info.category == category)
            .map(|info| info.name)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for MethodClassifier {
    fn default() -> Self {
        Self::standard()
    }
}
