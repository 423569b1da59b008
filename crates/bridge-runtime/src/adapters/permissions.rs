use async_trait::async_trait;
use dashmap::DashMap;
use shared_types::Origin;
use tracing::info;
use wb_06_dispatcher::PermissionValidator;

/// Grants held in memory for the life of the process.
#[derive(Default)]
pub struct MemoryPermissionStore {
    grants: DashMap<Origin, Vec<String>>,
}

impl MemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a grant, as if the user had approved it earlier.
    pub fn with_grant(self, origin: Origin, accounts: Vec<String>) -> Self {
        self.grants.insert(origin, accounts);
        self
    }

    pub fn granted_origins(&self) -> Vec<Origin> {
        self.grants.iter().map(|g| g.key().clone()).collect()
    }
}

#[async_trait]
impl PermissionValidator for MemoryPermissionStore {
    async fn is_permission_valid(&self, origin: &Origin) -> bool {
        self.grants.contains_key(origin)
    }

    async fn accounts_for(&self, origin: &Origin) -> Vec<String> {
        self.grants
            .get(origin)
            .map(|g| g.value().clone())
            .unwrap_or_default()
    }

    async fn grant(&self, origin: &Origin, accounts: Vec<String>) {
        info!(origin = %origin, accounts = accounts.len(), "Permission granted");
        self.grants.insert(origin.clone(), accounts);
    }

    async fn revoke(&self, origin: &Origin) {
        if self.grants.remove(origin).is_some() {
            info!(origin = %origin, "Permission revoked");
        }
    }
}
