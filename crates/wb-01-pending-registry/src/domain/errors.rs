use shared_types::{ProviderError, RequestId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An entry with this id is still live.
    #[error("request {0} is already pending")]
    DuplicateId(RequestId),
}

impl From<RegistryError> for ProviderError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateId(id) => ProviderError::internal()
                .with_data(serde_json::json!({ "reason": "duplicate request id", "id": id })),
        }
    }
}
