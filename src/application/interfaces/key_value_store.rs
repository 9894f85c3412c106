use async_trait::async_trait;

use crate::domain::DomainError;

/// Small string store keyed by name, used for client-side preferences.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError>;
}
