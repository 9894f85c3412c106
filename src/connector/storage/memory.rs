//! In-memory key/value storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::KeyValueStore;
use crate::domain::DomainError;

/// Volatile store for tests and throwaway sessions.
#[derive(Default, Clone)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DomainError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", "one").await.unwrap();
        store.set("k", "two").await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = InMemoryKeyValueStore::new();
        let other = store.clone();
        store.set("k", "v").await.unwrap();
        assert_eq!(other.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
