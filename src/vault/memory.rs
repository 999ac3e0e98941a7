//! In-memory secret store for tests and keyless local development.

use std::collections::HashMap;

use tokio::sync::Mutex;

use super::{SecretStore, VaultResult};

#[derive(Default)]
pub struct MemoryStore {
    secrets: Mutex<HashMap<String, String>>,
    deletions: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delete call observed, in order, including repeats.
    pub async fn deletions(&self) -> Vec<String> {
        self.deletions.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.secrets.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.secrets.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl SecretStore for MemoryStore {
    async fn put_secret(&self, key: &str, value: &str) -> VaultResult<()> {
        self.secrets
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> VaultResult<Option<String>> {
        Ok(self.secrets.lock().await.get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> VaultResult<()> {
        self.deletions.lock().await.push(key.to_string());
        self.secrets.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_cycle() {
        let store = MemoryStore::new();
        store.put_secret("k", "v").await.unwrap();
        assert_eq!(store.get_secret("k").await.unwrap(), Some("v".to_string()));
        store.delete_secret("k").await.unwrap();
        assert_eq!(store.get_secret("k").await.unwrap(), None);
        // Deleting an absent key is not an error.
        store.delete_secret("k").await.unwrap();
        assert_eq!(store.deletions().await.len(), 2);
    }
}
