//! External secret vault.
//!
//! Credential values never touch the database: each credential field row
//! stores only a vault key, and the value lives in a key-value secret
//! vault reached over HTTP. `SecretStore` is the seam; `VaultClient` talks
//! to the real vault and `MemoryStore` backs tests.

use thiserror::Error;
use uuid::Uuid;

pub mod http;
pub mod memory;

pub use http::VaultClient;
pub use memory::MemoryStore;

/// Errors from the vault integration.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Invalid vault address: {0}")]
    InvalidAddress(#[from] url::ParseError),

    #[error("Missing vault token")]
    MissingToken,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Vault API error: {0}")]
    ApiError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type VaultResult<T> = Result<T, VaultError>;

/// Key-value secret storage seam.
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    async fn put_secret(&self, key: &str, value: &str) -> VaultResult<()>;

    /// Fetch a secret value. `Ok(None)` when the key does not exist.
    async fn get_secret(&self, key: &str) -> VaultResult<Option<String>>;

    /// Remove a secret. Deleting an absent key is not an error.
    async fn delete_secret(&self, key: &str) -> VaultResult<()>;
}

/// Vault key for one credential field.
pub fn field_key(credential_id: Uuid, field_name: &str) -> String {
    format!("credentials/{}/{}", credential_id, field_name)
}

/// Delete every key exactly once, deduplicating first. Returns the number
/// of distinct keys deleted.
pub async fn purge_keys(store: &dyn SecretStore, keys: &[String]) -> VaultResult<usize> {
    let mut distinct: Vec<&String> = keys.iter().collect();
    distinct.sort();
    distinct.dedup();
    for key in &distinct {
        store.delete_secret(key).await?;
    }
    Ok(distinct.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_key_layout_is_stable() {
        let id = Uuid::nil();
        assert_eq!(
            field_key(id, "api_token"),
            "credentials/00000000-0000-0000-0000-000000000000/api_token"
        );
    }

    #[tokio::test]
    async fn purge_deletes_each_key_exactly_once() {
        let store = MemoryStore::new();
        store.put_secret("a", "1").await.unwrap();
        store.put_secret("b", "2").await.unwrap();

        // Duplicate in the input must not produce a second delete.
        let keys = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let deleted = purge_keys(&store, &keys).await.unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(store.get_secret("a").await.unwrap(), None);
        assert_eq!(store.get_secret("b").await.unwrap(), None);
        assert_eq!(store.deletions().await, vec!["a".to_string(), "b".to_string()]);
    }
}
