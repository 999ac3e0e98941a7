//! HTTP client for a KV-v2 style secret vault.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};
use url::Url;

use super::{SecretStore, VaultError, VaultResult};

#[derive(Debug, Clone)]
pub struct VaultClient {
    client: Client,
    base: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ReadResponse {
    data: ReadData,
}

#[derive(Debug, Deserialize)]
struct ReadData {
    data: SecretPayload,
}

#[derive(Debug, Deserialize)]
struct SecretPayload {
    value: String,
}

impl VaultClient {
    pub fn new(addr: &str, token: &str) -> VaultResult<Self> {
        if token.is_empty() {
            return Err(VaultError::MissingToken);
        }
        let base = Url::parse(addr)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(VaultError::HttpError)?;
        Ok(Self {
            client,
            base,
            token: token.to_string(),
        })
    }

    fn data_url(&self, key: &str) -> VaultResult<Url> {
        Ok(self.base.join(&format!("v1/secret/data/{}", key))?)
    }

    fn metadata_url(&self, key: &str) -> VaultResult<Url> {
        Ok(self.base.join(&format!("v1/secret/metadata/{}", key))?)
    }
}

#[async_trait::async_trait]
impl SecretStore for VaultClient {
    async fn put_secret(&self, key: &str, value: &str) -> VaultResult<()> {
        let url = self.data_url(key)?;
        debug!("Writing vault key {}", key);
        let response = self
            .client
            .post(url)
            .header("X-Vault-Token", &self.token)
            .json(&json!({ "data": { "value": value } }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Vault write failed for {}: {} {}", key, status, body);
            return Err(VaultError::ApiError(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> VaultResult<Option<String>> {
        let url = self.data_url(key)?;
        let response = self
            .client
            .get(url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VaultError::ApiError(format!("HTTP {}: {}", status, body)));
        }
        let parsed: ReadResponse = serde_json::from_str(&response.text().await?)?;
        Ok(Some(parsed.data.data.value))
    }

    async fn delete_secret(&self, key: &str) -> VaultResult<()> {
        // Metadata delete removes all versions of the key.
        let url = self.metadata_url(key)?;
        debug!("Deleting vault key {}", key);
        let response = self
            .client
            .delete(url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Vault delete failed for {}: {} {}", key, status, body);
            return Err(VaultError::ApiError(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_requires_token_and_valid_address() {
        assert!(matches!(
            VaultClient::new("http://127.0.0.1:8200", ""),
            Err(VaultError::MissingToken)
        ));
        assert!(matches!(
            VaultClient::new("not a url", "tok"),
            Err(VaultError::InvalidAddress(_))
        ));
        assert!(VaultClient::new("http://127.0.0.1:8200", "tok").is_ok());
    }

    #[test]
    fn urls_follow_kv_v2_layout() {
        let client = VaultClient::new("http://127.0.0.1:8200", "tok").unwrap();
        assert_eq!(
            client.data_url("credentials/abc/token").unwrap().as_str(),
            "http://127.0.0.1:8200/v1/secret/data/credentials/abc/token"
        );
        assert_eq!(
            client.metadata_url("credentials/abc/token").unwrap().as_str(),
            "http://127.0.0.1:8200/v1/secret/metadata/credentials/abc/token"
        );
    }
}
