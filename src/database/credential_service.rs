//! Credential service - credential bundles whose values live in the vault.
//!
//! Rows store only field names and vault keys. Every write path that
//! touches a value goes through the `SecretStore` seam, and deletion purges
//! each vault key exactly once before the rows go.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::vault::{self, SecretStore};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CredentialRow {
    pub credential_id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub service_type: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Field row: the value itself is only in the vault.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CredentialFieldRow {
    pub field_id: Uuid,
    pub credential_id: Uuid,
    pub field_name: String,
    pub vault_key: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewCredentialFields {
    pub client_id: Uuid,
    pub name: String,
    pub service_type: String,
    /// (field_name, secret_value) pairs.
    pub fields: Vec<(String, String)>,
}

#[derive(Clone, Debug)]
pub struct CredentialService {
    pool: PgPool,
}

impl CredentialService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_credential(
        &self,
        store: &dyn SecretStore,
        fields: &NewCredentialFields,
    ) -> Result<Uuid> {
        let credential_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO nexus.credentials (credential_id, client_id, name, service_type, created_at, updated_at) VALUES ($1, $2, $3, $4, NOW(), NOW())"#,
        )
        .bind(credential_id)
        .bind(fields.client_id)
        .bind(&fields.name)
        .bind(&fields.service_type)
        .execute(&self.pool)
        .await
        .context("Failed to create credential")?;

        for (field_name, value) in &fields.fields {
            let vault_key = vault::field_key(credential_id, field_name);
            store
                .put_secret(&vault_key, value)
                .await
                .with_context(|| format!("Failed to vault field '{}'", field_name))?;
            sqlx::query(
                r#"INSERT INTO nexus.credential_fields (field_id, credential_id, field_name, vault_key, created_at) VALUES ($1, $2, $3, $4, NOW())"#,
            )
            .bind(Uuid::new_v4())
            .bind(credential_id)
            .bind(field_name)
            .bind(&vault_key)
            .execute(&self.pool)
            .await
            .context("Failed to create credential field")?;
        }

        info!(
            "Created credential {} ('{}', {} fields)",
            credential_id,
            fields.name,
            fields.fields.len()
        );
        Ok(credential_id)
    }

    pub async fn get_credential_by_id(&self, credential_id: Uuid) -> Result<Option<CredentialRow>> {
        sqlx::query_as::<_, CredentialRow>(
            r#"SELECT credential_id, client_id, name, service_type, created_at, updated_at FROM nexus.credentials WHERE credential_id = $1"#,
        )
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get credential by ID")
    }

    pub async fn list_credentials(
        &self,
        client_scope: Option<Uuid>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<CredentialRow>> {
        sqlx::query_as::<_, CredentialRow>(
            r#"SELECT credential_id, client_id, name, service_type, created_at, updated_at
               FROM nexus.credentials
               WHERE ($1::uuid IS NULL OR client_id = $1)
               ORDER BY created_at DESC LIMIT $2 OFFSET $3"#,
        )
        .bind(client_scope)
        .bind(limit.unwrap_or(100))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list credentials")
    }

    /// Field rows only: names and vault keys, never values.
    pub async fn list_fields(&self, credential_id: Uuid) -> Result<Vec<CredentialFieldRow>> {
        sqlx::query_as::<_, CredentialFieldRow>(
            r#"SELECT field_id, credential_id, field_name, vault_key, created_at FROM nexus.credential_fields WHERE credential_id = $1 ORDER BY field_name"#,
        )
        .bind(credential_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list credential fields")
    }

    /// Fetch one field's value from the vault.
    pub async fn reveal_field(
        &self,
        store: &dyn SecretStore,
        credential_id: Uuid,
        field_name: &str,
    ) -> Result<Option<String>> {
        let field = sqlx::query_as::<_, CredentialFieldRow>(
            r#"SELECT field_id, credential_id, field_name, vault_key, created_at FROM nexus.credential_fields WHERE credential_id = $1 AND field_name = $2"#,
        )
        .bind(credential_id)
        .bind(field_name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up credential field")?;

        match field {
            Some(field) => store
                .get_secret(&field.vault_key)
                .await
                .context("Failed to read vaulted value"),
            None => Ok(None),
        }
    }

    /// Delete a credential: purge every vault key exactly once, then the
    /// field rows, then the parent. Returns false when the credential does
    /// not exist (nothing is purged in that case).
    pub async fn delete_credential(
        &self,
        store: &dyn SecretStore,
        credential_id: Uuid,
    ) -> Result<bool> {
        if self.get_credential_by_id(credential_id).await?.is_none() {
            return Ok(false);
        }

        let keys: Vec<String> = self
            .list_fields(credential_id)
            .await?
            .into_iter()
            .map(|f| f.vault_key)
            .collect();
        let purged = vault::purge_keys(store, &keys)
            .await
            .context("Failed to purge vault keys")?;

        sqlx::query(r#"DELETE FROM nexus.credential_fields WHERE credential_id = $1"#)
            .bind(credential_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete credential fields")?;
        let result = sqlx::query(r#"DELETE FROM nexus.credentials WHERE credential_id = $1"#)
            .bind(credential_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete credential")?;

        info!(
            "Deleted credential {} ({} vault keys purged)",
            credential_id, purged
        );
        Ok(result.rows_affected() > 0)
    }
}
