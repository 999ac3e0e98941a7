//! Proposal service - generated proposals and their rendered documents.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProposalRow {
    pub proposal_id: Uuid,
    pub client_id: Uuid,
    pub pipeline_group: Option<Uuid>,
    pub title: String,
    pub body_markdown: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub document_id: Uuid,
    pub proposal_id: Uuid,
    pub kind: String,
    pub file_name: String,
    pub storage_path: String,
    pub byte_size: i64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewProposalFields {
    pub client_id: Uuid,
    pub pipeline_group: Option<Uuid>,
    pub title: String,
    pub body_markdown: String,
}

#[derive(Clone, Debug)]
pub struct ProposalService {
    pool: PgPool,
}

impl ProposalService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_proposal(&self, fields: &NewProposalFields) -> Result<Uuid> {
        let proposal_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO nexus.proposals (proposal_id, client_id, pipeline_group, title, body_markdown, status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, 'draft', NOW(), NOW())"#,
        )
        .bind(proposal_id)
        .bind(fields.client_id)
        .bind(fields.pipeline_group)
        .bind(&fields.title)
        .bind(&fields.body_markdown)
        .execute(&self.pool)
        .await
        .context("Failed to create proposal")?;
        info!("Created proposal {} for client {}", proposal_id, fields.client_id);
        Ok(proposal_id)
    }

    pub async fn get_proposal_by_id(&self, proposal_id: Uuid) -> Result<Option<ProposalRow>> {
        sqlx::query_as::<_, ProposalRow>(
            r#"SELECT proposal_id, client_id, pipeline_group, title, body_markdown, status, created_at, updated_at FROM nexus.proposals WHERE proposal_id = $1"#,
        )
        .bind(proposal_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get proposal by ID")
    }

    pub async fn list_proposals(
        &self,
        client_scope: Option<Uuid>,
        status: Option<&str>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<ProposalRow>> {
        sqlx::query_as::<_, ProposalRow>(
            r#"SELECT proposal_id, client_id, pipeline_group, title, body_markdown, status, created_at, updated_at
               FROM nexus.proposals
               WHERE ($1::uuid IS NULL OR client_id = $1)
                 AND ($2::text IS NULL OR status = $2)
               ORDER BY created_at DESC LIMIT $3 OFFSET $4"#,
        )
        .bind(client_scope)
        .bind(status)
        .bind(limit.unwrap_or(100))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list proposals")
    }

    pub async fn update_status(&self, proposal_id: Uuid, status: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE nexus.proposals SET status = $1, updated_at = NOW() WHERE proposal_id = $2"#,
        )
        .bind(status)
        .bind(proposal_id)
        .execute(&self.pool)
        .await
        .context("Failed to update proposal status")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn record_document(
        &self,
        proposal_id: Uuid,
        kind: &str,
        file_name: &str,
        storage_path: &str,
        byte_size: i64,
    ) -> Result<Uuid> {
        let document_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO nexus.documents (document_id, proposal_id, kind, file_name, storage_path, byte_size, created_at) VALUES ($1, $2, $3, $4, $5, $6, NOW())"#,
        )
        .bind(document_id)
        .bind(proposal_id)
        .bind(kind)
        .bind(file_name)
        .bind(storage_path)
        .bind(byte_size)
        .execute(&self.pool)
        .await
        .context("Failed to record document")?;
        info!("Recorded document {} for proposal {}", document_id, proposal_id);
        Ok(document_id)
    }

    pub async fn list_documents(&self, proposal_id: Uuid) -> Result<Vec<DocumentRow>> {
        sqlx::query_as::<_, DocumentRow>(
            r#"SELECT document_id, proposal_id, kind, file_name, storage_path, byte_size, created_at FROM nexus.documents WHERE proposal_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(proposal_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list documents")
    }
}
