//! Workflow service - workflow CRUD and the execution stub.
//!
//! There is no execution engine in this service: queueing a run inserts an
//! execution_logs row with status `queued` and returns. Downstream workers
//! pick runs up out of band. Deleting a workflow leaves its execution logs
//! in place as history.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowRow {
    pub workflow_id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub definition: Option<JsonValue>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewWorkflowFields {
    pub client_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub definition: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionLogRow {
    pub execution_id: Uuid,
    pub workflow_id: Uuid,
    pub status: String,
    pub detail: Option<JsonValue>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct WorkflowService {
    pool: PgPool,
}

impl WorkflowService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_workflow(&self, fields: &NewWorkflowFields) -> Result<Uuid> {
        let workflow_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO nexus.workflows (workflow_id, client_id, name, description, definition, status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, 'draft', NOW(), NOW())"#,
        )
        .bind(workflow_id)
        .bind(fields.client_id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.definition)
        .execute(&self.pool)
        .await
        .context("Failed to create workflow")?;
        info!("Created workflow {} for '{}'", workflow_id, fields.name);
        Ok(workflow_id)
    }

    pub async fn get_workflow_by_id(&self, workflow_id: Uuid) -> Result<Option<WorkflowRow>> {
        sqlx::query_as::<_, WorkflowRow>(
            r#"SELECT workflow_id, client_id, name, description, definition, status, created_at, updated_at FROM nexus.workflows WHERE workflow_id = $1"#,
        )
        .bind(workflow_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get workflow by ID")
    }

    pub async fn list_workflows(
        &self,
        client_scope: Option<Uuid>,
        status: Option<&str>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<WorkflowRow>> {
        sqlx::query_as::<_, WorkflowRow>(
            r#"SELECT workflow_id, client_id, name, description, definition, status, created_at, updated_at
               FROM nexus.workflows
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
        .context("Failed to list workflows")
    }

    pub async fn update_workflow(
        &self,
        workflow_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        definition: Option<&JsonValue>,
        status: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE nexus.workflows SET name = COALESCE($1, name), description = COALESCE($2, description), definition = COALESCE($3, definition), status = COALESCE($4, status), updated_at = NOW() WHERE workflow_id = $5"#,
        )
        .bind(name)
        .bind(description)
        .bind(definition)
        .bind(status)
        .bind(workflow_id)
        .execute(&self.pool)
        .await
        .context("Failed to update workflow")?;
        if result.rows_affected() > 0 {
            info!("Updated workflow {}", workflow_id);
        }
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_workflow(&self, workflow_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM nexus.workflows WHERE workflow_id = $1"#)
            .bind(workflow_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete workflow")?;
        if result.rows_affected() > 0 {
            info!("Deleted workflow {}", workflow_id);
        }
        Ok(result.rows_affected() > 0)
    }

    /// Queue a run. Returns the execution id; no engine is invoked here.
    pub async fn queue_execution(
        &self,
        workflow_id: Uuid,
        detail: Option<&JsonValue>,
    ) -> Result<Uuid> {
        let execution_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO nexus.execution_logs (execution_id, workflow_id, status, detail, created_at) VALUES ($1, $2, 'queued', $3, NOW())"#,
        )
        .bind(execution_id)
        .bind(workflow_id)
        .bind(detail)
        .execute(&self.pool)
        .await
        .context("Failed to queue workflow execution")?;
        info!("Queued execution {} for workflow {}", execution_id, workflow_id);
        Ok(execution_id)
    }

    pub async fn list_execution_logs(
        &self,
        workflow_id: Uuid,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<ExecutionLogRow>> {
        sqlx::query_as::<_, ExecutionLogRow>(
            r#"SELECT execution_id, workflow_id, status, detail, created_at FROM nexus.execution_logs WHERE workflow_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"#,
        )
        .bind(workflow_id)
        .bind(limit.unwrap_or(100))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list execution logs")
    }
}
