//! Exception service - workflow failure records and their resolution.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowExceptionRow {
    pub exception_id: Uuid,
    pub workflow_id: Uuid,
    pub message: String,
    pub detail: Option<JsonValue>,
    pub resolved: Option<bool>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct ExceptionService {
    pool: PgPool,
}

impl ExceptionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record_exception(
        &self,
        workflow_id: Uuid,
        message: &str,
        detail: Option<&JsonValue>,
    ) -> Result<Uuid> {
        let exception_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO nexus.workflow_exceptions (exception_id, workflow_id, message, detail, resolved, created_at) VALUES ($1, $2, $3, $4, false, NOW())"#,
        )
        .bind(exception_id)
        .bind(workflow_id)
        .bind(message)
        .bind(detail)
        .execute(&self.pool)
        .await
        .context("Failed to record workflow exception")?;
        info!("Recorded exception {} for workflow {}", exception_id, workflow_id);
        Ok(exception_id)
    }

    pub async fn get_exception_by_id(
        &self,
        exception_id: Uuid,
    ) -> Result<Option<WorkflowExceptionRow>> {
        sqlx::query_as::<_, WorkflowExceptionRow>(
            r#"SELECT exception_id, workflow_id, message, detail, resolved, resolved_by, resolved_at, created_at FROM nexus.workflow_exceptions WHERE exception_id = $1"#,
        )
        .bind(exception_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get exception by ID")
    }

    /// List exceptions, optionally narrowed to a workflow or unresolved only.
    pub async fn list_exceptions(
        &self,
        workflow_id: Option<Uuid>,
        resolved: Option<bool>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<WorkflowExceptionRow>> {
        sqlx::query_as::<_, WorkflowExceptionRow>(
            r#"SELECT exception_id, workflow_id, message, detail, resolved, resolved_by, resolved_at, created_at
               FROM nexus.workflow_exceptions
               WHERE ($1::uuid IS NULL OR workflow_id = $1)
                 AND ($2::bool IS NULL OR resolved = $2)
               ORDER BY created_at DESC LIMIT $3 OFFSET $4"#,
        )
        .bind(workflow_id)
        .bind(resolved)
        .bind(limit.unwrap_or(100))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list workflow exceptions")
    }

    pub async fn resolve_exception(&self, exception_id: Uuid, resolved_by: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE nexus.workflow_exceptions SET resolved = true, resolved_by = $1, resolved_at = NOW() WHERE exception_id = $2 AND resolved = false"#,
        )
        .bind(resolved_by)
        .bind(exception_id)
        .execute(&self.pool)
        .await
        .context("Failed to resolve workflow exception")?;
        if result.rows_affected() > 0 {
            info!("Resolved exception {}", exception_id);
        }
        Ok(result.rows_affected() > 0)
    }
}
