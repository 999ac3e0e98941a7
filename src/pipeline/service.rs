//! Database-backed pipeline progress operations.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{ProgressEntry, StepCatalog, StepStatus, StepView};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgressRow {
    pub progress_id: Uuid,
    pub client_id: Uuid,
    pub pipeline_group: Uuid,
    pub step_order: i32,
    pub step_name: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Full pipeline view for one client and group.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub client_id: Uuid,
    pub pipeline_group: Uuid,
    pub steps: Vec<StepView>,
    pub current_step: Option<String>,
    pub percent_complete: i32,
}

/// Result of an advance call.
#[derive(Debug, Clone, Serialize)]
pub struct AdvanceOutcome {
    /// True when every catalog step was already completed; nothing written.
    pub complete: bool,
    pub step: Option<StepView>,
}

#[derive(Clone, Debug)]
pub struct PipelineService {
    pool: PgPool,
}

impl PipelineService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_rows(&self, client_id: Uuid, pipeline_group: Uuid) -> Result<Vec<ProgressRow>> {
        sqlx::query_as::<_, ProgressRow>(
            r#"SELECT progress_id, client_id, pipeline_group, step_order, step_name, status, created_at, updated_at, completed_at
               FROM nexus.pipeline_progress
               WHERE client_id = $1 AND pipeline_group = $2
               ORDER BY step_order"#,
        )
        .bind(client_id)
        .bind(pipeline_group)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load pipeline progress")
    }

    /// Catalog overlaid with the client's progress rows. Steps with no row
    /// are implicitly pending.
    pub async fn status(
        &self,
        catalog: &StepCatalog,
        client_id: Uuid,
        pipeline_group: Uuid,
    ) -> Result<PipelineStatus> {
        let entries = self.entries(client_id, pipeline_group).await?;
        let steps = catalog.overlay(&entries);
        let current_step = catalog.next_actionable(&entries).map(|t| t.step_name);
        let percent_complete = catalog.percent_complete(&entries);
        Ok(PipelineStatus {
            client_id,
            pipeline_group,
            steps,
            current_step,
            percent_complete,
        })
    }

    /// The advance-pipeline operation: find the lowest-order step whose row
    /// (if any) is not completed, then insert or update it with the given
    /// status.
    ///
    /// At-least-once and unsynchronized: two concurrent advances for the
    /// same client/group can both act on the same step. The expected call
    /// pattern is one admin clicking through steps sequentially.
    pub async fn advance(
        &self,
        catalog: &StepCatalog,
        client_id: Uuid,
        pipeline_group: Uuid,
        status: StepStatus,
    ) -> Result<AdvanceOutcome> {
        let entries = self.entries(client_id, pipeline_group).await?;
        let target = match catalog.next_actionable(&entries) {
            Some(target) => target,
            None => {
                info!(
                    "Pipeline already complete for client {} group {}",
                    client_id, pipeline_group
                );
                return Ok(AdvanceOutcome {
                    complete: true,
                    step: None,
                });
            }
        };

        if target.has_row {
            sqlx::query(
                r#"UPDATE nexus.pipeline_progress
                   SET status = $1,
                       updated_at = NOW(),
                       completed_at = CASE WHEN $1 = 'completed' THEN NOW() ELSE completed_at END
                   WHERE client_id = $2 AND pipeline_group = $3 AND step_order = $4"#,
            )
            .bind(status.as_str())
            .bind(client_id)
            .bind(pipeline_group)
            .bind(target.step_order)
            .execute(&self.pool)
            .await
            .context("Failed to update pipeline progress")?;
        } else {
            sqlx::query(
                r#"INSERT INTO nexus.pipeline_progress
                     (progress_id, client_id, pipeline_group, step_order, step_name, status, created_at, updated_at, completed_at)
                   VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW(),
                           CASE WHEN $6 = 'completed' THEN NOW() ELSE NULL END)"#,
            )
            .bind(Uuid::new_v4())
            .bind(client_id)
            .bind(pipeline_group)
            .bind(target.step_order)
            .bind(&target.step_name)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to insert pipeline progress")?;
        }

        info!(
            "Advanced pipeline for client {} group {}: step '{}' -> {}",
            client_id, pipeline_group, target.step_name, status
        );
        Ok(AdvanceOutcome {
            complete: false,
            step: Some(StepView {
                step_order: target.step_order,
                step_name: target.step_name,
                status,
            }),
        })
    }

    /// Start a fresh run. Progress rows are created lazily, so a restart is
    /// just a new group id; old rows stay as history.
    pub fn restart(&self, client_id: Uuid) -> Uuid {
        let pipeline_group = Uuid::new_v4();
        info!(
            "Restarted pipeline for client {}: new group {}",
            client_id, pipeline_group
        );
        pipeline_group
    }

    async fn entries(&self, client_id: Uuid, pipeline_group: Uuid) -> Result<Vec<ProgressEntry>> {
        Ok(self
            .load_rows(client_id, pipeline_group)
            .await?
            .iter()
            .map(|row| ProgressEntry {
                step_order: row.step_order,
                status: StepStatus::parse_lossy(&row.status),
            })
            .collect())
    }
}
