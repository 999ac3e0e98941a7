//! Survey service - onboarding survey responses and their analysis.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SurveyResponseRow {
    pub survey_id: Uuid,
    pub client_id: Uuid,
    pub answers: JsonValue,
    pub analysis: Option<String>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct SurveyService {
    pool: PgPool,
}

impl SurveyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_response(&self, client_id: Uuid, answers: &JsonValue) -> Result<Uuid> {
        let survey_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO nexus.survey_responses (survey_id, client_id, answers, created_at) VALUES ($1, $2, $3, NOW())"#,
        )
        .bind(survey_id)
        .bind(client_id)
        .bind(answers)
        .execute(&self.pool)
        .await
        .context("Failed to create survey response")?;
        info!("Recorded survey response {} for client {}", survey_id, client_id);
        Ok(survey_id)
    }

    pub async fn get_response_by_id(&self, survey_id: Uuid) -> Result<Option<SurveyResponseRow>> {
        sqlx::query_as::<_, SurveyResponseRow>(
            r#"SELECT survey_id, client_id, answers, analysis, analyzed_at, created_at FROM nexus.survey_responses WHERE survey_id = $1"#,
        )
        .bind(survey_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get survey response by ID")
    }

    /// List responses. A NULL scope is the unfiltered admin view.
    pub async fn list_responses(
        &self,
        client_scope: Option<Uuid>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<SurveyResponseRow>> {
        sqlx::query_as::<_, SurveyResponseRow>(
            r#"SELECT survey_id, client_id, answers, analysis, analyzed_at, created_at
               FROM nexus.survey_responses
               WHERE ($1::uuid IS NULL OR client_id = $1)
               ORDER BY created_at DESC LIMIT $2 OFFSET $3"#,
        )
        .bind(client_scope)
        .bind(limit.unwrap_or(100))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list survey responses")
    }

    /// Store the model's analysis text for a response.
    pub async fn record_analysis(&self, survey_id: Uuid, analysis: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE nexus.survey_responses SET analysis = $1, analyzed_at = NOW() WHERE survey_id = $2"#,
        )
        .bind(analysis)
        .bind(survey_id)
        .execute(&self.pool)
        .await
        .context("Failed to record survey analysis")?;
        if result.rows_affected() > 0 {
            info!("Stored analysis for survey {}", survey_id);
        }
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_response(&self, survey_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM nexus.survey_responses WHERE survey_id = $1"#)
            .bind(survey_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete survey response")?;
        Ok(result.rows_affected() > 0)
    }
}
