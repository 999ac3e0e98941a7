//! Agent service - CRUD for configured conversational assistants.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AgentRow {
    pub agent_id: Uuid,
    pub client_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub is_active: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewAgentFields {
    pub client_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
}

#[derive(Clone, Debug)]
pub struct AgentService {
    pool: PgPool,
}

impl AgentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_agent(&self, fields: &NewAgentFields) -> Result<Uuid> {
        let agent_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO nexus.agents (agent_id, client_id, name, description, system_prompt, model, temperature, max_tokens, is_active, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, NOW(), NOW())"#,
        )
        .bind(agent_id)
        .bind(fields.client_id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.system_prompt)
        .bind(&fields.model)
        .bind(fields.temperature)
        .bind(fields.max_tokens)
        .execute(&self.pool)
        .await
        .context("Failed to create agent")?;
        info!("Created agent {} for '{}'", agent_id, fields.name);
        Ok(agent_id)
    }

    pub async fn get_agent_by_id(&self, agent_id: Uuid) -> Result<Option<AgentRow>> {
        sqlx::query_as::<_, AgentRow>(
            r#"SELECT agent_id, client_id, name, description, system_prompt, model, temperature, max_tokens, is_active, created_at, updated_at FROM nexus.agents WHERE agent_id = $1"#,
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get agent by ID")
    }

    pub async fn list_agents(
        &self,
        client_scope: Option<Uuid>,
        active: Option<bool>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<AgentRow>> {
        sqlx::query_as::<_, AgentRow>(
            r#"SELECT agent_id, client_id, name, description, system_prompt, model, temperature, max_tokens, is_active, created_at, updated_at
               FROM nexus.agents
               WHERE ($1::uuid IS NULL OR client_id = $1)
                 AND ($2::bool IS NULL OR is_active = $2)
               ORDER BY created_at DESC LIMIT $3 OFFSET $4"#,
        )
        .bind(client_scope)
        .bind(active)
        .bind(limit.unwrap_or(100))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list agents")
    }

    pub async fn update_agent(
        &self,
        agent_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        system_prompt: Option<&str>,
        model: Option<&str>,
        temperature: Option<f64>,
        max_tokens: Option<i32>,
        is_active: Option<bool>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE nexus.agents SET name = COALESCE($1, name), description = COALESCE($2, description), system_prompt = COALESCE($3, system_prompt), model = COALESCE($4, model), temperature = COALESCE($5, temperature), max_tokens = COALESCE($6, max_tokens), is_active = COALESCE($7, is_active), updated_at = NOW() WHERE agent_id = $8"#,
        )
        .bind(name)
        .bind(description)
        .bind(system_prompt)
        .bind(model)
        .bind(temperature)
        .bind(max_tokens)
        .bind(is_active)
        .bind(agent_id)
        .execute(&self.pool)
        .await
        .context("Failed to update agent")?;
        if result.rows_affected() > 0 {
            info!("Updated agent {}", agent_id);
        }
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_agent(&self, agent_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM nexus.agents WHERE agent_id = $1"#)
            .bind(agent_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete agent")?;
        if result.rows_affected() > 0 {
            info!("Deleted agent {}", agent_id);
        }
        Ok(result.rows_affected() > 0)
    }
}
