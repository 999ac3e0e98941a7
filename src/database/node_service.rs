//! Node service - CRUD for reusable scripted workflow units.
//!
//! A node with a NULL client_id is shared: visible to every tenant but only
//! editable by admins.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NodeRow {
    pub node_id: Uuid,
    pub client_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub language: String,
    pub script: String,
    pub input_schema: Option<JsonValue>,
    pub output_schema: Option<JsonValue>,
    pub is_active: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewNodeFields {
    pub client_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub language: String,
    pub script: String,
    pub input_schema: Option<JsonValue>,
    pub output_schema: Option<JsonValue>,
}

#[derive(Clone, Debug)]
pub struct NodeService {
    pool: PgPool,
}

impl NodeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_node(&self, fields: &NewNodeFields) -> Result<Uuid> {
        let node_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO nexus.nodes (node_id, client_id, name, description, language, script, input_schema, output_schema, is_active, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, NOW(), NOW())"#,
        )
        .bind(node_id)
        .bind(fields.client_id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.language)
        .bind(&fields.script)
        .bind(&fields.input_schema)
        .bind(&fields.output_schema)
        .execute(&self.pool)
        .await
        .context("Failed to create node")?;
        info!("Created node {} for '{}'", node_id, fields.name);
        Ok(node_id)
    }

    pub async fn get_node_by_id(&self, node_id: Uuid) -> Result<Option<NodeRow>> {
        sqlx::query_as::<_, NodeRow>(
            r#"SELECT node_id, client_id, name, description, language, script, input_schema, output_schema, is_active, created_at, updated_at FROM nexus.nodes WHERE node_id = $1"#,
        )
        .bind(node_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get node by ID")
    }

    /// List nodes. A NULL scope means unfiltered (admin); a concrete scope
    /// sees its own nodes plus shared ones.
    pub async fn list_nodes(
        &self,
        client_scope: Option<Uuid>,
        active: Option<bool>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<NodeRow>> {
        sqlx::query_as::<_, NodeRow>(
            r#"SELECT node_id, client_id, name, description, language, script, input_schema, output_schema, is_active, created_at, updated_at
               FROM nexus.nodes
               WHERE ($1::uuid IS NULL OR client_id = $1 OR client_id IS NULL)
                 AND ($2::bool IS NULL OR is_active = $2)
               ORDER BY created_at DESC LIMIT $3 OFFSET $4"#,
        )
        .bind(client_scope)
        .bind(active)
        .bind(limit.unwrap_or(100))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list nodes")
    }

    pub async fn update_node(
        &self,
        node_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        script: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE nexus.nodes SET name = COALESCE($1, name), description = COALESCE($2, description), script = COALESCE($3, script), is_active = COALESCE($4, is_active), updated_at = NOW() WHERE node_id = $5"#,
        )
        .bind(name)
        .bind(description)
        .bind(script)
        .bind(is_active)
        .bind(node_id)
        .execute(&self.pool)
        .await
        .context("Failed to update node")?;
        if result.rows_affected() > 0 {
            info!("Updated node {}", node_id);
        }
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_node(&self, node_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM nexus.nodes WHERE node_id = $1"#)
            .bind(node_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete node")?;
        if result.rows_affected() > 0 {
            info!("Deleted node {}", node_id);
        }
        Ok(result.rows_affected() > 0)
    }
}
