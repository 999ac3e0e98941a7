//! Plan service - billing plans.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanRow {
    pub plan_id: Uuid,
    pub name: String,
    pub monthly_price: Decimal,
    pub features: Option<JsonValue>,
    pub is_active: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewPlanFields {
    pub name: String,
    pub monthly_price: Decimal,
    pub features: Option<JsonValue>,
}

#[derive(Clone, Debug)]
pub struct PlanService {
    pool: PgPool,
}

impl PlanService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_plan(&self, fields: &NewPlanFields) -> Result<Uuid> {
        let plan_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO nexus.plans (plan_id, name, monthly_price, features, is_active, created_at, updated_at) VALUES ($1, $2, $3, $4, true, NOW(), NOW())"#,
        )
        .bind(plan_id)
        .bind(&fields.name)
        .bind(fields.monthly_price)
        .bind(&fields.features)
        .execute(&self.pool)
        .await
        .context("Failed to create plan")?;
        info!("Created plan {} ('{}')", plan_id, fields.name);
        Ok(plan_id)
    }

    pub async fn get_plan_by_id(&self, plan_id: Uuid) -> Result<Option<PlanRow>> {
        sqlx::query_as::<_, PlanRow>(
            r#"SELECT plan_id, name, monthly_price, features, is_active, created_at, updated_at FROM nexus.plans WHERE plan_id = $1"#,
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get plan by ID")
    }

    pub async fn list_plans(&self, active: Option<bool>) -> Result<Vec<PlanRow>> {
        sqlx::query_as::<_, PlanRow>(
            r#"SELECT plan_id, name, monthly_price, features, is_active, created_at, updated_at FROM nexus.plans WHERE ($1::bool IS NULL OR is_active = $1) ORDER BY monthly_price"#,
        )
        .bind(active)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list plans")
    }

    pub async fn update_plan(
        &self,
        plan_id: Uuid,
        name: Option<&str>,
        monthly_price: Option<Decimal>,
        features: Option<&JsonValue>,
        is_active: Option<bool>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE nexus.plans SET name = COALESCE($1, name), monthly_price = COALESCE($2, monthly_price), features = COALESCE($3, features), is_active = COALESCE($4, is_active), updated_at = NOW() WHERE plan_id = $5"#,
        )
        .bind(name)
        .bind(monthly_price)
        .bind(features)
        .bind(is_active)
        .bind(plan_id)
        .execute(&self.pool)
        .await
        .context("Failed to update plan")?;
        if result.rows_affected() > 0 {
            info!("Updated plan {}", plan_id);
        }
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_plan(&self, plan_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM nexus.plans WHERE plan_id = $1"#)
            .bind(plan_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete plan")?;
        Ok(result.rows_affected() > 0)
    }
}
