//! Client, user, and profile services.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientRow {
    pub client_id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub status: String,
    pub plan_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewClientFields {
    pub name: String,
    pub contact_email: Option<String>,
    pub plan_id: Option<Uuid>,
}

/// Login row. Role is `admin` or `member`; members carry a client scope.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub client_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub profile_id: Uuid,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub title: Option<String>,
    pub timezone: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct ClientService {
    pool: PgPool,
}

impl ClientService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create_client(&self, fields: &NewClientFields) -> Result<Uuid> {
        let client_id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO nexus.clients (client_id, name, contact_email, status, plan_id, created_at, updated_at) VALUES ($1, $2, $3, 'active', $4, NOW(), NOW())"#,
        )
        .bind(client_id)
        .bind(&fields.name)
        .bind(&fields.contact_email)
        .bind(fields.plan_id)
        .execute(&self.pool)
        .await
        .context("Failed to create client")?;
        info!("Created client {} for '{}'", client_id, fields.name);
        Ok(client_id)
    }

    pub async fn get_client_by_id(&self, client_id: Uuid) -> Result<Option<ClientRow>> {
        sqlx::query_as::<_, ClientRow>(
            r#"SELECT client_id, name, contact_email, status, plan_id, created_at, updated_at FROM nexus.clients WHERE client_id = $1"#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get client by ID")
    }

    pub async fn list_clients(
        &self,
        status: Option<&str>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<ClientRow>> {
        sqlx::query_as::<_, ClientRow>(
            r#"SELECT client_id, name, contact_email, status, plan_id, created_at, updated_at FROM nexus.clients WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at DESC LIMIT $2 OFFSET $3"#,
        )
        .bind(status)
        .bind(limit.unwrap_or(100))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list clients")
    }

    pub async fn update_client(
        &self,
        client_id: Uuid,
        name: Option<&str>,
        contact_email: Option<&str>,
        status: Option<&str>,
        plan_id: Option<Uuid>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE nexus.clients SET name = COALESCE($1, name), contact_email = COALESCE($2, contact_email), status = COALESCE($3, status), plan_id = COALESCE($4, plan_id), updated_at = NOW() WHERE client_id = $5"#,
        )
        .bind(name)
        .bind(contact_email)
        .bind(status)
        .bind(plan_id)
        .bind(client_id)
        .execute(&self.pool)
        .await
        .context("Failed to update client")?;
        if result.rows_affected() > 0 {
            info!("Updated client {}", client_id);
        }
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_client(&self, client_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM nexus.clients WHERE client_id = $1"#)
            .bind(client_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete client")?;
        if result.rows_affected() > 0 {
            info!("Deleted client {}", client_id);
        }
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        sqlx::query_as::<_, UserRow>(
            r#"SELECT user_id, email, role, client_id, is_active FROM nexus.users WHERE email = $1 AND is_active = true"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get user by email")
    }

    pub async fn touch_last_login(&self, user_id: Uuid) -> Result<()> {
        sqlx::query(r#"UPDATE nexus.users SET last_login_at = NOW() WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to record login time")?;
        Ok(())
    }

    pub async fn upsert_profile(
        &self,
        user_id: Uuid,
        display_name: Option<&str>,
        title: Option<&str>,
        timezone: Option<&str>,
    ) -> Result<Uuid> {
        let profile_id = Uuid::new_v4();
        let row: (Uuid,) = sqlx::query_as(
            r#"INSERT INTO nexus.profiles (profile_id, user_id, display_name, title, timezone, updated_at)
               VALUES ($1, $2, $3, $4, $5, NOW())
               ON CONFLICT (user_id) DO UPDATE SET
                 display_name = COALESCE(EXCLUDED.display_name, nexus.profiles.display_name),
                 title = COALESCE(EXCLUDED.title, nexus.profiles.title),
                 timezone = COALESCE(EXCLUDED.timezone, nexus.profiles.timezone),
                 updated_at = NOW()
               RETURNING profile_id"#,
        )
        .bind(profile_id)
        .bind(user_id)
        .bind(display_name)
        .bind(title)
        .bind(timezone)
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert profile")?;
        Ok(row.0)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<ProfileRow>> {
        sqlx::query_as::<_, ProfileRow>(
            r#"SELECT profile_id, user_id, display_name, title, timezone, updated_at FROM nexus.profiles WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get profile")
    }
}
