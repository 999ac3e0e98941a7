//! Credential routes.
//!
//! Values are write-only through this surface except for the explicit
//! admin-gated reveal endpoint; everything else returns field names and
//! vault keys only.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::credential_service::{
    CredentialFieldRow, CredentialRow, NewCredentialFields,
};
use crate::database::CredentialService;

use super::auth::{ensure_client_access, require_admin, resolve_client_scope, Identity, Role};
use super::{AppState, ListQuery, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct CreateCredentialRequest {
    pub client_id: Option<Uuid>,
    pub name: String,
    pub service_type: String,
    /// field name -> secret value; values go straight to the vault.
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct CredentialDetailResponse {
    pub credential: CredentialRow,
    pub fields: Vec<CredentialFieldRow>,
}

#[derive(Debug, Serialize)]
pub struct RevealResponse {
    pub field_name: String,
    pub value: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/credentials", get(list_credentials).post(create_credential))
        .route(
            "/api/credentials/:credential_id",
            get(get_credential).delete(delete_credential),
        )
        .route(
            "/api/credentials/:credential_id/fields/:field_name/reveal",
            get(reveal_field),
        )
}

async fn create_credential(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateCredentialRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    if request.name.is_empty() {
        return Err(super::missing_field("name"));
    }
    if request.fields.is_empty() {
        return Err(super::missing_field("fields"));
    }

    let client_id = match identity.role {
        Role::Admin => request
            .client_id
            .ok_or_else(|| super::missing_field("client_id"))?,
        Role::Member => resolve_client_scope(&identity, request.client_id)?.ok_or_else(|| {
            (
                StatusCode::FORBIDDEN,
                "No client scope for this account".to_string(),
            )
        })?,
    };

    let service = CredentialService::new(state.pool.clone());
    let credential_id = service
        .create_credential(
            state.secrets.as_ref(),
            &NewCredentialFields {
                client_id,
                name: request.name,
                service_type: request.service_type,
                fields: request.fields.into_iter().collect(),
            },
        )
        .await
        .map_err(|e| {
            tracing::error!("Create credential error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Credential creation failed".to_string(),
            )
        })?;

    Ok(Json(SuccessResponse::with_id(
        "Credential created",
        credential_id,
    )))
}

async fn list_credentials(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CredentialRow>>, (StatusCode, String)> {
    let scope = resolve_client_scope(&identity, query.client_id)?;
    let service = CredentialService::new(state.pool.clone());
    let credentials = service
        .list_credentials(scope, query.limit, query.offset)
        .await
        .map_err(|e| {
            tracing::error!("List credentials error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(credentials))
}

async fn get_credential(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(credential_id): Path<Uuid>,
) -> Result<Json<CredentialDetailResponse>, (StatusCode, String)> {
    let service = CredentialService::new(state.pool.clone());
    let credential = load_credential(&service, credential_id).await?;
    ensure_client_access(&identity, Some(credential.client_id))?;

    let fields = service.list_fields(credential_id).await.map_err(|e| {
        tracing::error!("List credential fields error: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database error".to_string(),
        )
    })?;
    Ok(Json(CredentialDetailResponse { credential, fields }))
}

/// Fetch one vaulted value. Admin only; members never see values.
async fn reveal_field(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path((credential_id, field_name)): Path<(Uuid, String)>,
) -> Result<Json<RevealResponse>, (StatusCode, String)> {
    require_admin(&identity)?;

    let service = CredentialService::new(state.pool.clone());
    load_credential(&service, credential_id).await?;

    let value = service
        .reveal_field(state.secrets.as_ref(), credential_id, &field_name)
        .await
        .map_err(|e| {
            tracing::error!("Reveal field error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Vault error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Field not found".to_string()))?;

    Ok(Json(RevealResponse { field_name, value }))
}

/// Delete the credential and purge its vault keys.
async fn delete_credential(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(credential_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    let service = CredentialService::new(state.pool.clone());
    let credential = load_credential(&service, credential_id).await?;
    ensure_client_access(&identity, Some(credential.client_id))?;

    let deleted = service
        .delete_credential(state.secrets.as_ref(), credential_id)
        .await
        .map_err(|e| {
            tracing::error!("Delete credential error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Credential deletion failed".to_string(),
            )
        })?;
    if !deleted {
        return Err((StatusCode::NOT_FOUND, "Credential not found".to_string()));
    }
    Ok(Json(SuccessResponse::with_id(
        "Credential deleted",
        credential_id,
    )))
}

async fn load_credential(
    service: &CredentialService,
    credential_id: Uuid,
) -> Result<CredentialRow, (StatusCode, String)> {
    service
        .get_credential_by_id(credential_id)
        .await
        .map_err(|e| {
            tracing::error!("Get credential error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Credential not found".to_string()))
}
