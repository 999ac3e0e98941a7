//! Client and profile routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Extension, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::client_service::{ClientRow, NewClientFields, ProfileRow};
use crate::database::ClientService;

use super::auth::{ensure_client_access, require_admin, Identity};
use super::{AppState, ListQuery, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub contact_email: Option<String>,
    pub plan_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub status: Option<String>,
    pub plan_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub title: Option<String>,
    pub timezone: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/clients", get(list_clients).post(create_client))
        .route(
            "/api/clients/:client_id",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/api/profile", get(get_profile).put(update_profile))
}

async fn create_client(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateClientRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    require_admin(&identity)?;
    if request.name.is_empty() {
        return Err(super::missing_field("name"));
    }

    let service = ClientService::new(state.pool.clone());
    let client_id = service
        .create_client(&NewClientFields {
            name: request.name,
            contact_email: request.contact_email,
            plan_id: request.plan_id,
        })
        .await
        .map_err(|e| {
            tracing::error!("Create client error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    Ok(Json(SuccessResponse::with_id("Client created", client_id)))
}

async fn list_clients(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ClientRow>>, (StatusCode, String)> {
    let scope = super::auth::resolve_client_scope(&identity, query.client_id)?;
    let service = ClientService::new(state.pool.clone());

    let clients = match scope {
        None => service
            .list_clients(query.status.as_deref(), query.limit, query.offset)
            .await
            .map_err(|e| {
                tracing::error!("List clients error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            })?,
        Some(client_id) => service
            .get_client_by_id(client_id)
            .await
            .map_err(|e| {
                tracing::error!("Get client error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            })?
            .into_iter()
            .collect(),
    };

    Ok(Json(clients))
}

async fn get_client(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<ClientRow>, (StatusCode, String)> {
    ensure_client_access(&identity, Some(client_id))?;
    let service = ClientService::new(state.pool.clone());
    let client = service
        .get_client_by_id(client_id)
        .await
        .map_err(|e| {
            tracing::error!("Get client error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Client not found".to_string()))?;
    Ok(Json(client))
}

async fn update_client(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(client_id): Path<Uuid>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    require_admin(&identity)?;
    let service = ClientService::new(state.pool.clone());
    let updated = service
        .update_client(
            client_id,
            request.name.as_deref(),
            request.contact_email.as_deref(),
            request.status.as_deref(),
            request.plan_id,
        )
        .await
        .map_err(|e| {
            tracing::error!("Update client error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    if !updated {
        return Err((StatusCode::NOT_FOUND, "Client not found".to_string()));
    }
    Ok(Json(SuccessResponse::with_id("Client updated", client_id)))
}

async fn delete_client(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    require_admin(&identity)?;
    let service = ClientService::new(state.pool.clone());
    let deleted = service.delete_client(client_id).await.map_err(|e| {
        tracing::error!("Delete client error: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database error".to_string(),
        )
    })?;
    if !deleted {
        return Err((StatusCode::NOT_FOUND, "Client not found".to_string()));
    }
    Ok(Json(SuccessResponse::with_id("Client deleted", client_id)))
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ProfileRow>, (StatusCode, String)> {
    let service = ClientService::new(state.pool.clone());
    let profile = service
        .get_profile(identity.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Get profile error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Profile not found".to_string()))?;
    Ok(Json(profile))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    let service = ClientService::new(state.pool.clone());
    let profile_id = service
        .upsert_profile(
            identity.user_id,
            request.display_name.as_deref(),
            request.title.as_deref(),
            request.timezone.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!("Update profile error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(SuccessResponse::with_id("Profile updated", profile_id)))
}
