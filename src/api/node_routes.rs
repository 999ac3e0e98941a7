//! Node routes - reusable scripted workflow units.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Extension, Router,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::database::node_service::{NewNodeFields, NodeRow};
use crate::database::NodeService;

use super::auth::{ensure_client_access, resolve_client_scope, Identity, Role};
use super::{AppState, ListQuery, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct CreateNodeRequest {
    /// Omitted by admins to create a shared node; members always create
    /// into their own scope.
    pub client_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub script: String,
    pub input_schema: Option<JsonValue>,
    pub output_schema: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNodeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub script: Option<String>,
    pub is_active: Option<bool>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/nodes", get(list_nodes).post(create_node))
        .route(
            "/api/nodes/:node_id",
            get(get_node).put(update_node).delete(delete_node),
        )
}

async fn create_node(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateNodeRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    if request.name.is_empty() {
        return Err(super::missing_field("name"));
    }
    if request.script.is_empty() {
        return Err(super::missing_field("script"));
    }

    let client_id = match identity.role {
        Role::Admin => request.client_id,
        Role::Member => Some(resolve_client_scope(&identity, request.client_id)?.ok_or_else(
            || {
                (
                    StatusCode::FORBIDDEN,
                    "No client scope for this account".to_string(),
                )
            },
        )?),
    };

    let service = NodeService::new(state.pool.clone());
    let node_id = service
        .create_node(&NewNodeFields {
            client_id,
            name: request.name,
            description: request.description,
            language: request.language.unwrap_or_else(|| "javascript".to_string()),
            script: request.script,
            input_schema: request.input_schema,
            output_schema: request.output_schema,
        })
        .await
        .map_err(|e| {
            tracing::error!("Create node error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    Ok(Json(SuccessResponse::with_id("Node created", node_id)))
}

async fn list_nodes(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<NodeRow>>, (StatusCode, String)> {
    let scope = resolve_client_scope(&identity, query.client_id)?;
    let service = NodeService::new(state.pool.clone());
    let nodes = service
        .list_nodes(scope, query.active, query.limit, query.offset)
        .await
        .map_err(|e| {
            tracing::error!("List nodes error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(nodes))
}

async fn get_node(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(node_id): Path<Uuid>,
) -> Result<Json<NodeRow>, (StatusCode, String)> {
    let service = NodeService::new(state.pool.clone());
    let node = service
        .get_node_by_id(node_id)
        .await
        .map_err(|e| {
            tracing::error!("Get node error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Node not found".to_string()))?;
    ensure_client_access(&identity, node.client_id)?;
    Ok(Json(node))
}

async fn update_node(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(node_id): Path<Uuid>,
    Json(request): Json<UpdateNodeRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    let service = NodeService::new(state.pool.clone());
    let node = service
        .get_node_by_id(node_id)
        .await
        .map_err(|e| {
            tracing::error!("Get node error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Node not found".to_string()))?;

    // Shared nodes are admin-editable only.
    match node.client_id {
        Some(owner) => ensure_client_access(&identity, Some(owner))?,
        None => super::auth::require_admin(&identity)?,
    }

    service
        .update_node(
            node_id,
            request.name.as_deref(),
            request.description.as_deref(),
            request.script.as_deref(),
            request.is_active,
        )
        .await
        .map_err(|e| {
            tracing::error!("Update node error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(SuccessResponse::with_id("Node updated", node_id)))
}

async fn delete_node(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(node_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    let service = NodeService::new(state.pool.clone());
    let node = service
        .get_node_by_id(node_id)
        .await
        .map_err(|e| {
            tracing::error!("Get node error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Node not found".to_string()))?;

    match node.client_id {
        Some(owner) => ensure_client_access(&identity, Some(owner))?,
        None => super::auth::require_admin(&identity)?,
    }

    service.delete_node(node_id).await.map_err(|e| {
        tracing::error!("Delete node error: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database error".to_string(),
        )
    })?;
    Ok(Json(SuccessResponse::with_id("Node deleted", node_id)))
}
