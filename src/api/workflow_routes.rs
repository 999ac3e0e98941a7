//! Workflow routes - CRUD, the execution stub, and run history.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::database::workflow_service::{ExecutionLogRow, NewWorkflowFields, WorkflowRow};
use crate::database::WorkflowService;

use super::auth::{ensure_client_access, resolve_client_scope, Identity, Role};
use super::{AppState, ListQuery, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct CreateWorkflowRequest {
    pub client_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub definition: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWorkflowRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub definition: Option<JsonValue>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub detail: Option<JsonValue>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", get(list_workflows).post(create_workflow))
        .route(
            "/api/workflows/:workflow_id",
            get(get_workflow)
                .put(update_workflow)
                .delete(delete_workflow),
        )
        .route("/api/workflows/:workflow_id/execute", post(execute_workflow))
        .route("/api/workflows/:workflow_id/logs", get(list_logs))
}

async fn create_workflow(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateWorkflowRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    if request.name.is_empty() {
        return Err(super::missing_field("name"));
    }

    // Workflows always belong to a client.
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

    let service = WorkflowService::new(state.pool.clone());
    let workflow_id = service
        .create_workflow(&NewWorkflowFields {
            client_id,
            name: request.name,
            description: request.description,
            definition: request.definition,
        })
        .await
        .map_err(|e| {
            tracing::error!("Create workflow error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    Ok(Json(SuccessResponse::with_id("Workflow created", workflow_id)))
}

async fn list_workflows(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<WorkflowRow>>, (StatusCode, String)> {
    let scope = resolve_client_scope(&identity, query.client_id)?;
    let service = WorkflowService::new(state.pool.clone());
    let workflows = service
        .list_workflows(scope, query.status.as_deref(), query.limit, query.offset)
        .await
        .map_err(|e| {
            tracing::error!("List workflows error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(workflows))
}

async fn get_workflow(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(workflow_id): Path<Uuid>,
) -> Result<Json<WorkflowRow>, (StatusCode, String)> {
    let workflow = load_workflow(&state, workflow_id).await?;
    ensure_client_access(&identity, Some(workflow.client_id))?;
    Ok(Json(workflow))
}

async fn update_workflow(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(workflow_id): Path<Uuid>,
    Json(request): Json<UpdateWorkflowRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    let workflow = load_workflow(&state, workflow_id).await?;
    ensure_client_access(&identity, Some(workflow.client_id))?;

    let service = WorkflowService::new(state.pool.clone());
    service
        .update_workflow(
            workflow_id,
            request.name.as_deref(),
            request.description.as_deref(),
            request.definition.as_ref(),
            request.status.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!("Update workflow error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(SuccessResponse::with_id("Workflow updated", workflow_id)))
}

async fn delete_workflow(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(workflow_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    let workflow = load_workflow(&state, workflow_id).await?;
    ensure_client_access(&identity, Some(workflow.client_id))?;

    let service = WorkflowService::new(state.pool.clone());
    service.delete_workflow(workflow_id).await.map_err(|e| {
        tracing::error!("Delete workflow error: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database error".to_string(),
        )
    })?;
    Ok(Json(SuccessResponse::with_id("Workflow deleted", workflow_id)))
}

/// Queue a run. Execution itself happens out of band; this only records
/// the request.
async fn execute_workflow(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(workflow_id): Path<Uuid>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    let workflow = load_workflow(&state, workflow_id).await?;
    ensure_client_access(&identity, Some(workflow.client_id))?;

    let service = WorkflowService::new(state.pool.clone());
    let execution_id = service
        .queue_execution(workflow_id, request.detail.as_ref())
        .await
        .map_err(|e| {
            tracing::error!("Execute workflow error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(SuccessResponse::with_id("Execution queued", execution_id)))
}

async fn list_logs(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(workflow_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ExecutionLogRow>>, (StatusCode, String)> {
    let workflow = load_workflow(&state, workflow_id).await?;
    ensure_client_access(&identity, Some(workflow.client_id))?;

    let service = WorkflowService::new(state.pool.clone());
    let logs = service
        .list_execution_logs(workflow_id, query.limit, query.offset)
        .await
        .map_err(|e| {
            tracing::error!("List execution logs error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(logs))
}

async fn load_workflow(
    state: &AppState,
    workflow_id: Uuid,
) -> Result<WorkflowRow, (StatusCode, String)> {
    WorkflowService::new(state.pool.clone())
        .get_workflow_by_id(workflow_id)
        .await
        .map_err(|e| {
            tracing::error!("Get workflow error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Workflow not found".to_string()))
}
