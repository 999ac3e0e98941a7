//! Workflow exception routes.

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

use crate::database::exception_service::WorkflowExceptionRow;
use crate::database::{ExceptionService, WorkflowService};

use super::auth::{ensure_client_access, Identity};
use super::{AppState, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct RecordExceptionRequest {
    pub workflow_id: Uuid,
    pub message: String,
    pub detail: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct ExceptionListQuery {
    pub workflow_id: Option<Uuid>,
    pub resolved: Option<bool>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/exceptions",
            get(list_exceptions).post(record_exception),
        )
        .route("/api/exceptions/:exception_id", get(get_exception))
        .route(
            "/api/exceptions/:exception_id/resolve",
            post(resolve_exception),
        )
}

async fn record_exception(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<RecordExceptionRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    if request.message.is_empty() {
        return Err(super::missing_field("message"));
    }
    let workflow = WorkflowService::new(state.pool.clone())
        .get_workflow_by_id(request.workflow_id)
        .await
        .map_err(|e| {
            tracing::error!("Get workflow error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Workflow not found".to_string()))?;
    ensure_client_access(&identity, Some(workflow.client_id))?;

    let service = ExceptionService::new(state.pool.clone());
    let exception_id = service
        .record_exception(request.workflow_id, &request.message, request.detail.as_ref())
        .await
        .map_err(|e| {
            tracing::error!("Record exception error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    Ok(Json(SuccessResponse::with_id(
        "Exception recorded",
        exception_id,
    )))
}

async fn list_exceptions(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ExceptionListQuery>,
) -> Result<Json<Vec<WorkflowExceptionRow>>, (StatusCode, String)> {
    // Exceptions join through workflows for tenancy; members must name a
    // workflow they can access, admins may browse everything.
    if let Some(workflow_id) = query.workflow_id {
        let workflow = WorkflowService::new(state.pool.clone())
            .get_workflow_by_id(workflow_id)
            .await
            .map_err(|e| {
                tracing::error!("Get workflow error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            })?
            .ok_or_else(|| (StatusCode::NOT_FOUND, "Workflow not found".to_string()))?;
        ensure_client_access(&identity, Some(workflow.client_id))?;
    } else {
        super::auth::require_admin(&identity)?;
    }

    let service = ExceptionService::new(state.pool.clone());
    let exceptions = service
        .list_exceptions(query.workflow_id, query.resolved, query.limit, query.offset)
        .await
        .map_err(|e| {
            tracing::error!("List exceptions error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(exceptions))
}

async fn get_exception(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(exception_id): Path<Uuid>,
) -> Result<Json<WorkflowExceptionRow>, (StatusCode, String)> {
    let exception = load_exception(&state, exception_id).await?;
    check_exception_access(&state, &identity, &exception).await?;
    Ok(Json(exception))
}

async fn resolve_exception(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(exception_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    let exception = load_exception(&state, exception_id).await?;
    check_exception_access(&state, &identity, &exception).await?;

    let resolved = ExceptionService::new(state.pool.clone())
        .resolve_exception(exception_id, identity.user_id)
        .await
        .map_err(|e| {
            tracing::error!("Resolve exception error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    if !resolved {
        return Err((
            StatusCode::BAD_REQUEST,
            "Exception already resolved".to_string(),
        ));
    }
    Ok(Json(SuccessResponse::with_id(
        "Exception resolved",
        exception_id,
    )))
}

async fn check_exception_access(
    state: &AppState,
    identity: &Identity,
    exception: &WorkflowExceptionRow,
) -> Result<(), (StatusCode, String)> {
    let workflow = WorkflowService::new(state.pool.clone())
        .get_workflow_by_id(exception.workflow_id)
        .await
        .map_err(|e| {
            tracing::error!("Get workflow error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    match workflow {
        Some(workflow) => ensure_client_access(identity, Some(workflow.client_id)),
        // Workflow deleted out from under the exception: admin-only history.
        None => super::auth::require_admin(identity),
    }
}

async fn load_exception(
    state: &AppState,
    exception_id: Uuid,
) -> Result<WorkflowExceptionRow, (StatusCode, String)> {
    ExceptionService::new(state.pool.clone())
        .get_exception_by_id(exception_id)
        .await
        .map_err(|e| {
            tracing::error!("Get exception error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Exception not found".to_string()))
}
