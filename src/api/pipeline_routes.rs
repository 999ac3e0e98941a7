//! Onboarding pipeline routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::service::{AdvanceOutcome, PipelineService, PipelineStatus};
use crate::pipeline::StepStatus;

use super::auth::{ensure_client_access, Identity};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub pipeline_group: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub pipeline_group: Uuid,
    /// Status written to the located step; defaults to completed, which is
    /// what the "mark complete" button sends. The in-progress variant is
    /// used when a long-running step starts.
    #[serde(default = "default_advance_status")]
    pub status: StepStatus,
}

fn default_advance_status() -> StepStatus {
    StepStatus::Completed
}

#[derive(Debug, Serialize)]
pub struct RestartResponse {
    pub client_id: Uuid,
    pub pipeline_group: Uuid,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/pipeline/:client_id/status", get(pipeline_status))
        .route("/api/pipeline/:client_id/advance", post(advance_pipeline))
        .route("/api/pipeline/:client_id/restart", post(restart_pipeline))
}

async fn pipeline_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(client_id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<PipelineStatus>, (StatusCode, String)> {
    ensure_client_access(&identity, Some(client_id))?;

    let service = PipelineService::new(state.pool.clone());
    let status = service
        .status(&state.catalog, client_id, query.pipeline_group)
        .await
        .map_err(|e| {
            tracing::error!("Pipeline status error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(status))
}

async fn advance_pipeline(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(client_id): Path<Uuid>,
    Json(request): Json<AdvanceRequest>,
) -> Result<Json<AdvanceOutcome>, (StatusCode, String)> {
    ensure_client_access(&identity, Some(client_id))?;

    let service = PipelineService::new(state.pool.clone());
    let outcome = service
        .advance(
            &state.catalog,
            client_id,
            request.pipeline_group,
            request.status,
        )
        .await
        .map_err(|e| {
            tracing::error!("Pipeline advance error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(outcome))
}

async fn restart_pipeline(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<RestartResponse>, (StatusCode, String)> {
    ensure_client_access(&identity, Some(client_id))?;

    let service = PipelineService::new(state.pool.clone());
    let pipeline_group = service.restart(client_id);
    Ok(Json(RestartResponse {
        client_id,
        pipeline_group,
    }))
}
