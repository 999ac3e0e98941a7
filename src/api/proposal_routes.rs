//! Proposal routes - generation, rendering, and the read side.
//!
//! Generation, rendering, and pipeline advancement are deliberately three
//! separate calls with no shared transaction; a failure in a later call
//! leaves the earlier results in place.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::ai::{prompt_builder::proposal_request, strip_code_fence};
use crate::database::proposal_service::{DocumentRow, NewProposalFields, ProposalRow};
use crate::database::{ClientService, PlanService, ProposalService, SurveyService};
use crate::render::substitute_placeholders;

use super::auth::{ensure_client_access, resolve_client_scope, Identity, Role};
use super::{AppState, ListQuery, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct GenerateProposalRequest {
    pub client_id: Option<Uuid>,
    pub pipeline_group: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub document_id: Uuid,
    pub file_name: String,
    pub storage_path: String,
    pub byte_size: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/proposals", get(list_proposals))
        .route("/api/proposals/generate", post(generate_proposal))
        .route("/api/proposals/:proposal_id", get(get_proposal))
        .route("/api/proposals/:proposal_id/status", put(update_status))
        .route("/api/proposals/:proposal_id/render", post(render_proposal))
        .route("/api/proposals/:proposal_id/documents", get(list_documents))
}

/// Draft a proposal from the client's survey analysis and plan context.
async fn generate_proposal(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<GenerateProposalRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
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

    let client = ClientService::new(state.pool.clone())
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

    let plan_name = match client.plan_id {
        Some(plan_id) => PlanService::new(state.pool.clone())
            .get_plan_by_id(plan_id)
            .await
            .map_err(|e| {
                tracing::error!("Get plan error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            })?
            .map(|p| p.name),
        None => None,
    };

    // Latest analyzed survey, if any; generation proceeds without one.
    let analysis = SurveyService::new(state.pool.clone())
        .list_responses(Some(client_id), Some(20), None)
        .await
        .map_err(|e| {
            tracing::error!("List surveys error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .into_iter()
        .find_map(|s| s.analysis);

    let markdown = state
        .model
        .generate(proposal_request(
            &client.name,
            plan_name.as_deref(),
            analysis.as_deref(),
        ))
        .await
        .map_err(|e| {
            tracing::error!("Proposal generation error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Text model error: {}", e),
            )
        })?;

    let proposal_id = ProposalService::new(state.pool.clone())
        .create_proposal(&NewProposalFields {
            client_id,
            pipeline_group: request.pipeline_group,
            title: format!("Automation Proposal - {}", client.name),
            body_markdown: strip_code_fence(&markdown),
        })
        .await
        .map_err(|e| {
            tracing::error!("Create proposal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    Ok(Json(SuccessResponse::with_id(
        "Proposal generated",
        proposal_id,
    )))
}

async fn list_proposals(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProposalRow>>, (StatusCode, String)> {
    let scope = resolve_client_scope(&identity, query.client_id)?;
    let service = ProposalService::new(state.pool.clone());
    let proposals = service
        .list_proposals(scope, query.status.as_deref(), query.limit, query.offset)
        .await
        .map_err(|e| {
            tracing::error!("List proposals error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(proposals))
}

async fn get_proposal(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<ProposalRow>, (StatusCode, String)> {
    let proposal = load_proposal(&state, proposal_id).await?;
    ensure_client_access(&identity, Some(proposal.client_id))?;
    Ok(Json(proposal))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(proposal_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    if request.status.is_empty() {
        return Err(super::missing_field("status"));
    }
    let proposal = load_proposal(&state, proposal_id).await?;
    ensure_client_access(&identity, Some(proposal.client_id))?;

    ProposalService::new(state.pool.clone())
        .update_status(proposal_id, &request.status)
        .await
        .map_err(|e| {
            tracing::error!("Update proposal status error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(SuccessResponse::with_id("Proposal updated", proposal_id)))
}

/// Compile the proposal markdown to PDF and record the artifact.
async fn render_proposal(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<RenderResponse>, (StatusCode, String)> {
    let proposal = load_proposal(&state, proposal_id).await?;
    ensure_client_access(&identity, Some(proposal.client_id))?;

    let client_name = ClientService::new(state.pool.clone())
        .get_client_by_id(proposal.client_id)
        .await
        .map_err(|e| {
            tracing::error!("Get client error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .map(|c| c.name)
        .unwrap_or_else(|| "Client".to_string());

    let mut values = HashMap::new();
    values.insert("client_name".to_string(), client_name);
    let markdown = substitute_placeholders(&proposal.body_markdown, &values);

    let rendered = state
        .renderer
        .render_pdf(&markdown, &format!("proposal-{}", proposal_id))
        .await
        .map_err(|e| {
            tracing::error!("Render proposal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Document compiler error: {}", e),
            )
        })?;

    let document_id = ProposalService::new(state.pool.clone())
        .record_document(
            proposal_id,
            "pdf",
            &rendered.file_name,
            &rendered.storage_path.to_string_lossy(),
            rendered.byte_size,
        )
        .await
        .map_err(|e| {
            tracing::error!("Record document error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    Ok(Json(RenderResponse {
        document_id,
        file_name: rendered.file_name,
        storage_path: rendered.storage_path.to_string_lossy().into_owned(),
        byte_size: rendered.byte_size,
    }))
}

async fn list_documents(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<Vec<DocumentRow>>, (StatusCode, String)> {
    let proposal = load_proposal(&state, proposal_id).await?;
    ensure_client_access(&identity, Some(proposal.client_id))?;

    let documents = ProposalService::new(state.pool.clone())
        .list_documents(proposal_id)
        .await
        .map_err(|e| {
            tracing::error!("List documents error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(documents))
}

async fn load_proposal(
    state: &AppState,
    proposal_id: Uuid,
) -> Result<ProposalRow, (StatusCode, String)> {
    ProposalService::new(state.pool.clone())
        .get_proposal_by_id(proposal_id)
        .await
        .map_err(|e| {
            tracing::error!("Get proposal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Proposal not found".to_string()))
}
