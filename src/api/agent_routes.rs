//! Agent routes - conversational assistant configs and chat testing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ai::prompt_builder::{chat_request, AgentProfile};
use crate::database::agent_service::{AgentRow, NewAgentFields};
use crate::database::AgentService;

use super::auth::{ensure_client_access, resolve_client_scope, Identity, Role};
use super::{AppState, ListQuery, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub client_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: String,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAgentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub system_prompt: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ChatTestRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatTestResponse {
    pub agent_id: Uuid,
    pub reply: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/agents", get(list_agents).post(create_agent))
        .route(
            "/api/agents/:agent_id",
            get(get_agent).put(update_agent).delete(delete_agent),
        )
        .route("/api/agents/:agent_id/chat", post(chat_test))
}

async fn create_agent(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateAgentRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    if request.name.is_empty() {
        return Err(super::missing_field("name"));
    }
    if request.system_prompt.is_empty() {
        return Err(super::missing_field("system_prompt"));
    }

    let client_id = match identity.role {
        Role::Admin => request.client_id,
        Role::Member => resolve_client_scope(&identity, request.client_id)?,
    };

    let service = AgentService::new(state.pool.clone());
    let agent_id = service
        .create_agent(&NewAgentFields {
            client_id,
            name: request.name,
            description: request.description,
            system_prompt: request.system_prompt,
            model: request
                .model
                .unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        })
        .await
        .map_err(|e| {
            tracing::error!("Create agent error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    Ok(Json(SuccessResponse::with_id("Agent created", agent_id)))
}

async fn list_agents(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AgentRow>>, (StatusCode, String)> {
    let scope = resolve_client_scope(&identity, query.client_id)?;
    let service = AgentService::new(state.pool.clone());
    let agents = service
        .list_agents(scope, query.active, query.limit, query.offset)
        .await
        .map_err(|e| {
            tracing::error!("List agents error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(agents))
}

async fn get_agent(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(agent_id): Path<Uuid>,
) -> Result<Json<AgentRow>, (StatusCode, String)> {
    let agent = load_agent(&state, agent_id).await?;
    ensure_client_access(&identity, agent.client_id)?;
    Ok(Json(agent))
}

async fn update_agent(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(agent_id): Path<Uuid>,
    Json(request): Json<UpdateAgentRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    let agent = load_agent(&state, agent_id).await?;
    ensure_client_access(&identity, agent.client_id)?;

    let service = AgentService::new(state.pool.clone());
    service
        .update_agent(
            agent_id,
            request.name.as_deref(),
            request.description.as_deref(),
            request.system_prompt.as_deref(),
            request.model.as_deref(),
            request.temperature,
            request.max_tokens,
            request.is_active,
        )
        .await
        .map_err(|e| {
            tracing::error!("Update agent error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(SuccessResponse::with_id("Agent updated", agent_id)))
}

async fn delete_agent(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(agent_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    let agent = load_agent(&state, agent_id).await?;
    ensure_client_access(&identity, agent.client_id)?;

    let service = AgentService::new(state.pool.clone());
    service.delete_agent(agent_id).await.map_err(|e| {
        tracing::error!("Delete agent error: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database error".to_string(),
        )
    })?;
    Ok(Json(SuccessResponse::with_id("Agent deleted", agent_id)))
}

/// Exercise an agent's configured prompt against the text model. Nothing is
/// persisted; this is a test bench for prompt tuning.
async fn chat_test(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(agent_id): Path<Uuid>,
    Json(request): Json<ChatTestRequest>,
) -> Result<Json<ChatTestResponse>, (StatusCode, String)> {
    if request.message.is_empty() {
        return Err(super::missing_field("message"));
    }
    let agent = load_agent(&state, agent_id).await?;
    ensure_client_access(&identity, agent.client_id)?;

    let profile = AgentProfile {
        name: agent.name.clone(),
        system_prompt: agent.system_prompt.clone(),
    };
    let reply = state
        .model
        .generate(chat_request(&profile, &request.message))
        .await
        .map_err(|e| {
            tracing::error!("Chat test error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Text model error: {}", e),
            )
        })?;

    Ok(Json(ChatTestResponse { agent_id, reply }))
}

async fn load_agent(state: &AppState, agent_id: Uuid) -> Result<AgentRow, (StatusCode, String)> {
    AgentService::new(state.pool.clone())
        .get_agent_by_id(agent_id)
        .await
        .map_err(|e| {
            tracing::error!("Get agent error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Agent not found".to_string()))
}
