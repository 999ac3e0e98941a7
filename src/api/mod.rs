//! REST API surface.
//!
//! One router module per entity family, all sharing `AppState` and the
//! bearer-token identity middleware. Handlers collapse failures to
//! `(StatusCode, String)` at the boundary: 400 for missing fields, 401 for
//! missing sessions, 403 for out-of-scope access, 404 for missing
//! resources, 500 for everything else.

use std::sync::Arc;

use axum::{http::StatusCode, middleware, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::ai::TextModel;
use crate::pipeline::StepCatalog;
use crate::render::DocumentRenderer;
use crate::vault::SecretStore;

pub mod agent_routes;
pub mod auth;
pub mod client_routes;
pub mod credential_routes;
pub mod exception_routes;
pub mod node_routes;
pub mod pipeline_routes;
pub mod plan_routes;
pub mod proposal_routes;
pub mod survey_routes;
pub mod workflow_routes;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub catalog: Arc<StepCatalog>,
    pub model: Arc<dyn TextModel>,
    pub secrets: Arc<dyn SecretStore>,
    pub renderer: Arc<DocumentRenderer>,
    pub sessions: auth::SessionStore,
}

/// Generic success response for mutations.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            id: None,
        }
    }

    pub fn with_id(message: impl Into<String>, id: Uuid) -> Self {
        Self {
            success: true,
            message: message.into(),
            id: Some(id),
        }
    }
}

/// Common list-endpoint query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub client_id: Option<Uuid>,
    pub status: Option<String>,
    pub active: Option<bool>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "nexus".to_string(),
    })
}

/// Assemble the full API router. Everything except health and login sits
/// behind the identity middleware.
pub fn create_api_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(client_routes::router())
        .merge(node_routes::router())
        .merge(agent_routes::router())
        .merge(workflow_routes::router())
        .merge(credential_routes::router())
        .merge(survey_routes::router())
        .merge(plan_routes::router())
        .merge(proposal_routes::router())
        .merge(exception_routes::router())
        .merge(pipeline_routes::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_identity,
        ));

    Router::new()
        .route("/api/health", get(health_check))
        .merge(auth::public_router())
        .merge(protected)
        .with_state(state)
}

/// 400 helper for required-but-missing request fields.
pub(crate) fn missing_field(field: &str) -> (StatusCode, String) {
    (
        StatusCode::BAD_REQUEST,
        format!("Missing required field: {}", field),
    )
}
