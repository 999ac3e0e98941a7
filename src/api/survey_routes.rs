//! Survey routes - onboarding survey responses and analysis.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::ai::prompt_builder::survey_analysis_request;
use crate::database::survey_service::SurveyResponseRow;
use crate::database::{ClientService, SurveyService};

use super::auth::{ensure_client_access, resolve_client_scope, Identity, Role};
use super::{AppState, ListQuery, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct CreateSurveyRequest {
    pub client_id: Option<Uuid>,
    pub answers: JsonValue,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub survey_id: Uuid,
    pub analysis: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/surveys", get(list_surveys).post(create_survey))
        .route(
            "/api/surveys/:survey_id",
            get(get_survey).delete(delete_survey),
        )
        .route("/api/surveys/:survey_id/analyze", post(analyze_survey))
}

async fn create_survey(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreateSurveyRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    if request.answers.is_null() {
        return Err(super::missing_field("answers"));
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

    let service = SurveyService::new(state.pool.clone());
    let survey_id = service
        .create_response(client_id, &request.answers)
        .await
        .map_err(|e| {
            tracing::error!("Create survey error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    Ok(Json(SuccessResponse::with_id("Survey recorded", survey_id)))
}

async fn list_surveys(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SurveyResponseRow>>, (StatusCode, String)> {
    let scope = resolve_client_scope(&identity, query.client_id)?;
    let service = SurveyService::new(state.pool.clone());
    let surveys = service
        .list_responses(scope, query.limit, query.offset)
        .await
        .map_err(|e| {
            tracing::error!("List surveys error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(surveys))
}

async fn get_survey(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(survey_id): Path<Uuid>,
) -> Result<Json<SurveyResponseRow>, (StatusCode, String)> {
    let survey = load_survey(&state, survey_id).await?;
    ensure_client_access(&identity, Some(survey.client_id))?;
    Ok(Json(survey))
}

/// Run the text model over the answers and store the assessment on the row.
async fn analyze_survey(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(survey_id): Path<Uuid>,
) -> Result<Json<AnalyzeResponse>, (StatusCode, String)> {
    let survey = load_survey(&state, survey_id).await?;
    ensure_client_access(&identity, Some(survey.client_id))?;

    let client_name = ClientService::new(state.pool.clone())
        .get_client_by_id(survey.client_id)
        .await
        .map_err(|e| {
            tracing::error!("Get client error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .map(|c| c.name)
        .unwrap_or_else(|| "the client".to_string());

    let analysis = state
        .model
        .generate(survey_analysis_request(&client_name, &survey.answers))
        .await
        .map_err(|e| {
            tracing::error!("Survey analysis error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Text model error: {}", e),
            )
        })?;

    SurveyService::new(state.pool.clone())
        .record_analysis(survey_id, &analysis)
        .await
        .map_err(|e| {
            tracing::error!("Record analysis error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    Ok(Json(AnalyzeResponse {
        survey_id,
        analysis,
    }))
}

async fn delete_survey(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(survey_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    let survey = load_survey(&state, survey_id).await?;
    ensure_client_access(&identity, Some(survey.client_id))?;

    SurveyService::new(state.pool.clone())
        .delete_response(survey_id)
        .await
        .map_err(|e| {
            tracing::error!("Delete survey error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    Ok(Json(SuccessResponse::with_id("Survey deleted", survey_id)))
}

async fn load_survey(
    state: &AppState,
    survey_id: Uuid,
) -> Result<SurveyResponseRow, (StatusCode, String)> {
    SurveyService::new(state.pool.clone())
        .get_response_by_id(survey_id)
        .await
        .map_err(|e| {
            tracing::error!("Get survey error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Survey not found".to_string()))
}
