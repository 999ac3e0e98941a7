//! Plan routes - billing plans. Mutations are admin-only; any
//! authenticated caller can read the catalog.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Extension, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::database::plan_service::{NewPlanFields, PlanRow};
use crate::database::PlanService;

use super::auth::{require_admin, Identity};
use super::{AppState, ListQuery, SuccessResponse};

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub name: String,
    pub monthly_price: Decimal,
    pub features: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub monthly_price: Option<Decimal>,
    pub features: Option<JsonValue>,
    pub is_active: Option<bool>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/plans", get(list_plans).post(create_plan))
        .route(
            "/api/plans/:plan_id",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
}

async fn create_plan(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<CreatePlanRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    require_admin(&identity)?;
    if request.name.is_empty() {
        return Err(super::missing_field("name"));
    }

    let service = PlanService::new(state.pool.clone());
    let plan_id = service
        .create_plan(&NewPlanFields {
            name: request.name,
            monthly_price: request.monthly_price,
            features: request.features,
        })
        .await
        .map_err(|e| {
            tracing::error!("Create plan error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    Ok(Json(SuccessResponse::with_id("Plan created", plan_id)))
}

async fn list_plans(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PlanRow>>, (StatusCode, String)> {
    let service = PlanService::new(state.pool.clone());
    let plans = service.list_plans(query.active).await.map_err(|e| {
        tracing::error!("List plans error: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database error".to_string(),
        )
    })?;
    Ok(Json(plans))
}

async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<PlanRow>, (StatusCode, String)> {
    let service = PlanService::new(state.pool.clone());
    let plan = service
        .get_plan_by_id(plan_id)
        .await
        .map_err(|e| {
            tracing::error!("Get plan error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Plan not found".to_string()))?;
    Ok(Json(plan))
}

async fn update_plan(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(plan_id): Path<Uuid>,
    Json(request): Json<UpdatePlanRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    require_admin(&identity)?;
    let service = PlanService::new(state.pool.clone());
    let updated = service
        .update_plan(
            plan_id,
            request.name.as_deref(),
            request.monthly_price,
            request.features.as_ref(),
            request.is_active,
        )
        .await
        .map_err(|e| {
            tracing::error!("Update plan error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;
    if !updated {
        return Err((StatusCode::NOT_FOUND, "Plan not found".to_string()));
    }
    Ok(Json(SuccessResponse::with_id("Plan updated", plan_id)))
}

async fn delete_plan(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, (StatusCode, String)> {
    require_admin(&identity)?;
    let service = PlanService::new(state.pool.clone());
    let deleted = service.delete_plan(plan_id).await.map_err(|e| {
        tracing::error!("Delete plan error: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database error".to_string(),
        )
    })?;
    if !deleted {
        return Err((StatusCode::NOT_FOUND, "Plan not found".to_string()));
    }
    Ok(Json(SuccessResponse::with_id("Plan deleted", plan_id)))
}
