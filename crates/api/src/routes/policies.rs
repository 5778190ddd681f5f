//! Policy administration endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use retention_core::{CreatePolicyRequest, PolicyRef, PolicyView, UpdatePolicyRequest};

use crate::extractors::ValidatedJson;
use crate::response::{ApiError, PolicyDeleted};
use crate::state::AppState;

/// POST /policy
pub async fn create_handler(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreatePolicyRequest>,
) -> Result<(StatusCode, Json<PolicyRef>), ApiError> {
    let policy = state.service.create_policy(req.into_policy()).await?;
    Ok((StatusCode::CREATED, Json(PolicyRef::from(&policy))))
}

/// GET /policy
pub async fn list_handler(State(state): State<AppState>) -> Result<Json<Vec<PolicyView>>, ApiError> {
    let policies = state.service.list_policies().await?;
    Ok(Json(policies.iter().map(PolicyView::from).collect()))
}

/// GET /policy/:beamline
pub async fn get_handler(
    State(state): State<AppState>,
    Path(beamline): Path<String>,
) -> Result<Json<PolicyView>, ApiError> {
    let policy = state.service.get_policy(&beamline).await?;
    Ok(Json(PolicyView::from(&policy)))
}

/// PUT /policy/:beamline - Partial update.
pub async fn update_handler(
    State(state): State<AppState>,
    Path(beamline): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdatePolicyRequest>,
) -> Result<Json<PolicyRef>, ApiError> {
    let policy = state.service.update_policy(&beamline, req.into()).await?;
    Ok(Json(PolicyRef::from(&policy)))
}

/// DELETE /policy/:beamline
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(beamline): Path<String>,
) -> Result<Json<PolicyDeleted>, ApiError> {
    state.service.delete_policy(&beamline).await?;
    Ok(Json(PolicyDeleted { beamline }))
}
