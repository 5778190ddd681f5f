//! Lifecycle endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use retention_core::{
    DropRequest, ExpiryCheckView, LifecycleHistoryView, LifecycleStateView, RenewRequest,
};

use crate::extractors::ValidatedJson;
use crate::response::ApiError;
use crate::state::AppState;

/// POST /dataset/:epn/lifecycle - Renew.
pub async fn renew_handler(
    State(state): State<AppState>,
    Path(epn): Path<String>,
    ValidatedJson(req): ValidatedJson<RenewRequest>,
) -> Result<Json<LifecycleStateView>, ApiError> {
    let overrides = req.overrides(&state.zone)?;
    let entry = state
        .service
        .renew_lifecycle(&epn, req.actor(), overrides)
        .await?;
    Ok(Json(LifecycleStateView::render(&entry, &state.zone)))
}

/// DELETE /dataset/:epn/lifecycle - Drop, or mark deleted when `removed`.
pub async fn drop_handler(
    State(state): State<AppState>,
    Path(epn): Path<String>,
    ValidatedJson(req): ValidatedJson<DropRequest>,
) -> Result<Json<LifecycleStateView>, ApiError> {
    let entry = state
        .service
        .drop_or_delete_lifecycle(&epn, req.removed, req.actor())
        .await?;
    Ok(Json(LifecycleStateView::render(&entry, &state.zone)))
}

/// PUT /dataset/:epn/lifecycle - Expiry check.
pub async fn check_expiry_handler(
    State(state): State<AppState>,
    Path(epn): Path<String>,
) -> Result<Json<ExpiryCheckView>, ApiError> {
    let check = state.service.check_expiry(&epn).await?;
    Ok(Json(ExpiryCheckView::render(&check, &state.zone)))
}

/// GET /dataset/:epn/lifecycle
pub async fn history_handler(
    State(state): State<AppState>,
    Path(epn): Path<String>,
) -> Result<Json<LifecycleHistoryView>, ApiError> {
    let log = state.service.lifecycle_history(&epn).await?;
    Ok(Json(LifecycleHistoryView::render(&epn, &log, &state.zone)))
}

/// GET /dataset/:epn/lifecycle/last
pub async fn latest_handler(
    State(state): State<AppState>,
    Path(epn): Path<String>,
) -> Result<Json<LifecycleStateView>, ApiError> {
    let entry = state.service.lifecycle_latest(&epn).await?;
    Ok(Json(LifecycleStateView::render(&entry, &state.zone)))
}
