//! Storage endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use retention_core::{StorageEventRequest, StorageEventView, StorageHistoryView, StorageLatestView};

use crate::extractors::ValidatedJson;
use crate::response::ApiError;
use crate::state::AppState;

/// POST /dataset/:epn/storage - Record a storage observation.
pub async fn add_event_handler(
    State(state): State<AppState>,
    Path(epn): Path<String>,
    ValidatedJson(req): ValidatedJson<StorageEventRequest>,
) -> Result<(StatusCode, Json<StorageEventView>), ApiError> {
    let (item, event) = req.into_event(state.now());
    let event = state.service.add_storage_event(&epn, &item, event).await?;
    Ok((
        StatusCode::CREATED,
        Json(StorageEventView::render(&event, &state.zone)),
    ))
}

/// GET /dataset/:epn/storage
pub async fn history_handler(
    State(state): State<AppState>,
    Path(epn): Path<String>,
) -> Result<Json<StorageHistoryView>, ApiError> {
    let storage = state.service.storage_history(&epn).await?;
    Ok(Json(StorageHistoryView::render(&epn, &storage, &state.zone)))
}

/// GET /dataset/:epn/storage/last
pub async fn latest_handler(
    State(state): State<AppState>,
    Path(epn): Path<String>,
) -> Result<Json<StorageLatestView>, ApiError> {
    let latest = state.service.storage_latest(&epn).await?;
    Ok(Json(StorageLatestView::render(&epn, &latest, &state.zone)))
}
