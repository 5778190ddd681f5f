//! Dataset endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use retention_core::{CreateDatasetRequest, DatasetListView, DatasetView, SearchQuery};

use crate::extractors::ValidatedJson;
use crate::response::{ApiError, DatasetDeleted};
use crate::state::AppState;

/// POST /dataset - Create a dataset from its portal visit.
pub async fn create_handler(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateDatasetRequest>,
) -> Result<(StatusCode, Json<DatasetView>), ApiError> {
    let dataset = state.service.create_dataset(&req.epn).await?;
    Ok((
        StatusCode::CREATED,
        Json(DatasetView::render(&dataset, &state.zone)),
    ))
}

/// GET /dataset - Search datasets.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<DatasetListView>, ApiError> {
    let filter = query.into_filter()?;
    let datasets = state.service.search_datasets(&filter).await?;

    Ok(Json(DatasetListView {
        datasets: datasets
            .iter()
            .map(|d| DatasetView::render(d, &state.zone))
            .collect(),
    }))
}

/// GET /dataset/:epn
pub async fn get_handler(
    State(state): State<AppState>,
    Path(epn): Path<String>,
) -> Result<Json<DatasetView>, ApiError> {
    let dataset = state.service.get_dataset(&epn).await?;
    Ok(Json(DatasetView::render(&dataset, &state.zone)))
}

/// DELETE /dataset/:epn - Remove the record entirely.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(epn): Path<String>,
) -> Result<Json<DatasetDeleted>, ApiError> {
    state.service.delete_dataset(&epn).await?;
    Ok(Json(DatasetDeleted { deleted: true, epn }))
}

/// PUT /dataset/:epn/visit - Re-read the visit from the portal.
pub async fn refresh_visit_handler(
    State(state): State<AppState>,
    Path(epn): Path<String>,
) -> Result<Json<DatasetView>, ApiError> {
    let dataset = state.service.refresh_visit(&epn).await?;
    Ok(Json(DatasetView::render(&dataset, &state.zone)))
}
