//! API routes.

pub mod datasets;
pub mod health;
pub mod lifecycle;
pub mod policies;
pub mod storage;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/dataset",
            post(datasets::create_handler).get(datasets::search_handler),
        )
        .route(
            "/dataset/:epn",
            get(datasets::get_handler).delete(datasets::delete_handler),
        )
        .route("/dataset/:epn/visit", put(datasets::refresh_visit_handler))
        .route(
            "/dataset/:epn/storage",
            post(storage::add_event_handler).get(storage::history_handler),
        )
        .route("/dataset/:epn/storage/last", get(storage::latest_handler))
        .route(
            "/dataset/:epn/lifecycle",
            post(lifecycle::renew_handler)
                .delete(lifecycle::drop_handler)
                .put(lifecycle::check_expiry_handler)
                .get(lifecycle::history_handler),
        )
        .route("/dataset/:epn/lifecycle/last", get(lifecycle::latest_handler))
        .route(
            "/policy",
            post(policies::create_handler).get(policies::list_handler),
        )
        .route(
            "/policy/:beamline",
            get(policies::get_handler)
                .put(policies::update_handler)
                .delete(policies::delete_handler),
        )
        .route("/info", get(health::info_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
