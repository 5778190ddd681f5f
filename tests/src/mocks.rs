//! Mock User Portal served over HTTP.
//!
//! Speaks the same login/visit/equipment protocol as the real portal so
//! tests can drive `PortalClient` through the router.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use retention_core::Visit;
use serde_json::{json, Value};

const TOKEN: &str = "mock-portal-token";

#[derive(Default)]
struct PortalData {
    /// EPN -> visit
    visits: RwLock<HashMap<String, Visit>>,
    password: RwLock<String>,
    logins: AtomicUsize,
}

/// Handle to a running mock portal.
#[derive(Clone)]
pub struct MockPortal {
    pub url: String,
    data: Arc<PortalData>,
}

impl MockPortal {
    /// Starts the portal on an ephemeral port, accepting `password`.
    pub async fn start(password: &str) -> Self {
        let data = Arc::new(PortalData::default());
        *data.password.write() = password.to_string();

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/visits/epn/:epn", get(visit_by_epn))
            .route("/api/equipment/:id", get(equipment))
            .with_state(data.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock portal");
        let addr = listener.local_addr().expect("Mock portal has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            url: format!("http://{}", addr),
            data,
        }
    }

    pub fn insert(&self, epn: &str, visit: Visit) {
        self.data.visits.write().insert(epn.to_string(), visit);
    }

    pub fn login_count(&self) -> usize {
        self.data.logins.load(Ordering::SeqCst)
    }
}

async fn login(
    State(data): State<Arc<PortalData>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    data.logins.fetch_add(1, Ordering::SeqCst);
    if body["client_password"].as_str() == Some(data.password.read().as_str()) {
        Ok(Json(json!({ "token": TOKEN })))
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map_or(false, |h| h == format!("Bearer {}", TOKEN))
}

/// Equipment ids are derived from the beamline name.
fn equipment_id(beamline: &str) -> i64 {
    beamline
        .bytes()
        .fold(0i64, |acc, b| (acc * 31 + i64::from(b)) % 1_000_000)
}

async fn visit_by_epn(
    State(data): State<Arc<PortalData>>,
    headers: HeaderMap,
    Path(epn): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let visits = data.visits.read();
    let visit = visits.get(&epn).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({
        "id": visit.id,
        "start_time": visit.start_date,
        "end_time": visit.end_date,
        "equipment_id": equipment_id(&visit.beamline),
        "proposal": {
            "title": visit.title,
            "type": visit.visit_type,
        },
        "principal_scientist": {
            "id": visit.pi.id,
            "first_names": visit.pi.first_names,
            "last_name": visit.pi.last_name,
            "email": visit.pi.email,
            "organisation": visit.pi.org,
        }
    })))
}

async fn equipment(
    State(data): State<Arc<PortalData>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let visits = data.visits.read();
    let beamline = visits
        .values()
        .map(|v| v.beamline.as_str())
        .find(|b| equipment_id(b) == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({
        "id": id,
        "name_short": beamline,
        "name_long": format!("Beamline {}", beamline),
    })))
}
