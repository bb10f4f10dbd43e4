use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::http::response::MappingReport;
use crate::mapper::{HostSnapshot, RoutingResult};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub hosts: usize,
    pub applications: usize,
    pub default_host: Option<String>,
}

#[derive(Deserialize)]
pub struct LookupParams {
    pub host: String,
    pub path: String,
    #[serde(default)]
    pub version: Option<String>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshot = state.table.snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started.elapsed().as_secs(),
        hosts: snapshot.len(),
        applications: snapshot.iter().map(|h| h.applications.len()).sum(),
        default_host: state.table.default_host(),
    })
}

pub async fn get_hosts(State(state): State<AdminState>) -> Json<Vec<HostSnapshot>> {
    Json(state.table.snapshot())
}

/// Run a lookup without serving the request.
pub async fn get_lookup(
    State(state): State<AdminState>,
    Query(params): Query<LookupParams>,
) -> Result<Json<MappingReport>, (StatusCode, String)> {
    let mut result = RoutingResult::new();
    state
        .table
        .lookup(&params.host, &params.path, params.version.as_deref(), &mut result)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(MappingReport::from_result(&result)))
}
