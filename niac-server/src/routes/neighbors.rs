//! `GET /api/v1/neighbors`, `GET /api/v1/topology`, `GET /api/v1/history`.

use axum::extract::State;
use axum::Json;
use niac_engine::topology::TopologySnapshot;
use niac_types::{NeighborRecord, RunRecord};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_neighbors(State(state): State<AppState>) -> Result<Json<Vec<NeighborRecord>>, ApiError> {
    Ok(Json(state.supervisor.neighbors().await?))
}

pub async fn get_topology(State(state): State<AppState>) -> Result<Json<TopologySnapshot>, ApiError> {
    Ok(Json(state.supervisor.topology().await?))
}

pub async fn list_history(State(state): State<AppState>) -> Json<Vec<RunRecord>> {
    Json(state.supervisor.history().await)
}
