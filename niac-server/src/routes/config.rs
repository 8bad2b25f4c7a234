//! `GET/PUT /api/v1/config` (`spec.md` §6): fetch or update the active
//! YAML. A `PUT` re-validates and runs it through the live reconciler
//! rather than restarting the simulation.

use axum::extract::State;
use axum::Json;
use niac_config::{validate, SimConfig};
use niac_engine::reconcile::ReconcilePlan;
use niac_types::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub yaml: String,
}

pub async fn get_config(State(state): State<AppState>) -> Result<Json<ConfigResponse>, ApiError> {
    let yaml = state.active_config_yaml.read().unwrap().clone().ok_or(Error::NotFound("no active configuration".into()))?;
    Ok(Json(ConfigResponse { yaml }))
}

#[derive(Debug, Deserialize)]
pub struct PutConfigRequest {
    pub yaml: String,
}

pub async fn put_config(State(state): State<AppState>, Json(req): Json<PutConfigRequest>) -> Result<Json<ReconcilePlan>, ApiError> {
    let config: SimConfig = SimConfig::load_yaml(&req.yaml, Path::new("."))?;
    validate(&config)?;
    let plan = state.supervisor.reconcile(config.devices).await?;
    *state.active_config_yaml.write().unwrap() = Some(req.yaml);
    Ok(Json(plan))
}
