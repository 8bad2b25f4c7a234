//! `POST /api/v1/simulation/{start,stop}` (`spec.md` §6).

use std::path::Path;

use axum::extract::State;
use axum::Json;
use niac_config::{validate, SimConfig};
use niac_types::Error;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub interface: String,
    pub config_path: Option<String>,
    pub config_data: Option<String>,
    #[serde(default = "default_config_name")]
    pub config_name: String,
}

fn default_config_name() -> String {
    "control-plane".to_string()
}

pub async fn start(State(state): State<AppState>, Json(req): Json<StartRequest>) -> Result<(), ApiError> {
    let yaml = match (&req.config_data, &req.config_path) {
        (Some(data), _) => data.clone(),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| Error::config_invalid("config_path", "a readable YAML file", path.clone(), Some(&e.to_string())))?,
        (None, None) => return Err(Error::config_invalid("config_data/config_path", "one of the two", "neither", None).into()),
    };

    let base_dir = req.config_path.as_deref().map(|p| Path::new(p).parent().unwrap_or(Path::new("."))).unwrap_or(Path::new("."));
    let config: SimConfig = SimConfig::load_yaml(&yaml, base_dir)?;
    validate(&config)?;

    state.supervisor.start(req.interface, config, req.config_name).await?;
    *state.active_config_yaml.write().unwrap() = Some(yaml);
    Ok(())
}

pub async fn stop(State(state): State<AppState>) -> Result<(), ApiError> {
    state.supervisor.stop().await?;
    Ok(())
}
