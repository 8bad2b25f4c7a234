//! `GET/POST/DELETE /api/v1/replay` (`spec.md` §6 / C11): status, start,
//! stop of PCAP playback against the active simulation.

use std::path::PathBuf;

use axum::extract::State;
use axum::Json;
use niac_replay::PlaybackConfig;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReplayStatus {
    pub active: bool,
}

pub async fn get_replay(State(state): State<AppState>) -> Json<ReplayStatus> {
    Json(ReplayStatus { active: state.supervisor.replay_status().await })
}

#[derive(Debug, Deserialize)]
pub struct StartReplayRequest {
    pub path: PathBuf,
    #[serde(default = "default_scale")]
    pub scale: f64,
    pub loop_ms: Option<u64>,
}

fn default_scale() -> f64 {
    1.0
}

pub async fn start_replay(State(state): State<AppState>, Json(req): Json<StartReplayRequest>) -> Result<(), ApiError> {
    let config = PlaybackConfig { path: req.path, scale: req.scale, loop_ms: req.loop_ms };
    state.supervisor.replay_start(config).await?;
    Ok(())
}

pub async fn stop_replay(State(state): State<AppState>) -> Result<(), ApiError> {
    state.supervisor.replay_stop().await?;
    Ok(())
}
