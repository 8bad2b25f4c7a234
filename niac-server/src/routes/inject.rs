//! `POST/DELETE /api/v1/inject` (`spec.md` §4.12, C12): set or clear an
//! error-injection rate for a (device, interface, error-type) triple.

use axum::extract::State;
use axum::Json;
use niac_engine::inject::ErrorKind;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InjectRequest {
    pub device: String,
    pub interface: String,
    pub error_type: ErrorKind,
    #[serde(default)]
    pub rate_percent: u8,
}

pub async fn set_inject(State(state): State<AppState>, Json(req): Json<InjectRequest>) -> Result<(), ApiError> {
    state.supervisor.inject_set(req.device, req.interface, req.error_type, req.rate_percent).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct ClearInjectRequest {
    pub device: String,
    pub interface: String,
    pub error_type: ErrorKind,
}

pub async fn clear_inject(State(state): State<AppState>, Json(req): Json<ClearInjectRequest>) -> Result<(), ApiError> {
    state.supervisor.inject_clear(req.device, req.interface, req.error_type).await?;
    Ok(())
}
