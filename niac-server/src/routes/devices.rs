use axum::extract::State;
use axum::Json;
use niac_types::Device;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list_devices(State(state): State<AppState>) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(state.supervisor.devices().await?))
}
