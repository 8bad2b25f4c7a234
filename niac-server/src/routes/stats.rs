use axum::extract::State;
use axum::Json;
use niac_engine::stats::StatsSnapshot;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsSnapshot>, ApiError> {
    Ok(Json(state.supervisor.stats().await?))
}
