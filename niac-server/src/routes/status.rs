use axum::extract::State;
use axum::Json;

use crate::state::AppState;
use crate::supervisor::StatusSnapshot;

pub async fn get_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.supervisor.status().await)
}
