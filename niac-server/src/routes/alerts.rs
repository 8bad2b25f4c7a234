//! `GET/PUT /api/v1/alerts` (`spec.md` §6): threshold/webhook policy.
//! Stored in memory only — it governs the control plane's own webhook
//! firing, independent of any device's SNMP trap configuration.

use axum::extract::State;
use axum::Json;

use crate::state::{AlertPolicy, AppState};

pub async fn get_alerts(State(state): State<AppState>) -> Json<AlertPolicy> {
    Json(state.alerts.read().unwrap().clone())
}

pub async fn put_alerts(State(state): State<AppState>, Json(policy): Json<AlertPolicy>) -> Json<AlertPolicy> {
    *state.alerts.write().unwrap() = policy.clone();
    Json(policy)
}
