//! Shared state handed to every axum handler: the supervisor handle, the
//! persistence layer, the optional bearer token, and the in-memory alert
//! policy (`GET/PUT /api/v1/alerts`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use niac_types::ThresholdMetric;
use serde::{Deserialize, Serialize};

use crate::logging::LogBroadcaster;
use crate::ratelimit::RateLimiter;
use crate::supervisor::EngineHandle;

/// One threshold-crossing rule: fire a webhook when `metric` crosses
/// `threshold` (percent). Mirrors `niac_types::TrapPolicy` but lives at the
/// control-plane layer since it's independent of any one device's SNMP
/// agent — it watches the aggregate stats snapshot instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub metric: ThresholdMetric,
    pub threshold: f64,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertPolicy {
    pub rules: Vec<AlertRule>,
}

#[derive(Clone)]
pub struct AppState {
    pub supervisor: EngineHandle,
    pub store: Arc<niac_store::Store>,
    pub token: Option<Arc<str>>,
    pub alerts: Arc<RwLock<AlertPolicy>>,
    pub rate_limiter: Arc<RateLimiter>,
    /// The YAML of whatever config started (or last reconciled) the active
    /// run, so `GET /api/v1/config` can return it verbatim.
    pub active_config_yaml: Arc<RwLock<Option<String>>>,
    pub log_broadcaster: LogBroadcaster,
    pub(crate) shutting_down: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(supervisor: EngineHandle, store: Arc<niac_store::Store>, token: Option<String>, log_broadcaster: LogBroadcaster) -> Self {
        AppState {
            supervisor,
            store,
            token: token.map(|t| t.into()),
            alerts: Arc::new(RwLock::new(AlertPolicy::default())),
            rate_limiter: Arc::new(RateLimiter::new()),
            active_config_yaml: Arc::new(RwLock::new(None)),
            log_broadcaster,
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}
