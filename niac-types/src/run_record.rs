use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed (or aborted) simulation run, appended to the `runs` bucket
/// on stop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub interface: String,
    pub config_name: String,
    pub device_count: usize,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub errors: u64,
}
