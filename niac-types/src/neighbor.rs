use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiscoveryProtocol {
    Lldp,
    Cdp,
    Edp,
    Fdp,
}

/// A link-layer neighbor observed (or announced) on the wire, keyed by
/// device name rather than pointer per the arena-style ownership note in
/// `spec.md` §9.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub local_device: String,
    pub local_port: String,
    pub remote_device: String,
    pub remote_port: String,
    pub protocol: DiscoveryProtocol,
    pub mgmt_address: Option<Ipv4Addr>,
    pub last_seen: DateTime<Utc>,
}
