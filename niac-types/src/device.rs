use std::collections::BTreeSet;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::mac::MacAddr;

/// The kind of equipment a [`Device`] is pretending to be. Drives default
/// `sysDescr`/`sysObjectID` templates when a device doesn't override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKind {
    Router,
    Switch,
    AccessPoint,
    Server,
    Workstation,
    Firewall,
    Other(String),
}

impl Default for DeviceKind {
    fn default() -> Self {
        DeviceKind::Other(String::new())
    }
}

/// A VLAN tag, restricted to the valid 802.1Q range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Vlan(pub u16);

impl Vlan {
    pub fn new(id: u16) -> Option<Self> {
        if (1..=4094).contains(&id) {
            Some(Vlan(id))
        } else {
            None
        }
    }
}

/// A logical port on a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    #[serde(default)]
    pub speed_mbps: Option<u64>,
    #[serde(default)]
    pub full_duplex: bool,
    #[serde(default = "default_true")]
    pub admin_up: bool,
    #[serde(default = "default_true")]
    pub oper_up: bool,
    #[serde(default)]
    pub vlan: Option<Vlan>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnmpAgentConfig {
    pub community: String,
    #[serde(default)]
    pub walk_file: Option<String>,
    #[serde(default)]
    pub sys_contact: String,
    #[serde(default)]
    pub sys_location: String,
    #[serde(default)]
    pub writable_oids: BTreeSet<String>,
    #[serde(default)]
    pub traps: Vec<TrapPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapPolicy {
    pub metric: ThresholdMetric,
    pub threshold: f64,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMetric {
    Cpu,
    Memory,
    Disk,
    InterfaceErrors,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_discovery_interval")]
    pub interval_secs: u64,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub software_version: Option<String>,
}

fn default_discovery_interval() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticLeaseConfig {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
    #[serde(default)]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DhcpPoolConfig {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
    pub netmask: Ipv4Addr,
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u32,
}

fn default_lease_secs() -> u32 {
    86400
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DhcpConfig {
    #[serde(default)]
    pub static_leases: Vec<StaticLeaseConfig>,
    #[serde(default)]
    pub pool: Option<DhcpPoolConfig>,
    #[serde(default)]
    pub router: Option<Ipv4Addr>,
    #[serde(default)]
    pub dns_servers: Vec<Ipv4Addr>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub ntp_servers: Vec<Ipv4Addr>,
    #[serde(default)]
    pub domain_search: Vec<String>,
    #[serde(default)]
    pub tftp_server: Option<String>,
    #[serde(default)]
    pub bootfile: Option<String>,
    #[serde(default)]
    pub v6: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsRecordConfig {
    #[serde(default)]
    pub forward: std::collections::BTreeMap<String, Ipv4Addr>,
    #[serde(default = "default_dns_ttl")]
    pub ttl_secs: u32,
}

fn default_dns_ttl() -> u32 {
    300
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IcmpConfig {
    #[serde(default = "default_ttl")]
    pub ttl: u8,
}

fn default_ttl() -> u8 {
    64
}

impl Default for IcmpConfig {
    fn default() -> Self {
        IcmpConfig { ttl: default_ttl() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StpConfig {
    pub bridge_priority: u16,
    #[serde(default = "default_max_age")]
    pub max_age_secs: u8,
    #[serde(default = "default_forward_delay")]
    pub forward_delay_secs: u8,
}

fn default_max_age() -> u8 {
    20
}
fn default_forward_delay() -> u8 {
    15
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortChannel {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_traffic_interval")]
    pub interval_secs: u64,
}

fn default_traffic_interval() -> u64 {
    60
}

/// The central entity of the simulation: one impersonated piece of
/// equipment, addressable by name, MAC, and one or more IP addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    #[serde(default)]
    pub kind: DeviceKind,
    pub mac: MacAddr,
    #[serde(default)]
    pub ips: Vec<Ipv4Addr>,
    #[serde(default)]
    pub ipv6s: Vec<Ipv6Addr>,
    #[serde(default)]
    pub vlan: Option<Vlan>,
    #[serde(default)]
    pub interfaces: Vec<Interface>,

    #[serde(default)]
    pub icmp: IcmpConfig,
    #[serde(default)]
    pub snmp_agent: Option<SnmpAgentConfig>,
    #[serde(default)]
    pub lldp: Option<DiscoveryConfig>,
    #[serde(default)]
    pub cdp: Option<DiscoveryConfig>,
    #[serde(default)]
    pub edp: Option<DiscoveryConfig>,
    #[serde(default)]
    pub fdp: Option<DiscoveryConfig>,
    #[serde(default)]
    pub dhcp: Option<DhcpConfig>,
    #[serde(default)]
    pub dns: Option<DnsRecordConfig>,
    #[serde(default)]
    pub stp: Option<StpConfig>,
    #[serde(default)]
    pub traffic: Option<TrafficConfig>,
    #[serde(default)]
    pub port_channels: Vec<PortChannel>,
    #[serde(default)]
    pub trunk_ports: Vec<String>,
    #[serde(default)]
    pub gratuitous_arp: bool,
}

impl Device {
    /// All IPv4 addresses this device answers for.
    pub fn ipv4_addrs(&self) -> &[Ipv4Addr] {
        &self.ips
    }

    /// The address used as DHCP server-identifier / DNS source, by
    /// convention the first declared IPv4 address.
    pub fn primary_ip(&self) -> Option<Ipv4Addr> {
        self.ips.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlan_rejects_out_of_range() {
        assert!(Vlan::new(0).is_none());
        assert!(Vlan::new(4095).is_none());
        assert!(Vlan::new(1).is_some());
        assert!(Vlan::new(4094).is_some());
    }
}
