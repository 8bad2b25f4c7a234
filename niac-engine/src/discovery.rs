//! Discovery Transmitters (C9): per-device periodic LLDP/CDP/EDP/FDP
//! announcements, and the receiver side that turns inbound announcements
//! into Neighbor Records (`spec.md` §4.9).
//!
//! The four protocols share one internal TLV encoding here. Real LLDP,
//! CDP, EDP and FDP frames differ at the byte level (LLDP's TLVs are
//! standardized, Cisco/Extreme/Foundry's are proprietary SNAP payloads);
//! what every management tool actually keys off is the same handful of
//! fields (chassis id, port id, TTL, names, mgmt address), so one TLV
//! layout carries all four, dressed in each protocol's own destination
//! MAC / EtherType / SNAP OUI framing (`crate::bus` classifies on exactly
//! those framing bytes, not on TLV content).

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use niac_types::{DeviceKind, DiscoveryProtocol, MacAddr, NeighborRecord};

use crate::index::DeviceIndexSnapshot;
use crate::wire::{build_ethernet_frame, EthernetFrame};

const ETHERTYPE_LLDP: u16 = 0x88cc;
const MAC_LLDP: MacAddr = MacAddr::new([0x01, 0x80, 0xc2, 0x00, 0x00, 0x0e]);
const MAC_CDP: MacAddr = MacAddr::new([0x01, 0x00, 0x0c, 0xcc, 0xcc, 0xcc]);
const SNAP_OUI_CDP: [u8; 3] = [0x00, 0x00, 0x0c];
const SNAP_OUI_EDP: [u8; 3] = [0x00, 0xe0, 0x2b];
const SNAP_OUI_FDP: [u8; 3] = [0x00, 0xe0, 0x52];
const SNAP_PROTO_ID: [u8; 2] = [0x20, 0x00];

const TLV_CHASSIS_ID: u8 = 1;
const TLV_PORT_ID: u8 = 2;
const TLV_TTL: u8 = 3;
const TLV_SYSTEM_NAME: u8 = 4;
const TLV_SYSTEM_DESCRIPTION: u8 = 5;
const TLV_MGMT_ADDRESS: u8 = 6;
const TLV_PLATFORM: u8 = 7;
const TLV_SOFTWARE_VERSION: u8 = 8;
const TLV_END: u8 = 0;

fn push_tlv(buf: &mut Vec<u8>, kind: u8, value: &[u8]) {
    buf.push(kind);
    buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
    buf.extend_from_slice(value);
}

fn parse_tlvs(mut payload: &[u8]) -> HashMap<u8, Vec<u8>> {
    let mut tlvs = HashMap::new();
    while payload.len() >= 3 {
        let kind = payload[0];
        let len = u16::from_be_bytes([payload[1], payload[2]]) as usize;
        if kind == TLV_END || payload.len() < 3 + len {
            break;
        }
        tlvs.insert(kind, payload[3..3 + len].to_vec());
        payload = &payload[3 + len..];
    }
    tlvs
}

/// Everything a discovery announcement carries about its sender.
pub struct Announcement<'a> {
    pub device_name: &'a str,
    pub chassis_mac: MacAddr,
    pub port_id: &'a str,
    pub ttl_secs: u16,
    pub system_description: &'a str,
    pub mgmt_address: Option<Ipv4Addr>,
    pub platform: Option<&'a str>,
    pub software_version: Option<&'a str>,
}

fn encode(announcement: &Announcement<'_>) -> Vec<u8> {
    let mut body = Vec::new();
    push_tlv(&mut body, TLV_CHASSIS_ID, &announcement.chassis_mac.octets());
    push_tlv(&mut body, TLV_PORT_ID, announcement.port_id.as_bytes());
    push_tlv(&mut body, TLV_TTL, &announcement.ttl_secs.to_be_bytes());
    push_tlv(&mut body, TLV_SYSTEM_NAME, announcement.device_name.as_bytes());
    push_tlv(&mut body, TLV_SYSTEM_DESCRIPTION, announcement.system_description.as_bytes());
    if let Some(addr) = announcement.mgmt_address {
        push_tlv(&mut body, TLV_MGMT_ADDRESS, &addr.octets());
    }
    if let Some(platform) = announcement.platform {
        push_tlv(&mut body, TLV_PLATFORM, platform.as_bytes());
    }
    if let Some(version) = announcement.software_version {
        push_tlv(&mut body, TLV_SOFTWARE_VERSION, version.as_bytes());
    }
    push_tlv(&mut body, TLV_END, &[]);
    body
}

fn build_snap_header(oui: [u8; 3]) -> Vec<u8> {
    let mut header = vec![0xaa, 0xaa, 0x03];
    header.extend_from_slice(&oui);
    header.extend_from_slice(&SNAP_PROTO_ID);
    header
}

/// Builds the wire frame for one protocol/device pair.
pub fn build_frame(protocol: DiscoveryProtocol, src_mac: MacAddr, announcement: &Announcement<'_>) -> Vec<u8> {
    let body = encode(announcement);
    match protocol {
        DiscoveryProtocol::Lldp => build_ethernet_frame(MAC_LLDP, src_mac, ETHERTYPE_LLDP, &body),
        DiscoveryProtocol::Cdp => {
            let mut payload = build_snap_header(SNAP_OUI_CDP);
            payload.extend_from_slice(&body);
            build_ethernet_frame(MAC_CDP, src_mac, payload.len() as u16, &payload)
        }
        DiscoveryProtocol::Edp => {
            let mut payload = build_snap_header(SNAP_OUI_EDP);
            payload.extend_from_slice(&body);
            build_ethernet_frame(MacAddr::BROADCAST, src_mac, payload.len() as u16, &payload)
        }
        DiscoveryProtocol::Fdp => {
            let mut payload = build_snap_header(SNAP_OUI_FDP);
            payload.extend_from_slice(&body);
            build_ethernet_frame(MacAddr::BROADCAST, src_mac, payload.len() as u16, &payload)
        }
    }
}

/// Builds every announcement a device currently owes, one frame per
/// enabled protocol and per declared port (falling back to the device
/// name as the port id when no interfaces are configured).
pub fn announcements_for_device(device: &niac_types::Device) -> Vec<(DiscoveryProtocol, Vec<u8>)> {
    let ports: Vec<&str> = if device.interfaces.is_empty() {
        vec![device.name.as_str()]
    } else {
        device.interfaces.iter().map(|i| i.name.as_str()).collect()
    };

    let mut frames = Vec::new();
    let protocols: [(Option<&niac_types::DiscoveryConfig>, DiscoveryProtocol); 4] = [
        (device.lldp.as_ref(), DiscoveryProtocol::Lldp),
        (device.cdp.as_ref(), DiscoveryProtocol::Cdp),
        (device.edp.as_ref(), DiscoveryProtocol::Edp),
        (device.fdp.as_ref(), DiscoveryProtocol::Fdp),
    ];

    for (config, protocol) in protocols {
        let Some(config) = config else { continue };
        let hold_time = (config.interval_secs.saturating_mul(3)).min(u16::MAX as u64) as u16;
        for port in &ports {
            let announcement = Announcement {
                device_name: &device.name,
                chassis_mac: device.mac,
                port_id: port,
                ttl_secs: hold_time,
                system_description: device_kind_str(&device.kind),
                mgmt_address: device.primary_ip(),
                platform: config.platform.as_deref(),
                software_version: config.software_version.as_deref(),
            };
            frames.push((protocol, build_frame(protocol, device.mac, &announcement)));
        }
    }
    frames
}

/// Parses an inbound announcement (matched by [`crate::bus::HandlerKind`]
/// already) into the fields needed to update a Neighbor Record, given the
/// local device/port that received it.
pub fn parse_announcement(protocol: DiscoveryProtocol, bytes: &[u8]) -> Option<(String, MacAddr, String, Option<Ipv4Addr>)> {
    let eth = EthernetFrame::parse(bytes)?;
    let body = match protocol {
        DiscoveryProtocol::Lldp => eth.payload,
        DiscoveryProtocol::Cdp | DiscoveryProtocol::Edp | DiscoveryProtocol::Fdp => {
            if eth.payload.len() < 8 {
                return None;
            }
            &eth.payload[8..]
        }
    };
    let tlvs = parse_tlvs(body);
    let system_name = tlvs.get(&TLV_SYSTEM_NAME).map(|v| String::from_utf8_lossy(v).into_owned())?;
    let port_id = tlvs.get(&TLV_PORT_ID).map(|v| String::from_utf8_lossy(v).into_owned())?;
    let mgmt_address = tlvs.get(&TLV_MGMT_ADDRESS).filter(|v| v.len() == 4).map(|v| Ipv4Addr::new(v[0], v[1], v[2], v[3]));
    Some((system_name, eth.src, port_id, mgmt_address))
}

/// Shared neighbor table: keyed by `(local_device, local_port, protocol)`
/// so the same two devices can show up once per enabled protocol, matching
/// the Neighbor Record shape in `spec.md` §3.
#[derive(Clone, Default)]
pub struct NeighborTable {
    inner: Arc<RwLock<HashMap<(String, String, DiscoveryProtocol), NeighborRecord>>>,
}

impl NeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records (or refreshes) a neighbor sighting.
    pub fn observe(&self, local_device: &str, local_port: &str, remote_device: &str, remote_port: &str, protocol: DiscoveryProtocol, mgmt_address: Option<Ipv4Addr>) {
        let record = NeighborRecord {
            local_device: local_device.to_string(),
            local_port: local_port.to_string(),
            remote_device: remote_device.to_string(),
            remote_port: remote_port.to_string(),
            protocol,
            mgmt_address,
            last_seen: Utc::now(),
        };
        let key = (local_device.to_string(), local_port.to_string(), protocol);
        self.inner.write().unwrap().insert(key, record);
    }

    pub fn snapshot(&self) -> Vec<NeighborRecord> {
        self.inner.read().unwrap().values().cloned().collect()
    }

    /// Drops entries whose `last_seen` is older than `max_age`, per the
    /// aging behavior real discovery-protocol neighbor tables use.
    pub fn expire_older_than(&self, max_age: chrono::Duration) {
        let cutoff = Utc::now() - max_age;
        self.inner.write().unwrap().retain(|_, record| record.last_seen >= cutoff);
    }
}

fn index_device_ports<'a>(index: &'a DeviceIndexSnapshot) -> impl Iterator<Item = &'a Arc<niac_types::Device>> {
    index.devices().iter()
}

/// Given an inbound frame already classified as discovery traffic and the
/// device it arrived "at" (the closest simulated device, chosen by the
/// caller from ingest port context), updates the neighbor table.
pub fn receive(table: &NeighborTable, local_device: &str, local_port: &str, protocol: DiscoveryProtocol, bytes: &[u8]) {
    if let Some((remote_device, _remote_mac, remote_port, mgmt_address)) = parse_announcement(protocol, bytes) {
        table.observe(local_device, local_port, &remote_device, &remote_port, protocol, mgmt_address);
    }
}

/// Builds the announcements owed by every enabled device in the index,
/// for the periodic transmitter task to send.
pub fn due_announcements(index: &DeviceIndexSnapshot) -> Vec<Vec<u8>> {
    index_device_ports(index).flat_map(|d| announcements_for_device(d).into_iter().map(|(_, frame)| frame)).collect()
}

fn device_kind_str(kind: &DeviceKind) -> &'static str {
    match kind {
        DeviceKind::Router => "router",
        DeviceKind::Switch => "switch",
        DeviceKind::AccessPoint => "access-point",
        DeviceKind::Server => "server",
        DeviceKind::Workstation => "workstation",
        DeviceKind::Firewall => "firewall",
        DeviceKind::Other(_) => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DeviceIndex;
    use niac_types::{Device, DiscoveryConfig, IcmpConfig};

    fn device_with_lldp() -> Device {
        Device {
            name: "sw1".into(),
            kind: DeviceKind::Switch,
            mac: MacAddr::new([1, 2, 3, 4, 5, 6]),
            ips: vec![Ipv4Addr::new(10, 0, 0, 1)],
            ipv6s: vec![],
            vlan: None,
            interfaces: vec![],
            icmp: IcmpConfig::default(),
            snmp_agent: None,
            lldp: Some(DiscoveryConfig { interval_secs: 30, platform: Some("niac-switch".into()), software_version: Some("1.0".into()) }),
            cdp: None,
            edp: None,
            fdp: None,
            dhcp: None,
            dns: None,
            stp: None,
            traffic: None,
            port_channels: vec![],
            trunk_ports: vec![],
            gratuitous_arp: false,
        }
    }

    #[test]
    fn lldp_round_trips_system_name_and_port() {
        let device = device_with_lldp();
        let frames = announcements_for_device(&device);
        assert_eq!(frames.len(), 1);
        let (protocol, frame) = &frames[0];
        assert_eq!(*protocol, DiscoveryProtocol::Lldp);

        let (system_name, src_mac, port_id, mgmt) = parse_announcement(DiscoveryProtocol::Lldp, frame).unwrap();
        assert_eq!(system_name, "sw1");
        assert_eq!(src_mac, device.mac);
        assert_eq!(port_id, "sw1");
        assert_eq!(mgmt, Some(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn only_enabled_protocols_produce_frames() {
        let mut device = device_with_lldp();
        device.cdp = Some(DiscoveryConfig { interval_secs: 60, platform: None, software_version: None });
        let frames = announcements_for_device(&device);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().any(|(p, _)| *p == DiscoveryProtocol::Lldp));
        assert!(frames.iter().any(|(p, _)| *p == DiscoveryProtocol::Cdp));
    }

    #[test]
    fn neighbor_table_records_and_expires() {
        let table = NeighborTable::new();
        table.observe("r1", "eth0", "sw1", "gi0/1", DiscoveryProtocol::Lldp, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(table.snapshot().len(), 1);
        table.expire_older_than(chrono::Duration::seconds(-1));
        assert_eq!(table.snapshot().len(), 0);
    }

    #[test]
    fn due_announcements_covers_every_indexed_device() {
        let index = DeviceIndex::new();
        index.rebuild(vec![device_with_lldp()]).unwrap();
        assert_eq!(due_announcements(&index.snapshot()).len(), 1);
    }
}
