//! The STP/VLAN/Topology Emitter (C10): periodic Configuration BPDUs for
//! devices with STP enabled, and a topology export surfacing trunk ports
//! and port-channels. No spanning tree is actually computed — bridge
//! priority, max age and forward delay are taken straight from config and
//! broadcast as-is (`spec.md` §4.10).

use std::collections::BTreeMap;

use niac_types::{Device, MacAddr};
use serde::Serialize;

use crate::index::DeviceIndexSnapshot;
use crate::wire::build_ethernet_frame;

/// Standard STP Hello interval; not configurable per `spec.md`'s
/// `StpConfig` (bridge priority, max age, forward delay only).
pub const HELLO_TIME_SECS: u8 = 2;

const MAC_STP_BPDU: MacAddr = MacAddr::new([0x01, 0x80, 0xc2, 0x00, 0x00, 0x00]);
const LLC_STP: [u8; 3] = [0x42, 0x42, 0x03];

/// Builds one 802.1D Configuration BPDU for a device's current STP
/// parameters. The bridge id embeds the device's own MAC (low 6 bytes)
/// and its configured priority (high 2 bytes), matching the real
/// protocol's bridge-id layout.
pub fn build_config_bpdu(device: &Device, stp: &niac_types::StpConfig) -> Vec<u8> {
    let mut bpdu = Vec::with_capacity(35);
    bpdu.extend_from_slice(&0u16.to_be_bytes()); // protocol id
    bpdu.push(0); // protocol version
    bpdu.push(0); // bpdu type: configuration
    bpdu.push(0); // flags: no topology change

    let bridge_id = bridge_id_bytes(stp.bridge_priority, device.mac);
    bpdu.extend_from_slice(&bridge_id); // root id (we never compute a real root)
    bpdu.extend_from_slice(&0u32.to_be_bytes()); // root path cost
    bpdu.extend_from_slice(&bridge_id); // bridge id
    bpdu.extend_from_slice(&0u16.to_be_bytes()); // port id

    bpdu.extend_from_slice(&0u16.to_be_bytes()); // message age (1/256s units)
    bpdu.extend_from_slice(&((stp.max_age_secs as u16) << 8).to_be_bytes());
    bpdu.extend_from_slice(&((HELLO_TIME_SECS as u16) << 8).to_be_bytes());
    bpdu.extend_from_slice(&((stp.forward_delay_secs as u16) << 8).to_be_bytes());

    let mut payload = LLC_STP.to_vec();
    payload.extend_from_slice(&bpdu);
    build_ethernet_frame(MAC_STP_BPDU, device.mac, payload.len() as u16, &payload)
}

fn bridge_id_bytes(priority: u16, mac: MacAddr) -> [u8; 8] {
    let mut id = [0u8; 8];
    id[0..2].copy_from_slice(&priority.to_be_bytes());
    id[2..8].copy_from_slice(&mac.octets());
    id
}

/// Every Configuration BPDU owed right now by devices with STP enabled.
pub fn due_bpdus(index: &DeviceIndexSnapshot) -> Vec<Vec<u8>> {
    index
        .devices()
        .iter()
        .filter_map(|d| d.stp.as_ref().map(|stp| build_config_bpdu(d, stp)))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct TopologyNode {
    pub name: String,
    pub kind: String,
    pub mac: String,
    pub vlan: Option<u16>,
    pub stp_bridge_priority: Option<u16>,
    pub trunk_ports: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortChannelEdge {
    pub device: String,
    pub name: String,
    pub members: Vec<String>,
}

/// The declared, un-computed topology graph: nodes per device plus the
/// port-channel groupings and trunk ports they advertise. No spanning
/// tree result is included — `spec.md` §4.10 is explicit that none is
/// computed.
#[derive(Debug, Clone, Serialize, Default)]
pub struct TopologySnapshot {
    pub nodes: Vec<TopologyNode>,
    pub port_channels: Vec<PortChannelEdge>,
}

pub fn build_topology(index: &DeviceIndexSnapshot) -> TopologySnapshot {
    let mut nodes = Vec::with_capacity(index.len());
    let mut port_channels = Vec::new();

    for device in index.devices() {
        nodes.push(TopologyNode {
            name: device.name.clone(),
            kind: format!("{:?}", device.kind),
            mac: device.mac.to_string(),
            vlan: device.vlan.as_ref().map(|v| v.0),
            stp_bridge_priority: device.stp.as_ref().map(|s| s.bridge_priority),
            trunk_ports: device.trunk_ports.clone(),
        });
        for pc in &device.port_channels {
            port_channels.push(PortChannelEdge { device: device.name.clone(), name: pc.name.clone(), members: pc.members.clone() });
        }
    }

    TopologySnapshot { nodes, port_channels }
}

/// Groups devices sharing a VLAN, a cheap adjacency hint surfaced
/// alongside the topology export for dashboards that want to cluster
/// nodes without recomputing membership themselves.
pub fn vlan_membership(index: &DeviceIndexSnapshot) -> BTreeMap<u16, Vec<String>> {
    let mut map: BTreeMap<u16, Vec<String>> = BTreeMap::new();
    for device in index.devices() {
        if let Some(vlan) = &device.vlan {
            map.entry(vlan.0).or_default().push(device.name.clone());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DeviceIndex;
    use niac_types::{DeviceKind, IcmpConfig, PortChannel, StpConfig, Vlan};
    use std::net::Ipv4Addr;

    fn device(name: &str, mac: [u8; 6]) -> Device {
        Device {
            name: name.into(),
            kind: DeviceKind::Switch,
            mac: MacAddr::new(mac),
            ips: vec![Ipv4Addr::new(10, 0, 0, 1)],
            ipv6s: vec![],
            vlan: Vlan::new(10),
            interfaces: vec![],
            icmp: IcmpConfig::default(),
            snmp_agent: None,
            lldp: None,
            cdp: None,
            edp: None,
            fdp: None,
            dhcp: None,
            dns: None,
            stp: Some(StpConfig { bridge_priority: 32768, max_age_secs: 20, forward_delay_secs: 15 }),
            traffic: None,
            port_channels: vec![PortChannel { name: "Po1".into(), members: vec!["Gi0/1".into(), "Gi0/2".into()] }],
            trunk_ports: vec!["Gi0/3".into()],
            gratuitous_arp: false,
        }
    }

    #[test]
    fn bpdu_embeds_priority_and_mac_in_bridge_id() {
        let d = device("sw1", [1, 2, 3, 4, 5, 6]);
        let frame = build_config_bpdu(&d, d.stp.as_ref().unwrap());
        // LLC(3) + eth header(14) precede the bridge id at offset 14+3+4+8.
        let bridge_id_offset = 14 + 3 + 4 + 8;
        let priority = u16::from_be_bytes([frame[bridge_id_offset], frame[bridge_id_offset + 1]]);
        assert_eq!(priority, 32768);
        assert_eq!(&frame[bridge_id_offset + 2..bridge_id_offset + 8], &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn due_bpdus_only_covers_stp_enabled_devices() {
        let index = DeviceIndex::new();
        let mut no_stp = device("sw2", [9, 9, 9, 9, 9, 9]);
        no_stp.stp = None;
        no_stp.ips = vec![Ipv4Addr::new(10, 0, 0, 2)];
        index.rebuild(vec![device("sw1", [1, 2, 3, 4, 5, 6]), no_stp]).unwrap();
        assert_eq!(due_bpdus(&index.snapshot()).len(), 1);
    }

    #[test]
    fn topology_surfaces_port_channels_and_trunks() {
        let index = DeviceIndex::new();
        index.rebuild(vec![device("sw1", [1, 2, 3, 4, 5, 6])]).unwrap();
        let topo = build_topology(&index.snapshot());
        assert_eq!(topo.nodes.len(), 1);
        assert_eq!(topo.port_channels.len(), 1);
        assert_eq!(topo.nodes[0].trunk_ports, vec!["Gi0/3"]);
    }

    #[test]
    fn vlan_membership_groups_by_vlan() {
        let index = DeviceIndex::new();
        index.rebuild(vec![device("sw1", [1, 2, 3, 4, 5, 6])]).unwrap();
        let membership = vlan_membership(&index.snapshot());
        assert_eq!(membership.get(&10), Some(&vec!["sw1".to_string()]));
    }
}
