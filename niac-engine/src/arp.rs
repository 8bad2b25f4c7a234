//! The ARP Responder (C4): answers ARP requests for any simulated IP and
//! can emit gratuitous ARP on device startup. Purely reactive — no remote
//! ARP table is cached, per `spec.md` §4.4.

use crate::index::DeviceIndexSnapshot;
use crate::wire::{build_arp_reply, build_gratuitous_arp, ArpPacket, EthernetFrame};

/// Inspects one inbound frame; if it is an ARP request for an IP this
/// index knows about, returns the reply frame to transmit.
pub fn handle(bytes: &[u8], index: &DeviceIndexSnapshot) -> Option<Vec<u8>> {
    let eth = EthernetFrame::parse(bytes)?;
    let arp = ArpPacket::parse(eth.payload)?;
    if !arp.is_request() {
        return None;
    }
    let device = index.by_ipv4(&arp.target_ip)?;
    Some(build_arp_reply(device.mac, arp.target_ip, arp.sender_mac, arp.sender_ip))
}

/// Builds the gratuitous-ARP announcements for every device configured
/// with `gratuitous_arp: true`, one frame per declared IPv4 address.
pub fn gratuitous_announcements(index: &DeviceIndexSnapshot) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    for device in index.devices() {
        if !device.gratuitous_arp {
            continue;
        }
        for ip in &device.ips {
            frames.push(build_gratuitous_arp(device.mac, *ip));
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DeviceIndex;
    use niac_types::{Device, DeviceKind, IcmpConfig, MacAddr};
    use std::net::Ipv4Addr;

    fn device(name: &str, mac: [u8; 6], ip: Ipv4Addr, gratuitous: bool) -> Device {
        Device {
            name: name.into(),
            kind: DeviceKind::Router,
            mac: MacAddr::new(mac),
            ips: vec![ip],
            ipv6s: vec![],
            vlan: None,
            interfaces: vec![],
            icmp: IcmpConfig::default(),
            snmp_agent: None,
            lldp: None,
            cdp: None,
            edp: None,
            fdp: None,
            dhcp: None,
            dns: None,
            stp: None,
            traffic: None,
            port_channels: vec![],
            trunk_ports: vec![],
            gratuitous_arp: gratuitous,
        }
    }

    #[test]
    fn who_has_yields_reply_from_matching_devices_mac() {
        let index = DeviceIndex::new();
        let mac = MacAddr::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        index.rebuild(vec![device("r1", mac.octets(), Ipv4Addr::new(192, 168, 1, 1), false)]).unwrap();

        let request = crate::wire::build_ethernet_frame(
            niac_types::MacAddr::BROADCAST,
            MacAddr::new([0xaa; 6]),
            crate::wire::ETHERTYPE_ARP,
            &build_arp_request(MacAddr::new([0xaa; 6]), Ipv4Addr::new(192, 168, 1, 100), Ipv4Addr::new(192, 168, 1, 1)),
        );

        let reply = handle(&request, &index.snapshot()).expect("expected a reply");
        let eth = EthernetFrame::parse(&reply).unwrap();
        let arp = ArpPacket::parse(eth.payload).unwrap();
        assert_eq!(arp.sender_mac, mac);
        assert_eq!(arp.sender_ip, Ipv4Addr::new(192, 168, 1, 1));
    }

    #[test]
    fn request_for_unknown_ip_yields_no_reply() {
        let index = DeviceIndex::new();
        index.rebuild(vec![device("r1", [1, 2, 3, 4, 5, 6], Ipv4Addr::new(10, 0, 0, 1), false)]).unwrap();
        let request = crate::wire::build_ethernet_frame(
            niac_types::MacAddr::BROADCAST,
            MacAddr::new([0xaa; 6]),
            crate::wire::ETHERTYPE_ARP,
            &build_arp_request(MacAddr::new([0xaa; 6]), Ipv4Addr::new(192, 168, 1, 100), Ipv4Addr::new(10, 0, 0, 99)),
        );
        assert!(handle(&request, &index.snapshot()).is_none());
    }

    #[test]
    fn gratuitous_announcements_only_cover_opted_in_devices() {
        let index = DeviceIndex::new();
        index
            .rebuild(vec![
                device("r1", [1, 2, 3, 4, 5, 6], Ipv4Addr::new(10, 0, 0, 1), true),
                device("r2", [6, 5, 4, 3, 2, 1], Ipv4Addr::new(10, 0, 0, 2), false),
            ])
            .unwrap();
        let frames = gratuitous_announcements(&index.snapshot());
        assert_eq!(frames.len(), 1);
    }

    fn build_arp_request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Vec<u8> {
        let mut pkt = Vec::with_capacity(28);
        pkt.extend_from_slice(&1u16.to_be_bytes());
        pkt.extend_from_slice(&0x0800u16.to_be_bytes());
        pkt.push(6);
        pkt.push(4);
        pkt.extend_from_slice(&1u16.to_be_bytes());
        pkt.extend_from_slice(&sender_mac.octets());
        pkt.extend_from_slice(&sender_ip.octets());
        pkt.extend_from_slice(&MacAddr::ZERO.octets());
        pkt.extend_from_slice(&target_ip.octets());
        pkt
    }
}
