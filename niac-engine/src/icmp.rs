//! The ICMP v4/v6 Responder (C5): echo reply with the impersonated
//! device's TTL, destination-unreachable for datagrams the other handlers
//! rejected, and IPv6 Neighbor Solicitation/Advertisement as ARP's analog
//! (`spec.md` §4.5).

use std::net::Ipv6Addr;

use crate::index::DeviceIndexSnapshot;
use crate::wire::{
    self, build_ethernet_frame, build_icmp_echo_reply, build_icmp_port_unreachable, build_ipv4_packet, EthernetFrame,
    IcmpEcho, Ipv4Packet, ETHERTYPE_IPV4,
};

/// Handles one inbound IPv4 ICMP frame; returns the echo-reply frame to
/// transmit when it's an echo request for a device this index knows.
pub fn handle_echo_request(bytes: &[u8], index: &DeviceIndexSnapshot) -> Option<Vec<u8>> {
    let eth = EthernetFrame::parse(bytes)?;
    let ip = Ipv4Packet::parse(eth.payload)?;
    let device = index.by_ipv4(&ip.dst)?;
    let echo = IcmpEcho::parse(ip.payload)?;
    if echo.kind != wire::ICMP_ECHO_REQUEST {
        return None;
    }

    let reply_icmp = build_icmp_echo_reply(echo.identifier, echo.sequence, echo.payload);
    let reply_ip = build_ipv4_packet(ip.dst, ip.src, wire::PROTO_ICMP, device.icmp.ttl, &reply_icmp);
    Some(build_ethernet_frame(eth.src, device.mac, ETHERTYPE_IPV4, &reply_ip))
}

/// Builds a destination-unreachable (port unreachable) reply for a UDP
/// datagram addressed to a simulated IP whose destination port no handler
/// claimed, per `spec.md` §4.5.
pub fn unreachable_for(bytes: &[u8], index: &DeviceIndexSnapshot) -> Option<Vec<u8>> {
    let eth = EthernetFrame::parse(bytes)?;
    let ip = Ipv4Packet::parse(eth.payload)?;
    let device = index.by_ipv4(&ip.dst)?;
    let icmp = build_icmp_port_unreachable(eth.payload);
    let reply_ip = build_ipv4_packet(ip.dst, ip.src, wire::PROTO_ICMP, device.icmp.ttl, &icmp);
    Some(build_ethernet_frame(eth.src, device.mac, ETHERTYPE_IPV4, &reply_ip))
}

const ICMPV6_NEIGHBOR_SOLICITATION: u8 = 135;
const ICMPV6_NEIGHBOR_ADVERTISEMENT: u8 = 136;
const IPV6_HEADER_SIZE: usize = 40;
const PROTO_ICMPV6: u8 = 58;

/// Minimal IPv6 Neighbor Solicitation parser: enough to pull the target
/// address out of a request destined for one of our simulated addresses.
/// Full IPv6 transport is out of scope (`spec.md` §1 non-goals); this
/// mirrors ARP's request/reply shape for the one case devices are polled
/// on.
fn parse_target_address(icmpv6_payload: &[u8]) -> Option<Ipv6Addr> {
    // ICMPv6 NS: type(1) code(1) checksum(2) reserved(4) target(16).
    if icmpv6_payload.len() < 24 || icmpv6_payload[0] != ICMPV6_NEIGHBOR_SOLICITATION {
        return None;
    }
    let mut octets = [0u8; 16];
    octets.copy_from_slice(&icmpv6_payload[8..24]);
    Some(Ipv6Addr::from(octets))
}

/// Handles one inbound IPv6 frame; returns a Neighbor Advertisement when
/// it's a Solicitation for a device's IPv6 address.
pub fn handle_neighbor_solicitation(bytes: &[u8], index: &DeviceIndexSnapshot) -> Option<Vec<u8>> {
    let eth = EthernetFrame::parse(bytes)?;
    if eth.payload.len() < IPV6_HEADER_SIZE {
        return None;
    }
    let next_header = eth.payload[6];
    if next_header != PROTO_ICMPV6 {
        return None;
    }
    let icmpv6_payload = &eth.payload[IPV6_HEADER_SIZE..];
    let target = parse_target_address(icmpv6_payload)?;
    let device = index.by_ipv6(&target)?;

    let mut na = vec![0u8; 24];
    na[0] = ICMPV6_NEIGHBOR_ADVERTISEMENT;
    na[4] = 0x60; // R=0, S=1, O=1
    na[8..24].copy_from_slice(&target.octets());

    let mut ipv6 = vec![0u8; IPV6_HEADER_SIZE];
    ipv6[0] = 0x60;
    ipv6[6] = PROTO_ICMPV6;
    ipv6[7] = 255; // hop limit for NDP
    ipv6[8..24].copy_from_slice(&target.octets());
    ipv6[24..40].copy_from_slice(&eth.payload[8..24]); // dest = requester's source

    let mut payload_len_buf = ((na.len()) as u16).to_be_bytes();
    std::mem::swap(&mut ipv6[4], &mut payload_len_buf[0]);
    ipv6[5] = payload_len_buf[1];
    ipv6.extend_from_slice(&na);

    Some(build_ethernet_frame(eth.src, device.mac, wire::ETHERTYPE_IPV6, &ipv6))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DeviceIndex;
    use niac_types::{Device, DeviceKind, DnsRecordConfig, IcmpConfig, MacAddr};
    use std::net::Ipv4Addr;

    fn device(name: &str, mac: [u8; 6], ip: Ipv4Addr, ttl: u8) -> Device {
        Device {
            name: name.into(),
            kind: DeviceKind::Router,
            mac: MacAddr::new(mac),
            ips: vec![ip],
            ipv6s: vec![],
            vlan: None,
            interfaces: vec![],
            icmp: IcmpConfig { ttl },
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
            gratuitous_arp: false,
        }
    }

    #[test]
    fn echo_reply_preserves_payload_and_carries_device_ttl() {
        let index = DeviceIndex::new();
        index.rebuild(vec![device("r1", [1, 2, 3, 4, 5, 6], Ipv4Addr::new(192, 168, 1, 1), 200)]).unwrap();

        let request_icmp = {
            let mut buf = wire::build_icmp_echo_reply(1234, 1, b"PING");
            buf[0] = wire::ICMP_ECHO_REQUEST;
            buf
        };
        let request_ip = build_ipv4_packet(Ipv4Addr::new(192, 168, 1, 100), Ipv4Addr::new(192, 168, 1, 1), wire::PROTO_ICMP, 64, &request_icmp);
        let frame = build_ethernet_frame(MacAddr::new([1, 2, 3, 4, 5, 6]), MacAddr::new([0xaa; 6]), ETHERTYPE_IPV4, &request_ip);

        let reply = handle_echo_request(&frame, &index.snapshot()).expect("expected echo reply");
        let eth = EthernetFrame::parse(&reply).unwrap();
        let ip = Ipv4Packet::parse(eth.payload).unwrap();
        assert_eq!(ip.ttl, 200);
        let echo = IcmpEcho::parse(ip.payload).unwrap();
        assert_eq!(echo.kind, wire::ICMP_ECHO_REPLY);
        assert_eq!(echo.identifier, 1234);
        assert_eq!(echo.sequence, 1);
        assert_eq!(echo.payload, b"PING");
    }

    #[test]
    fn defaults_to_ttl_64_without_override() {
        let mut d = device("r1", [1, 2, 3, 4, 5, 6], Ipv4Addr::new(192, 168, 1, 1), 64);
        d.dns = Some(DnsRecordConfig::default());
        let index = DeviceIndex::new();
        index.rebuild(vec![d]).unwrap();
        assert_eq!(index.snapshot().by_ipv4(&Ipv4Addr::new(192, 168, 1, 1)).unwrap().icmp.ttl, 64);
    }
}
