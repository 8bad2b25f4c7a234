//! Shared Ethernet/ARP/IPv4/ICMPv4 framing used by the bus classifier and
//! by the ARP and ICMP responders. Field layout mirrors the teacher
//! kernel's `net::ethernet`/`net::ipv4`/`net::arp` modules, lifted out of
//! `no_std` and generalized to build replies for arbitrary devices rather
//! than one static interface config.

use std::net::Ipv4Addr;

use niac_types::MacAddr;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_IPV6: u16 = 0x86dd;
pub const ETHERNET_HEADER_SIZE: usize = 14;
pub const MIN_FRAME_SIZE: usize = 60;

pub const PROTO_ICMP: u8 = 1;
pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;

pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_ECHO_REPLY: u8 = 0;
pub const ICMP_DEST_UNREACHABLE: u8 = 3;
pub const ICMP_PORT_UNREACHABLE: u8 = 3;

#[derive(Debug)]
pub struct EthernetFrame<'a> {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: u16,
    pub payload: &'a [u8],
}

impl<'a> EthernetFrame<'a> {
    pub fn parse(raw: &'a [u8]) -> Option<Self> {
        if raw.len() < ETHERNET_HEADER_SIZE {
            return None;
        }
        let mut dst = [0u8; 6];
        let mut src = [0u8; 6];
        dst.copy_from_slice(&raw[0..6]);
        src.copy_from_slice(&raw[6..12]);
        Some(EthernetFrame {
            dst: MacAddr::new(dst),
            src: MacAddr::new(src),
            ethertype: u16::from_be_bytes([raw[12], raw[13]]),
            payload: &raw[ETHERNET_HEADER_SIZE..],
        })
    }
}

/// Builds a raw Ethernet frame, zero-padded to the 60-byte minimum.
pub fn build_ethernet_frame(dst: MacAddr, src: MacAddr, ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity((ETHERNET_HEADER_SIZE + payload.len()).max(MIN_FRAME_SIZE));
    frame.extend_from_slice(&dst.octets());
    frame.extend_from_slice(&src.octets());
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame.extend_from_slice(payload);
    while frame.len() < MIN_FRAME_SIZE {
        frame.push(0);
    }
    frame
}

pub const ARP_PACKET_SIZE: usize = 28;
const ARP_HTYPE_ETHERNET: u16 = 1;
const ARP_PTYPE_IPV4: u16 = 0x0800;
const ARP_OP_REQUEST: u16 = 1;
const ARP_OP_REPLY: u16 = 2;

#[derive(Debug)]
pub struct ArpPacket {
    pub operation: u16,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < ARP_PACKET_SIZE {
            return None;
        }
        let htype = u16::from_be_bytes([payload[0], payload[1]]);
        let ptype = u16::from_be_bytes([payload[2], payload[3]]);
        if htype != ARP_HTYPE_ETHERNET || ptype != ARP_PTYPE_IPV4 {
            return None;
        }
        let operation = u16::from_be_bytes([payload[6], payload[7]]);
        let mut sender_mac = [0u8; 6];
        sender_mac.copy_from_slice(&payload[8..14]);
        let sender_ip = Ipv4Addr::new(payload[14], payload[15], payload[16], payload[17]);
        let mut target_mac = [0u8; 6];
        target_mac.copy_from_slice(&payload[18..24]);
        let target_ip = Ipv4Addr::new(payload[24], payload[25], payload[26], payload[27]);
        Some(ArpPacket {
            operation,
            sender_mac: MacAddr::new(sender_mac),
            sender_ip,
            target_mac: MacAddr::new(target_mac),
            target_ip,
        })
    }

    pub fn is_request(&self) -> bool {
        self.operation == ARP_OP_REQUEST
    }
}

fn build_arp_payload(op: u16, sender_mac: MacAddr, sender_ip: Ipv4Addr, target_mac: MacAddr, target_ip: Ipv4Addr) -> Vec<u8> {
    let mut pkt = Vec::with_capacity(ARP_PACKET_SIZE);
    pkt.extend_from_slice(&ARP_HTYPE_ETHERNET.to_be_bytes());
    pkt.extend_from_slice(&ARP_PTYPE_IPV4.to_be_bytes());
    pkt.push(6); // hardware address length
    pkt.push(4); // protocol address length
    pkt.extend_from_slice(&op.to_be_bytes());
    pkt.extend_from_slice(&sender_mac.octets());
    pkt.extend_from_slice(&sender_ip.octets());
    pkt.extend_from_slice(&target_mac.octets());
    pkt.extend_from_slice(&target_ip.octets());
    pkt
}

/// Builds `sender_ip is-at sender_mac` addressed to `target_mac`/`target_ip`.
pub fn build_arp_reply(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_mac: MacAddr, target_ip: Ipv4Addr) -> Vec<u8> {
    let payload = build_arp_payload(ARP_OP_REPLY, sender_mac, sender_ip, target_mac, target_ip);
    build_ethernet_frame(target_mac, sender_mac, ETHERTYPE_ARP, &payload)
}

/// Unsolicited reply announcing `sender_ip` is at `sender_mac` (gratuitous
/// ARP): broadcast, target fields echo the sender's own address.
pub fn build_gratuitous_arp(sender_mac: MacAddr, sender_ip: Ipv4Addr) -> Vec<u8> {
    let payload = build_arp_payload(ARP_OP_REPLY, sender_mac, sender_ip, MacAddr::BROADCAST, sender_ip);
    build_ethernet_frame(MacAddr::BROADCAST, sender_mac, ETHERTYPE_ARP, &payload)
}

pub const IPV4_HEADER_SIZE: usize = 20;

#[derive(Debug)]
pub struct Ipv4Packet<'a> {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: u8,
    pub ttl: u8,
    pub header_len: usize,
    pub payload: &'a [u8],
}

impl<'a> Ipv4Packet<'a> {
    pub fn parse(raw: &'a [u8]) -> Option<Self> {
        if raw.len() < IPV4_HEADER_SIZE {
            return None;
        }
        let version = raw[0] >> 4;
        if version != 4 {
            return None;
        }
        let ihl = (raw[0] & 0x0f) as usize;
        let header_len = ihl * 4;
        if header_len < IPV4_HEADER_SIZE || raw.len() < header_len {
            return None;
        }
        let total_len = u16::from_be_bytes([raw[2], raw[3]]) as usize;
        if total_len > raw.len() || total_len < header_len {
            return None;
        }
        let ttl = raw[8];
        let protocol = raw[9];
        let src = Ipv4Addr::new(raw[12], raw[13], raw[14], raw[15]);
        let dst = Ipv4Addr::new(raw[16], raw[17], raw[18], raw[19]);
        Some(Ipv4Packet { src, dst, protocol, ttl, header_len, payload: &raw[header_len..total_len] })
    }
}

fn ip_checksum(header: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut i = 0;
    while i + 1 < header.len() {
        sum += u16::from_be_bytes([header[i], header[i + 1]]) as u32;
        i += 2;
    }
    if i < header.len() {
        sum += (header[i] as u32) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

static NEXT_IP_ID: std::sync::atomic::AtomicU16 = std::sync::atomic::AtomicU16::new(1);

/// Builds an IPv4 datagram (header + payload) with a correct header
/// checksum and a monotonically increasing identification field.
pub fn build_ipv4_packet(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, ttl: u8, payload: &[u8]) -> Vec<u8> {
    let id = NEXT_IP_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let total_len = (IPV4_HEADER_SIZE + payload.len()) as u16;
    let mut header = vec![0u8; IPV4_HEADER_SIZE];
    header[0] = 0x45;
    header[1] = 0;
    header[2..4].copy_from_slice(&total_len.to_be_bytes());
    header[4..6].copy_from_slice(&id.to_be_bytes());
    header[6..8].copy_from_slice(&0u16.to_be_bytes());
    header[8] = ttl;
    header[9] = protocol;
    header[12..16].copy_from_slice(&src.octets());
    header[16..20].copy_from_slice(&dst.octets());
    let checksum = ip_checksum(&header);
    header[10..12].copy_from_slice(&checksum.to_be_bytes());

    let mut packet = header;
    packet.extend_from_slice(payload);
    packet
}

pub const UDP_HEADER_SIZE: usize = 8;

#[derive(Debug)]
pub struct UdpDatagram<'a> {
    pub src_port: u16,
    pub dst_port: u16,
    pub payload: &'a [u8],
}

impl<'a> UdpDatagram<'a> {
    pub fn parse(raw: &'a [u8]) -> Option<Self> {
        if raw.len() < UDP_HEADER_SIZE {
            return None;
        }
        let src_port = u16::from_be_bytes([raw[0], raw[1]]);
        let dst_port = u16::from_be_bytes([raw[2], raw[3]]);
        let len = u16::from_be_bytes([raw[4], raw[5]]) as usize;
        if len < UDP_HEADER_SIZE || len > raw.len() {
            return None;
        }
        Some(UdpDatagram { src_port, dst_port, payload: &raw[UDP_HEADER_SIZE..len] })
    }
}

/// Builds a UDP datagram with a zeroed checksum (valid per RFC 768 §3.2,
/// which permits an all-zero checksum to mean "none computed").
pub fn build_udp_datagram(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let len = (UDP_HEADER_SIZE + payload.len()) as u16;
    let mut buf = Vec::with_capacity(len as usize);
    buf.extend_from_slice(&src_port.to_be_bytes());
    buf.extend_from_slice(&dst_port.to_be_bytes());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

#[derive(Debug)]
pub struct IcmpEcho<'a> {
    pub kind: u8,
    pub code: u8,
    pub identifier: u16,
    pub sequence: u16,
    pub payload: &'a [u8],
}

impl<'a> IcmpEcho<'a> {
    pub fn parse(raw: &'a [u8]) -> Option<Self> {
        if raw.len() < 8 {
            return None;
        }
        Some(IcmpEcho {
            kind: raw[0],
            code: raw[1],
            identifier: u16::from_be_bytes([raw[4], raw[5]]),
            sequence: u16::from_be_bytes([raw[6], raw[7]]),
            payload: &raw[8..],
        })
    }
}

fn icmp_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut i = 0;
    while i + 1 < data.len() {
        sum += u16::from_be_bytes([data[i], data[i + 1]]) as u32;
        i += 2;
    }
    if i < data.len() {
        sum += (data[i] as u32) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Builds an ICMP echo reply that carries `identifier`/`sequence`/payload
/// unchanged from the request, per `spec.md` §4.5.
pub fn build_icmp_echo_reply(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
    build_icmp(ICMP_ECHO_REPLY, 0, identifier, sequence, payload)
}

fn build_icmp(kind: u8, code: u8, identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 8];
    buf[0] = kind;
    buf[1] = code;
    buf[4..6].copy_from_slice(&identifier.to_be_bytes());
    buf[6..8].copy_from_slice(&sequence.to_be_bytes());
    buf.extend_from_slice(payload);
    let checksum = icmp_checksum(&buf);
    buf[2..4].copy_from_slice(&checksum.to_be_bytes());
    buf
}

/// Builds an ICMP destination-unreachable (port unreachable) message,
/// embedding the offending IPv4 header and first 8 bytes of its payload
/// per RFC 792.
pub fn build_icmp_port_unreachable(original_ip_packet: &[u8]) -> Vec<u8> {
    let embed_len = (original_ip_packet.len()).min(IPV4_HEADER_SIZE + 8);
    let mut inner = vec![0u8; 4];
    inner.extend_from_slice(&original_ip_packet[..embed_len]);
    build_icmp(ICMP_DEST_UNREACHABLE, ICMP_PORT_UNREACHABLE, 0, 0, &inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ethernet_frame_round_trips_through_parse() {
        let dst = MacAddr::new([1, 2, 3, 4, 5, 6]);
        let src = MacAddr::new([6, 5, 4, 3, 2, 1]);
        let frame = build_ethernet_frame(dst, src, ETHERTYPE_IPV4, b"hello");
        let parsed = EthernetFrame::parse(&frame).unwrap();
        assert_eq!(parsed.dst, dst);
        assert_eq!(parsed.src, src);
        assert_eq!(parsed.ethertype, ETHERTYPE_IPV4);
        assert!(parsed.payload.starts_with(b"hello"));
    }

    #[test]
    fn arp_reply_round_trips() {
        let mac = MacAddr::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let requester_mac = MacAddr::new([0xaa; 6]);
        let frame = build_arp_reply(mac, Ipv4Addr::new(192, 168, 1, 1), requester_mac, Ipv4Addr::new(192, 168, 1, 100));
        let eth = EthernetFrame::parse(&frame).unwrap();
        assert_eq!(eth.ethertype, ETHERTYPE_ARP);
        let arp = ArpPacket::parse(eth.payload).unwrap();
        assert!(!arp.is_request());
        assert_eq!(arp.sender_mac, mac);
        assert_eq!(arp.sender_ip, Ipv4Addr::new(192, 168, 1, 1));
    }

    #[test]
    fn ipv4_packet_checksum_validates_on_parse() {
        let packet = build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), PROTO_UDP, 64, b"payload");
        let parsed = Ipv4Packet::parse(&packet).unwrap();
        assert_eq!(parsed.protocol, PROTO_UDP);
        assert_eq!(parsed.ttl, 64);
        assert_eq!(parsed.payload, b"payload");
    }

    #[test]
    fn icmp_echo_reply_preserves_identifier_sequence_and_payload() {
        let reply = build_icmp_echo_reply(1234, 1, b"PING");
        let echo = IcmpEcho::parse(&reply).unwrap();
        assert_eq!(echo.kind, ICMP_ECHO_REPLY);
        assert_eq!(echo.identifier, 1234);
        assert_eq!(echo.sequence, 1);
        assert_eq!(echo.payload, b"PING");
    }
}
