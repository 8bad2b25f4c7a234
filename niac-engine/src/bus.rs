//! The Packet Bus (C3): classifies every ingested frame and fans it out to
//! one bounded per-handler queue. Dispatch never blocks on a slow handler
//! — a full queue drops the frame and increments that handler's `drops`
//! counter (`spec.md` §4.3).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use niac_types::{Frame, MacAddr};
use tokio::sync::mpsc;

use crate::wire::{self, EthernetFrame};

/// Default bound on each handler's inbound queue (`spec.md` §4.3).
pub const DEFAULT_QUEUE_BUFFER_SIZE: usize = 1000;

const ETHERTYPE_LLDP: u16 = 0x88cc;
const SNAP_ORG_CISCO: [u8; 3] = [0x00, 0x00, 0x0c];
const SNAP_ORG_EXTREME: [u8; 3] = [0x00, 0xe0, 0x2b];
const SNAP_ORG_FOUNDRY: [u8; 3] = [0x00, 0xe0, 0x52];

const DHCP_SERVER_PORT: u16 = 67;
const DNS_PORT: u16 = 53;
const SNMP_PORT: u16 = 161;

const MAC_STP_BPDU: MacAddr = MacAddr::new([0x01, 0x80, 0xc2, 0x00, 0x00, 0x00]);

/// Which protocol handler a frame was classified into, per `spec.md` §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Arp,
    Icmpv4,
    Icmpv6,
    Dhcp,
    Dns,
    Snmp,
    Stp,
    Lldp,
    Cdp,
    Edp,
    Fdp,
    Other,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 12] = [
        HandlerKind::Arp,
        HandlerKind::Icmpv4,
        HandlerKind::Icmpv6,
        HandlerKind::Dhcp,
        HandlerKind::Dns,
        HandlerKind::Snmp,
        HandlerKind::Stp,
        HandlerKind::Lldp,
        HandlerKind::Cdp,
        HandlerKind::Edp,
        HandlerKind::Fdp,
        HandlerKind::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HandlerKind::Arp => "arp",
            HandlerKind::Icmpv4 => "icmpv4",
            HandlerKind::Icmpv6 => "icmpv6",
            HandlerKind::Dhcp => "dhcp",
            HandlerKind::Dns => "dns",
            HandlerKind::Snmp => "snmp",
            HandlerKind::Stp => "stp",
            HandlerKind::Lldp => "lldp",
            HandlerKind::Cdp => "cdp",
            HandlerKind::Edp => "edp",
            HandlerKind::Fdp => "fdp",
            HandlerKind::Other => "other",
        }
    }
}

/// Classifies a raw Ethernet frame into the handler that should see it.
/// Unparseable or uninteresting frames fall into `Other`.
pub fn classify(bytes: &[u8]) -> HandlerKind {
    let Some(eth) = EthernetFrame::parse(bytes) else {
        return HandlerKind::Other;
    };

    if eth.dst == MacAddr::new([0x01, 0x00, 0x0c, 0xcc, 0xcc, 0xcc]) {
        return HandlerKind::Cdp;
    }
    if eth.ethertype == ETHERTYPE_LLDP {
        return HandlerKind::Lldp;
    }
    if eth.ethertype == wire::ETHERTYPE_ARP {
        return HandlerKind::Arp;
    }
    if is_stp_bpdu_dest(eth.dst) {
        return HandlerKind::Stp;
    }
    if eth.ethertype < 0x0600 {
        // 802.3 length field: SNAP/LLC encapsulation, used by CDP/EDP/FDP.
        if let Some(kind) = classify_snap(eth.payload) {
            return kind;
        }
        return HandlerKind::Other;
    }

    match eth.ethertype {
        wire::ETHERTYPE_IPV4 => classify_ipv4(eth.payload),
        wire::ETHERTYPE_IPV6 => HandlerKind::Icmpv6,
        _ => HandlerKind::Other,
    }
}

fn is_stp_bpdu_dest(dst: MacAddr) -> bool {
    dst.octets()[..5] == MAC_STP_BPDU.octets()[..5] && dst.octets()[5] == 0x00
}

fn classify_snap(payload: &[u8]) -> Option<HandlerKind> {
    // LLC (3 bytes) + SNAP OUI (3 bytes) + protocol id (2 bytes).
    if payload.len() < 8 {
        return None;
    }
    let oui = [payload[3], payload[4], payload[5]];
    match oui {
        SNAP_ORG_CISCO => Some(HandlerKind::Cdp),
        SNAP_ORG_EXTREME => Some(HandlerKind::Edp),
        SNAP_ORG_FOUNDRY => Some(HandlerKind::Fdp),
        _ => None,
    }
}

fn classify_ipv4(payload: &[u8]) -> HandlerKind {
    let Some(ip) = wire::Ipv4Packet::parse(payload) else {
        return HandlerKind::Other;
    };
    match ip.protocol {
        wire::PROTO_ICMP => HandlerKind::Icmpv4,
        wire::PROTO_UDP => classify_udp(ip.payload),
        _ => HandlerKind::Other,
    }
}

fn classify_udp(payload: &[u8]) -> HandlerKind {
    let Some(udp) = wire::UdpDatagram::parse(payload) else {
        return HandlerKind::Other;
    };
    if udp.dst_port == DHCP_SERVER_PORT || udp.src_port == DHCP_SERVER_PORT {
        HandlerKind::Dhcp
    } else if udp.dst_port == DNS_PORT {
        HandlerKind::Dns
    } else if udp.dst_port == SNMP_PORT {
        HandlerKind::Snmp
    } else {
        HandlerKind::Other
    }
}

/// A classified frame, ready for a handler worker to consume.
#[derive(Debug, Clone)]
pub struct ClassifiedFrame {
    pub frame: Frame,
    pub kind: HandlerKind,
}

/// Bounded fan-out in front of the parallel handler workers. Owns one
/// `mpsc` sender per [`HandlerKind`] and that handler's drop counter.
pub struct PacketBus {
    senders: HashMap<HandlerKind, mpsc::Sender<ClassifiedFrame>>,
    drops: HashMap<HandlerKind, AtomicU64>,
    received: AtomicU64,
}

impl PacketBus {
    /// Creates the bus and returns the receiving half of every handler's
    /// queue, so the caller can spawn one worker task per handler.
    pub fn new(buffer_size: usize) -> (Self, HashMap<HandlerKind, mpsc::Receiver<ClassifiedFrame>>) {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        let mut drops = HashMap::new();
        for kind in HandlerKind::ALL {
            let (tx, rx) = mpsc::channel(buffer_size);
            senders.insert(kind, tx);
            receivers.insert(kind, rx);
            drops.insert(kind, AtomicU64::new(0));
        }
        (PacketBus { senders, drops, received: AtomicU64::new(0) }, receivers)
    }

    /// Classifies and dispatches one ingested frame. Never blocks: a full
    /// queue drops the frame and increments that handler's counter.
    pub fn dispatch(&self, frame: Frame) {
        self.received.fetch_add(1, Ordering::Relaxed);
        let kind = classify(&frame.bytes);
        let Some(sender) = self.senders.get(&kind) else {
            return;
        };
        if sender.try_send(ClassifiedFrame { frame, kind }).is_err() {
            if let Some(counter) = self.drops.get(&kind) {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            tracing::debug!(handler = kind.as_str(), "handler queue full, dropping frame");
        }
    }

    pub fn drops(&self, kind: HandlerKind) -> u64 {
        self.drops.get(&kind).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn classifies_arp_request() {
        let frame = wire::build_ethernet_frame(
            MacAddr::BROADCAST,
            MacAddr::new([1, 2, 3, 4, 5, 6]),
            wire::ETHERTYPE_ARP,
            &[0u8; 28],
        );
        assert_eq!(classify(&frame), HandlerKind::Arp);
    }

    #[test]
    fn classifies_icmp_over_ipv4() {
        let icmp = wire::build_icmp_echo_reply(1, 1, b"x");
        let ip = wire::build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), wire::PROTO_ICMP, 64, &icmp);
        let frame = wire::build_ethernet_frame(MacAddr::new([9; 6]), MacAddr::new([1; 6]), wire::ETHERTYPE_IPV4, &ip);
        assert_eq!(classify(&frame), HandlerKind::Icmpv4);
    }

    #[test]
    fn classifies_dns_over_udp() {
        let udp = wire::build_udp_datagram(40000, 53, b"query");
        let ip = wire::build_ipv4_packet(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), wire::PROTO_UDP, 64, &udp);
        let frame = wire::build_ethernet_frame(MacAddr::new([9; 6]), MacAddr::new([1; 6]), wire::ETHERTYPE_IPV4, &ip);
        assert_eq!(classify(&frame), HandlerKind::Dns);
    }

    #[tokio::test]
    async fn full_queue_drops_and_increments_counter() {
        let (bus, mut receivers) = PacketBus::new(1);
        let arp_frame = wire::build_ethernet_frame(MacAddr::BROADCAST, MacAddr::new([1; 6]), wire::ETHERTYPE_ARP, &[0u8; 28]);

        bus.dispatch(Frame { timestamp: std::time::SystemTime::now(), bytes: arp_frame.clone(), serial: 1 });
        bus.dispatch(Frame { timestamp: std::time::SystemTime::now(), bytes: arp_frame, serial: 2 });

        assert_eq!(bus.drops(HandlerKind::Arp), 1);
        let rx = receivers.get_mut(&HandlerKind::Arp).unwrap();
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
