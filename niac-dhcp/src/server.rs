//! DHCPv4 server state machine (`spec.md` §4.6): `DISCOVER → OFFER →
//! REQUEST → ACK/NAK`, static leases first, dynamic pool allocation second.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::SystemTime;

use niac_types::{DhcpConfig, DhcpLease, MacAddr};

use crate::packet::{build_reply, DhcpMessageType, DhcpPacket, ReplyOptions};

/// One device's DHCP server instance: its static-lease table, optional
/// dynamic pool, and in-memory lease state.
pub struct DhcpServer {
    config: DhcpConfig,
    server_id: Ipv4Addr,
    dynamic_leases: HashMap<MacAddr, DhcpLease>,
}

impl DhcpServer {
    pub fn new(config: DhcpConfig, server_id: Ipv4Addr) -> Self {
        DhcpServer {
            config,
            server_id,
            dynamic_leases: HashMap::new(),
        }
    }

    fn static_lease_for(&self, mac: MacAddr) -> Option<Ipv4Addr> {
        self.config
            .static_leases
            .iter()
            .find(|l| l.mac == mac)
            .map(|l| l.ip)
    }

    /// Lowest free address in the configured pool, skipping anything
    /// already leased out dynamically or declared as a static lease.
    fn allocate_from_pool(&self) -> Option<Ipv4Addr> {
        let pool = self.config.pool.as_ref()?;
        let start = u32::from(pool.start);
        let end = u32::from(pool.end);
        let taken: std::collections::HashSet<Ipv4Addr> = self
            .dynamic_leases
            .values()
            .map(|l| l.assigned_ip)
            .chain(self.config.static_leases.iter().map(|l| l.ip))
            .collect();
        (start..=end)
            .map(Ipv4Addr::from)
            .find(|ip| !taken.contains(ip))
    }

    fn reply_options(&self, lease_secs: u32, mask: Ipv4Addr) -> ReplyOptions {
        ReplyOptions {
            lease_secs,
            subnet_mask: Some(mask),
            router: self.config.router,
            dns_servers: self.config.dns_servers.clone(),
            domain: self.config.domain.clone(),
            ntp_servers: self.config.ntp_servers.clone(),
            domain_search: self.config.domain_search.clone(),
            tftp_server: self.config.tftp_server.clone(),
            bootfile: self.config.bootfile.clone(),
        }
    }

    /// Handle an inbound datagram; returns the reply bytes to transmit, if
    /// this transaction calls for one.
    pub fn handle(&mut self, data: &[u8], now: SystemTime) -> Option<Vec<u8>> {
        let pkt = DhcpPacket::parse(data).ok()?;
        match pkt.message_type()? {
            DhcpMessageType::Discover => self.handle_discover(&pkt),
            DhcpMessageType::Request => self.handle_request(&pkt, now),
            _ => None,
        }
    }

    fn offer_ip(&self, mac: MacAddr) -> Option<(Ipv4Addr, Ipv4Addr)> {
        let mask = self.config.pool.as_ref().map(|p| p.netmask).unwrap_or(Ipv4Addr::new(255, 255, 255, 0));
        if let Some(ip) = self.static_lease_for(mac) {
            return Some((ip, mask));
        }
        self.allocate_from_pool().map(|ip| (ip, mask))
    }

    fn handle_discover(&mut self, pkt: &DhcpPacket) -> Option<Vec<u8>> {
        let (ip, mask) = self.offer_ip(pkt.chaddr)?;
        let lease_secs = self.config.pool.as_ref().map(|p| p.lease_secs).unwrap_or(86400);
        let opts = self.reply_options(lease_secs, mask);
        Some(build_reply(
            DhcpMessageType::Offer,
            pkt.xid,
            pkt.chaddr,
            ip,
            self.server_id,
            pkt.is_broadcast_flag(),
            &opts,
        ))
    }

    fn handle_request(&mut self, pkt: &DhcpPacket, now: SystemTime) -> Option<Vec<u8>> {
        let requested = pkt.requested_ip().or(if pkt.ciaddr != Ipv4Addr::UNSPECIFIED {
            Some(pkt.ciaddr)
        } else {
            None
        })?;

        let mask = self.config.pool.as_ref().map(|p| p.netmask).unwrap_or(Ipv4Addr::new(255, 255, 255, 0));
        let lease_secs = self.config.pool.as_ref().map(|p| p.lease_secs).unwrap_or(86400);

        let ok = match self.static_lease_for(pkt.chaddr) {
            Some(static_ip) => static_ip == requested,
            None => self.allocate_from_pool().map(|ip| ip == requested).unwrap_or(false)
                || self
                    .dynamic_leases
                    .get(&pkt.chaddr)
                    .map(|l| l.assigned_ip == requested)
                    .unwrap_or(false),
        };

        let msg_type = if ok {
            self.dynamic_leases.insert(
                pkt.chaddr,
                DhcpLease {
                    client_mac: pkt.chaddr,
                    mask,
                    assigned_ip: requested,
                    lease_duration: std::time::Duration::from_secs(lease_secs as u64),
                    issued_at: now,
                },
            );
            DhcpMessageType::Ack
        } else {
            DhcpMessageType::Nak
        };

        let opts = self.reply_options(lease_secs, mask);
        Some(build_reply(
            msg_type,
            pkt.xid,
            pkt.chaddr,
            if ok { requested } else { Ipv4Addr::UNSPECIFIED },
            self.server_id,
            pkt.is_broadcast_flag(),
            &opts,
        ))
    }

    pub fn leases(&self) -> impl Iterator<Item = &DhcpLease> {
        self.dynamic_leases.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use niac_types::StaticLeaseConfig;

    fn discover_bytes(xid: u32, mac: MacAddr) -> Vec<u8> {
        let mut buf = vec![0u8; crate::packet::HEADER_SIZE + 4];
        buf[4..8].copy_from_slice(&xid.to_be_bytes());
        buf[28..34].copy_from_slice(&mac.octets());
        buf[236..240].copy_from_slice(&crate::packet::MAGIC_COOKIE);
        buf.extend_from_slice(&[53, 1, DhcpMessageType::Discover as u8, 255]);
        buf
    }

    #[test]
    fn static_lease_wins_over_pool() {
        let mac = MacAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        let config = DhcpConfig {
            static_leases: vec![StaticLeaseConfig {
                mac,
                ip: Ipv4Addr::new(10, 0, 0, 50),
                hostname: None,
            }],
            ..Default::default()
        };
        let mut server = DhcpServer::new(config, Ipv4Addr::new(10, 0, 0, 1));
        let reply = server.handle(&discover_bytes(7, mac), SystemTime::now()).unwrap();
        let parsed = DhcpPacket::parse(&reply).unwrap();
        assert_eq!(parsed.yiaddr, Ipv4Addr::new(10, 0, 0, 50));
        assert_eq!(parsed.message_type(), Some(DhcpMessageType::Offer));
    }
}
