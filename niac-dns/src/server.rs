//! Per-device DNS responder (`spec.md` §4.7): `A` lookups from the
//! forward-records map, `PTR` lookups by synthesizing the reverse name.

use std::net::Ipv4Addr;

use niac_types::DnsRecordConfig;

use crate::packet::{build_a_response, build_ptr_response, DnsQuery, RecordType, ResponseCode};

pub struct DnsServer {
    config: DnsRecordConfig,
}

impl DnsServer {
    pub fn new(config: DnsRecordConfig) -> Self {
        DnsServer { config }
    }

    /// Handle a query datagram, returning the reply bytes. Malformed
    /// datagrams are silently dropped rather than answered, matching a
    /// server that never forwards or recurses.
    pub fn handle(&self, data: &[u8]) -> Option<Vec<u8>> {
        let query = DnsQuery::parse(data).ok()?;
        match query.question.qtype {
            RecordType::A => Some(self.answer_a(&query)),
            RecordType::Ptr => Some(self.answer_ptr(&query)),
            RecordType::Unsupported => Some(build_a_response(&query, &[], self.config.ttl_secs, ResponseCode::NotImplemented)),
        }
    }

    fn answer_a(&self, query: &DnsQuery) -> Vec<u8> {
        let name = query.question.name.trim_end_matches('.');
        match self.config.forward.get(name) {
            Some(ip) => build_a_response(query, &[*ip], self.config.ttl_secs, ResponseCode::NoError),
            None => build_a_response(query, &[], self.config.ttl_secs, ResponseCode::NxDomain),
        }
    }

    fn answer_ptr(&self, query: &DnsQuery) -> Vec<u8> {
        let target = parse_reverse_name(&query.question.name);
        let hostname = target.and_then(|ip| {
            self.config
                .forward
                .iter()
                .find(|(_, addr)| **addr == ip)
                .map(|(name, _)| name.clone())
        });
        build_ptr_response(query, hostname.as_deref(), self.config.ttl_secs)
    }
}

/// Recover the IPv4 address a `X.X.X.X.in-addr.arpa` query name encodes.
/// Octets appear reversed and dot-separated ahead of the `in-addr.arpa`
/// suffix.
fn parse_reverse_name(name: &str) -> Option<Ipv4Addr> {
    let stripped = name.trim_end_matches('.').strip_suffix(".in-addr.arpa")?;
    let mut octets: Vec<u8> = stripped.split('.').filter_map(|p| p.parse().ok()).collect();
    if octets.len() != 4 {
        return None;
    }
    octets.reverse();
    Some(Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config() -> DnsRecordConfig {
        let mut forward = BTreeMap::new();
        forward.insert("router1.lab".to_string(), Ipv4Addr::new(10, 0, 0, 1));
        DnsRecordConfig { forward, ttl_secs: 120 }
    }

    fn a_query(name: &str) -> Vec<u8> {
        let mut buf = vec![0u8; 12];
        buf[4..6].copy_from_slice(&1u16.to_be_bytes());
        for label in name.split('.').filter(|l| !l.is_empty()) {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
        buf.push(0);
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf
    }

    #[test]
    fn resolves_known_forward_name() {
        let server = DnsServer::new(config());
        let reply = server.handle(&a_query("router1.lab")).unwrap();
        assert!(reply.ends_with(&[10, 0, 0, 1]));
    }

    #[test]
    fn unknown_forward_name_is_nxdomain() {
        let server = DnsServer::new(config());
        let reply = server.handle(&a_query("nope.lab")).unwrap();
        let flags = u16::from_be_bytes([reply[2], reply[3]]);
        assert_eq!(flags & 0x000f, ResponseCode::NxDomain as u16);
    }

    #[test]
    fn reverse_name_parses_octets_in_reverse_order() {
        assert_eq!(parse_reverse_name("1.0.0.10.in-addr.arpa."), Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(parse_reverse_name("bogus"), None);
    }
}
