//! The SNMP agent (C8): request dispatch over a device's [`MibStore`].

use std::collections::BTreeSet;
use std::sync::Arc;

use niac_types::{MibValue, Oid};

use crate::mib::MibStore;
use crate::pdu::{Message, Pdu, PduKind, SnmpVersion, VarBind, VarBindValue};

/// Bounds how many repetitions a single `GETBULK` can ask for, so a
/// pathological request can't force an unbounded response.
pub const DEFAULT_BULK_MAX: u32 = 64;

const ERR_NO_ERROR: i32 = 0;
const ERR_NO_ACCESS: i32 = 6;

/// Hook the error-injection controller (C12) uses to bias a synthesized
/// value before it goes out on the wire, keyed by the OID it was read from.
pub type BiasFn = Arc<dyn Fn(&Oid, MibValue) -> MibValue + Send + Sync>;

pub struct SnmpAgent {
    community: Vec<u8>,
    writable_oids: BTreeSet<String>,
    mib: MibStore,
    bulk_max: u32,
    bias: Option<BiasFn>,
}

impl SnmpAgent {
    pub fn new(community: String, writable_oids: BTreeSet<String>, mib: MibStore) -> Self {
        SnmpAgent { community: community.into_bytes(), writable_oids, mib, bulk_max: DEFAULT_BULK_MAX, bias: None }
    }

    /// Attaches the error-injection bias hook (`spec.md` §4.12); values
    /// read via `GET`/`GETNEXT`/`GETBULK` pass through it before reply.
    pub fn with_bias(mut self, bias: BiasFn) -> Self {
        self.bias = Some(bias);
        self
    }

    fn apply_bias(&self, oid: &Oid, value: MibValue) -> MibValue {
        match &self.bias {
            Some(f) => f(oid, value),
            None => value,
        }
    }

    pub fn community_str(&self) -> String {
        String::from_utf8_lossy(&self.community).into_owned()
    }

    pub fn uptime_ticks(&self) -> u32 {
        self.mib.uptime_ticks()
    }

    /// Handle one inbound datagram. Returns `None` when the community
    /// doesn't match (a real agent drops silently rather than error) or the
    /// datagram doesn't parse.
    pub fn handle(&self, data: &[u8]) -> Option<Vec<u8>> {
        let request = Message::parse(data).ok()?;
        if !constant_time_eq(&request.community, &self.community) {
            return None;
        }

        let reply_pdu = match request.pdu.kind {
            PduKind::GetRequest => self.handle_get(&request.pdu),
            PduKind::GetNextRequest => self.handle_get_next(&request.pdu),
            PduKind::GetBulkRequest => self.handle_get_bulk(&request.pdu),
            PduKind::SetRequest => self.handle_set(&request.pdu),
            PduKind::GetResponse | PduKind::SnmpV2Trap => return None,
        };

        Some(Message { version: request.version, community: request.community, pdu: reply_pdu }.encode())
    }

    fn handle_get(&self, pdu: &Pdu) -> Pdu {
        let mut varbinds = Vec::with_capacity(pdu.varbinds.len());
        for vb in &pdu.varbinds {
            let value = match self.mib.get(&vb.oid) {
                Some(v) => VarBindValue::Value(self.apply_bias(&vb.oid, v)),
                None => VarBindValue::NoSuchObject,
            };
            varbinds.push(VarBind { oid: vb.oid.clone(), value });
        }
        response(pdu, varbinds)
    }

    fn handle_get_next(&self, pdu: &Pdu) -> Pdu {
        let mut varbinds = Vec::with_capacity(pdu.varbinds.len());
        for vb in &pdu.varbinds {
            let (oid, value) = match self.mib.get_next(&vb.oid) {
                Some(entry) => {
                    let biased = self.apply_bias(&entry.oid, entry.value);
                    (entry.oid, VarBindValue::Value(biased))
                }
                None => (vb.oid.clone(), VarBindValue::EndOfMibView),
            };
            varbinds.push(VarBind { oid, value });
        }
        response(pdu, varbinds)
    }

    /// `error_status`/`error_index` carry non-repeaters/max-repetitions on
    /// the wire for `GetBulkRequest` (RFC 1905 §4.2.3); every varbind here
    /// is treated as a repeater since this agent has no non-repeater use.
    fn handle_get_bulk(&self, pdu: &Pdu) -> Pdu {
        let max_repetitions = (pdu.error_index.max(0) as u32).min(self.bulk_max);
        let mut varbinds = Vec::new();
        for vb in &pdu.varbinds {
            let mut cursor = vb.oid.clone();
            for _ in 0..max_repetitions.max(1) {
                match self.mib.get_next(&cursor) {
                    Some(entry) => {
                        cursor = entry.oid.clone();
                        let biased = self.apply_bias(&entry.oid, entry.value);
                        varbinds.push(VarBind { oid: entry.oid, value: VarBindValue::Value(biased) });
                    }
                    None => {
                        varbinds.push(VarBind { oid: cursor.clone(), value: VarBindValue::EndOfMibView });
                        break;
                    }
                }
            }
        }
        Pdu { kind: PduKind::GetResponse, request_id: pdu.request_id, error_status: ERR_NO_ERROR, error_index: 0, varbinds }
    }

    fn handle_set(&self, pdu: &Pdu) -> Pdu {
        for (idx, vb) in pdu.varbinds.iter().enumerate() {
            if !self.writable_oids.contains(&vb.oid.to_string()) {
                return Pdu {
                    kind: PduKind::GetResponse,
                    request_id: pdu.request_id,
                    error_status: ERR_NO_ACCESS,
                    error_index: (idx + 1) as i32,
                    varbinds: pdu.varbinds.clone(),
                };
            }
        }
        // Nothing is actually writable by default (empty whitelist); any
        // OID present in `writable_oids` is acknowledged but not persisted
        // across requests, since the walk MIB is immutable in this design.
        response(pdu, pdu.varbinds.clone())
    }
}

fn response(pdu: &Pdu, varbinds: Vec<VarBind>) -> Pdu {
    Pdu { kind: PduKind::GetResponse, request_id: pdu.request_id, error_status: ERR_NO_ERROR, error_index: 0, varbinds }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Builds a `GET` request datagram; exposed for tests and for tooling that
/// wants to poll a running agent the same way a real manager would.
pub fn build_get_request(version: SnmpVersion, community: &str, request_id: i32, oids: &[Oid]) -> Vec<u8> {
    Message {
        version,
        community: community.as_bytes().to_vec(),
        pdu: Pdu {
            kind: PduKind::GetRequest,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds: oids.iter().cloned().map(VarBind::unset).collect(),
        },
    }
    .encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mib::SystemMibConfig;
    use niac_types::MibEntry;

    fn system() -> SystemMibConfig {
        SystemMibConfig {
            sys_descr: "niac simulated switch".into(),
            sys_object_id: Oid::parse("1.3.6.1.4.1.9.1.1").unwrap(),
            sys_contact: "ops@example.com".into(),
            sys_name: "sw1".into(),
            sys_location: "lab".into(),
            sys_services: 2,
        }
    }

    fn agent() -> SnmpAgent {
        let walk = vec![MibEntry { oid: Oid::parse("1.3.6.1.2.1.2.2.1.10.1").unwrap(), value: MibValue::Counter32(100) }];
        SnmpAgent::new("public".into(), BTreeSet::new(), MibStore::new(system(), walk))
    }

    #[test]
    fn wrong_community_is_dropped_silently() {
        let agent = agent();
        let req = build_get_request(SnmpVersion::V2c, "wrong", 1, &[Oid::parse("1.3.6.1.2.1.1.1.0").unwrap()]);
        assert!(agent.handle(&req).is_none());
    }

    #[test]
    fn get_returns_system_descr() {
        let agent = agent();
        let req = build_get_request(SnmpVersion::V2c, "public", 1, &[Oid::parse("1.3.6.1.2.1.1.1.0").unwrap()]);
        let reply = agent.handle(&req).unwrap();
        let parsed = Message::parse(&reply).unwrap();
        match &parsed.pdu.varbinds[0].value {
            VarBindValue::Value(MibValue::String(s)) => assert_eq!(s, "niac simulated switch"),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn get_unknown_oid_returns_no_such_object() {
        let agent = agent();
        let req = build_get_request(SnmpVersion::V2c, "public", 1, &[Oid::parse("1.3.6.1.9.9.9.0").unwrap()]);
        let reply = agent.handle(&req).unwrap();
        let parsed = Message::parse(&reply).unwrap();
        assert_eq!(parsed.pdu.varbinds[0].value, VarBindValue::NoSuchObject);
    }

    #[test]
    fn set_without_whitelist_entry_is_rejected() {
        let agent = agent();
        let msg = Message {
            version: SnmpVersion::V2c,
            community: b"public".to_vec(),
            pdu: Pdu {
                kind: PduKind::SetRequest,
                request_id: 5,
                error_status: 0,
                error_index: 0,
                varbinds: vec![VarBind { oid: Oid::parse("1.3.6.1.2.1.1.4.0").unwrap(), value: VarBindValue::Value(MibValue::String("x".into())) }],
            },
        };
        let reply = agent.handle(&msg.encode()).unwrap();
        let parsed = Message::parse(&reply).unwrap();
        assert_eq!(parsed.pdu.error_status, ERR_NO_ACCESS);
    }

    #[test]
    fn bias_hook_rewrites_values_returned_by_get_and_get_next() {
        let walk = vec![MibEntry { oid: Oid::parse("1.3.6.1.2.1.2.2.1.10.1").unwrap(), value: MibValue::Counter32(100) }];
        let agent = SnmpAgent::new("public".into(), BTreeSet::new(), MibStore::new(system(), walk))
            .with_bias(Arc::new(|_oid, value| match value {
                MibValue::Counter32(n) => MibValue::Counter32(n * 2),
                other => other,
            }));
        let oid = Oid::parse("1.3.6.1.2.1.2.2.1.10.1").unwrap();
        let req = build_get_request(SnmpVersion::V2c, "public", 1, &[oid]);
        let reply = agent.handle(&req).unwrap();
        let parsed = Message::parse(&reply).unwrap();
        assert_eq!(parsed.pdu.varbinds[0].value, VarBindValue::Value(MibValue::Counter32(200)));
    }
}
