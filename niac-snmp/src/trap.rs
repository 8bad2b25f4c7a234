//! Trap emission (`spec.md` §4.8): cold-start on startup, link-state
//! changes, and debounced threshold crossings for CPU/memory/disk/interface
//! error rates.

use std::collections::HashMap;

use niac_types::{MibValue, Oid, ThresholdMetric, TrapPolicy};

use crate::pdu::{Message, Pdu, PduKind, SnmpVersion, VarBind, VarBindValue};

const SNMP_TRAP_OID: &[u32] = &[1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0];
const SYS_UPTIME_OID: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 3, 0];

const COLD_START_OID: &[u32] = &[1, 3, 6, 1, 6, 3, 1, 1, 5, 1];
const LINK_DOWN_OID: &[u32] = &[1, 3, 6, 1, 6, 3, 1, 1, 5, 3];
const LINK_UP_OID: &[u32] = &[1, 3, 6, 1, 6, 3, 1, 1, 5, 4];
const THRESHOLD_CROSSED_OID: &[u32] = &[1, 3, 6, 1, 4, 1, 9, 9, 1, 1];

fn wrap(community: &str, uptime_ticks: u32, trap_oid: &[u32], extra: Vec<VarBind>) -> Vec<u8> {
    let mut varbinds = vec![
        VarBind { oid: Oid(SYS_UPTIME_OID.to_vec()), value: VarBindValue::Value(MibValue::Timeticks(uptime_ticks)) },
        VarBind { oid: Oid(SNMP_TRAP_OID.to_vec()), value: VarBindValue::Value(MibValue::Oid(Oid(trap_oid.to_vec()))) },
    ];
    varbinds.extend(extra);
    Message {
        version: SnmpVersion::V2c,
        community: community.as_bytes().to_vec(),
        pdu: Pdu { kind: PduKind::SnmpV2Trap, request_id: 0, error_status: 0, error_index: 0, varbinds },
    }
    .encode()
}

pub fn cold_start(community: &str, uptime_ticks: u32) -> Vec<u8> {
    wrap(community, uptime_ticks, COLD_START_OID, Vec::new())
}

pub fn link_state(community: &str, uptime_ticks: u32, if_index: i64, up: bool) -> Vec<u8> {
    let trap_oid = if up { LINK_UP_OID } else { LINK_DOWN_OID };
    let extra = vec![VarBind {
        oid: Oid(vec![1, 3, 6, 1, 2, 1, 2, 2, 1, 1, if_index as u32]),
        value: VarBindValue::Value(MibValue::Integer(if_index)),
    }];
    wrap(community, uptime_ticks, trap_oid, extra)
}

pub fn threshold_crossed(community: &str, uptime_ticks: u32, metric: ThresholdMetric, value: f64) -> Vec<u8> {
    let extra = vec![VarBind {
        oid: Oid(vec![1, 3, 6, 1, 4, 1, 9, 9, 1, 1, metric_index(metric)]),
        value: VarBindValue::Value(MibValue::Gauge32(value.round().clamp(0.0, u32::MAX as f64) as u32)),
    }];
    wrap(community, uptime_ticks, THRESHOLD_CROSSED_OID, extra)
}

fn metric_index(metric: ThresholdMetric) -> u32 {
    match metric {
        ThresholdMetric::Cpu => 1,
        ThresholdMetric::Memory => 2,
        ThresholdMetric::Disk => 3,
        ThresholdMetric::InterfaceErrors => 4,
    }
}

/// Debounces threshold-crossing traps per `(policy)`: only a state
/// transition (below→above or above→below threshold) emits a trap.
#[derive(Default)]
pub struct ThresholdDebouncer {
    above: HashMap<ThresholdMetric, bool>,
}

impl ThresholdDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Some(now_above)` exactly when this sample crosses the
    /// policy's threshold relative to the previous sample; `None` when the
    /// state is unchanged.
    pub fn observe(&mut self, policy: &TrapPolicy, value: f64) -> Option<bool> {
        let now_above = value >= policy.threshold;
        let previous = self.above.insert(policy.metric, now_above);
        match previous {
            Some(was_above) if was_above == now_above => None,
            _ => Some(now_above),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_trap_carries_expected_trap_oid() {
        let bytes = cold_start("public", 12345);
        let msg = Message::parse(&bytes).unwrap();
        match &msg.pdu.varbinds[1].value {
            VarBindValue::Value(MibValue::Oid(oid)) => assert_eq!(oid, &Oid(COLD_START_OID.to_vec())),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn debouncer_only_fires_on_transition() {
        let policy = TrapPolicy { metric: ThresholdMetric::Cpu, threshold: 80.0, interval_secs: 10 };
        let mut debouncer = ThresholdDebouncer::new();
        assert_eq!(debouncer.observe(&policy, 50.0), Some(false));
        assert_eq!(debouncer.observe(&policy, 60.0), None);
        assert_eq!(debouncer.observe(&policy, 90.0), Some(true));
        assert_eq!(debouncer.observe(&policy, 95.0), None);
        assert_eq!(debouncer.observe(&policy, 10.0), Some(false));
    }
}
