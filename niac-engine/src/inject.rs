//! The Error-Injection Controller (C12): a per-(device, interface,
//! error-type) rate table the SNMP agent consults when synthesizing
//! counters and gauges (`spec.md` §4.12).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use niac_types::{Oid, ThresholdMetric};
use serde::{Deserialize, Serialize};

/// The injectable error/metric categories enumerated in `spec.md` §4.12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    Fcs,
    Discards,
    InterfaceErrors,
    Utilization,
    Cpu,
    Memory,
    Disk,
}

impl ErrorKind {
    /// Counter-based types get multiplied; utilization-like types get
    /// biased toward the configured rate instead.
    fn is_counter(self) -> bool {
        matches!(self, ErrorKind::Fcs | ErrorKind::Discards | ErrorKind::InterfaceErrors)
    }
}

/// Maps a trap threshold metric (`spec.md` §4.8) onto the matching
/// injection category, so the trap evaluator and the counter/gauge bias
/// share one rate table per device.
pub fn error_kind_for_metric(metric: ThresholdMetric) -> ErrorKind {
    match metric {
        ThresholdMetric::Cpu => ErrorKind::Cpu,
        ThresholdMetric::Memory => ErrorKind::Memory,
        ThresholdMetric::Disk => ErrorKind::Disk,
        ThresholdMetric::InterfaceErrors => ErrorKind::InterfaceErrors,
    }
}

const IF_IN_DISCARDS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 13];
const IF_OUT_DISCARDS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 19];
const IF_IN_ERRORS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 14];
const IF_OUT_ERRORS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 20];
const DOT3_FCS_ERRORS: &[u32] = &[1, 3, 6, 1, 2, 1, 10, 7, 2, 1, 3];

/// Recognizes the standard IF-MIB/EtherLike-MIB per-interface counter OIDs
/// (`ifInDiscards`/`ifOutDiscards`, `ifInErrors`/`ifOutErrors`,
/// `dot3StatsFCSErrors`), keyed by the trailing `ifIndex` arc, so a walk
/// entry under one of these OIDs can be biased by the configured rate for
/// that interface.
pub fn classify_interface_counter(oid: &Oid) -> Option<(ErrorKind, u32)> {
    let arcs = &oid.0;
    if arcs.len() < 2 {
        return None;
    }
    let (prefix, last) = arcs.split_at(arcs.len() - 1);
    let if_index = last[0];
    let kind = if prefix == IF_IN_DISCARDS || prefix == IF_OUT_DISCARDS {
        ErrorKind::Discards
    } else if prefix == IF_IN_ERRORS || prefix == IF_OUT_ERRORS {
        ErrorKind::InterfaceErrors
    } else if prefix == DOT3_FCS_ERRORS {
        ErrorKind::Fcs
    } else {
        return None;
    };
    Some((kind, if_index))
}

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    rate_percent: u8,
    enabled: bool,
}

/// Per-(device, interface, error-type) injection table. `clear` disables
/// an entry without forgetting its configured rate, so re-enabling later
/// restores the same value (`spec.md` §4.12's "preserves the slot").
#[derive(Clone, Default)]
pub struct InjectionTable {
    inner: Arc<RwLock<HashMap<(String, String, ErrorKind), Entry>>>,
}

impl InjectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rate(&self, device: &str, interface: &str, kind: ErrorKind, rate_percent: u8) {
        let key = (device.to_string(), interface.to_string(), kind);
        self.inner.write().unwrap().insert(key, Entry { rate_percent: rate_percent.min(100), enabled: true });
    }

    /// Disables the entry but keeps its rate for a later `set_rate` to
    /// re-enable at the same value (repeat enable without re-specifying
    /// the rate is not required by this API, but the slot is retained in
    /// case a caller only flips the enabled flag).
    pub fn clear(&self, device: &str, interface: &str, kind: ErrorKind) {
        let key = (device.to_string(), interface.to_string(), kind);
        if let Some(entry) = self.inner.write().unwrap().get_mut(&key) {
            entry.enabled = false;
        }
    }

    fn rate(&self, device: &str, interface: &str, kind: ErrorKind) -> Option<u8> {
        let key = (device.to_string(), interface.to_string(), kind);
        self.inner.read().unwrap().get(&key).filter(|e| e.enabled).map(|e| e.rate_percent)
    }

    /// Applies the configured bias to a counter-based metric: the base
    /// counter multiplied by `(1 + rate/100)`, per poll.
    pub fn biased_counter(&self, device: &str, interface: &str, kind: ErrorKind, base: u64) -> u64 {
        debug_assert!(kind.is_counter());
        match self.rate(device, interface, kind) {
            Some(rate) => base + (base * rate as u64) / 100,
            None => base,
        }
    }

    /// Applies the configured bias to a utilization-like gauge: pulls the
    /// value toward the configured rate (not a strict overwrite, so a
    /// gauge that's already near the target doesn't jump), capped at 100.
    pub fn biased_gauge(&self, device: &str, interface: &str, kind: ErrorKind, base: u8) -> u8 {
        debug_assert!(!kind.is_counter());
        match self.rate(device, interface, kind) {
            Some(rate) => {
                let biased = (base as u32 + rate as u32) / 2;
                biased.min(100) as u8
            }
            None => base,
        }
    }

    /// Same pull-toward-rate bias as [`Self::biased_gauge`], but over `f64`
    /// and with no counter/gauge split, for the trap threshold evaluator
    /// (`spec.md` §4.8), which treats `Cpu`/`Memory`/`Disk`/`InterfaceErrors`
    /// uniformly as 0-100 percentages regardless of how each is represented
    /// on the wire.
    pub fn biased_percent(&self, device: &str, interface: &str, kind: ErrorKind, base: f64) -> f64 {
        match self.rate(device, interface, kind) {
            Some(rate) => ((base + rate as f64) / 2.0).min(100.0),
            None => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_bias_multiplies_base_by_rate() {
        let table = InjectionTable::new();
        table.set_rate("r1", "eth0", ErrorKind::Fcs, 50);
        assert_eq!(table.biased_counter("r1", "eth0", ErrorKind::Fcs, 1000), 1500);
    }

    #[test]
    fn clear_disables_but_preserves_rate_for_next_enable() {
        let table = InjectionTable::new();
        table.set_rate("r1", "eth0", ErrorKind::Discards, 25);
        table.clear("r1", "eth0", ErrorKind::Discards);
        assert_eq!(table.biased_counter("r1", "eth0", ErrorKind::Discards, 100), 100);
        table.set_rate("r1", "eth0", ErrorKind::Discards, 25);
        assert_eq!(table.biased_counter("r1", "eth0", ErrorKind::Discards, 100), 125);
    }

    #[test]
    fn gauge_bias_is_capped_at_100() {
        let table = InjectionTable::new();
        table.set_rate("r1", "eth0", ErrorKind::Cpu, 100);
        assert_eq!(table.biased_gauge("r1", "eth0", ErrorKind::Cpu, 90), 95);
    }

    #[test]
    fn unset_entry_leaves_base_unchanged() {
        let table = InjectionTable::new();
        assert_eq!(table.biased_counter("r1", "eth0", ErrorKind::InterfaceErrors, 42), 42);
        assert_eq!(table.biased_gauge("r1", "eth0", ErrorKind::Memory, 10), 10);
    }

    #[test]
    fn biased_percent_is_capped_at_100_and_ignores_counter_split() {
        let table = InjectionTable::new();
        table.set_rate("r1", "system", ErrorKind::InterfaceErrors, 100);
        assert_eq!(table.biased_percent("r1", "system", ErrorKind::InterfaceErrors, 80.0), 90.0);
        assert_eq!(table.biased_percent("r1", "system", ErrorKind::Cpu, 10.0), 10.0);
    }

    #[test]
    fn classify_interface_counter_recognizes_if_mib_and_etherlike_oids() {
        let in_discards: Oid = "1.3.6.1.2.1.2.2.1.13.7".parse().unwrap();
        let out_errors: Oid = "1.3.6.1.2.1.2.2.1.20.3".parse().unwrap();
        let fcs: Oid = "1.3.6.1.2.1.10.7.2.1.3.2".parse().unwrap();
        let unrelated: Oid = "1.3.6.1.2.1.1.1.0".parse().unwrap();

        assert_eq!(classify_interface_counter(&in_discards), Some((ErrorKind::Discards, 7)));
        assert_eq!(classify_interface_counter(&out_errors), Some((ErrorKind::InterfaceErrors, 3)));
        assert_eq!(classify_interface_counter(&fcs), Some((ErrorKind::Fcs, 2)));
        assert_eq!(classify_interface_counter(&unrelated), None);
    }

    #[test]
    fn error_kind_for_metric_maps_each_threshold_metric() {
        assert_eq!(error_kind_for_metric(ThresholdMetric::Cpu), ErrorKind::Cpu);
        assert_eq!(error_kind_for_metric(ThresholdMetric::Memory), ErrorKind::Memory);
        assert_eq!(error_kind_for_metric(ThresholdMetric::Disk), ErrorKind::Disk);
        assert_eq!(error_kind_for_metric(ThresholdMetric::InterfaceErrors), ErrorKind::InterfaceErrors);
    }
}
