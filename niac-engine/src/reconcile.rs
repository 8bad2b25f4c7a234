//! The Live Config Reconciler (C14): diffs the running device set against
//! a proposed one, applies the plan while the capture handle stays open,
//! and reverts atomically on failure (`spec.md` §4.14).

use std::collections::HashMap;

use niac_types::{Device, Error};
use serde::Serialize;
use serde_json::Value;

use crate::index::DeviceIndex;

/// One device's before/after diff, restricted to the protocol blocks that
/// actually changed.
#[derive(Debug, Clone, Serialize)]
pub struct ModifiedDevice {
    pub name: String,
    pub changed_blocks: Vec<&'static str>,
}

/// The plan produced by [`diff`]: what the reconciler needs to stop,
/// rebuild, and restart.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ReconcilePlan {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<ModifiedDevice>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Every device name whose transmitters/timers need to be stopped:
    /// removed outright, or modified in a way that changes a periodic
    /// emitter's config.
    pub fn devices_to_restart(&self) -> Vec<String> {
        self.added.iter().cloned().chain(self.modified.iter().map(|m| m.name.clone())).collect()
    }
}

fn block_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Field-by-field comparison of two same-named devices, restricted to the
/// blocks a periodic transmitter or handler cares about. Compares via
/// `serde_json::Value` rather than requiring `PartialEq` on every nested
/// config type.
fn changed_blocks(old: &Device, new: &Device) -> Vec<&'static str> {
    let mut changed = Vec::new();
    macro_rules! check {
        ($label:literal, $field:ident) => {
            if block_value(&old.$field) != block_value(&new.$field) {
                changed.push($label);
            }
        };
    }
    check!("mac", mac);
    check!("ips", ips);
    check!("ipv6s", ipv6s);
    check!("vlan", vlan);
    check!("interfaces", interfaces);
    check!("icmp", icmp);
    check!("snmp_agent", snmp_agent);
    check!("lldp", lldp);
    check!("cdp", cdp);
    check!("edp", edp);
    check!("fdp", fdp);
    check!("dhcp", dhcp);
    check!("dns", dns);
    check!("stp", stp);
    check!("traffic", traffic);
    check!("port_channels", port_channels);
    check!("trunk_ports", trunk_ports);
    check!("gratuitous_arp", gratuitous_arp);
    changed
}

/// Computes the add/remove/modify plan between the currently-running
/// device set and a proposed one.
pub fn diff(current: &[Device], proposed: &[Device]) -> ReconcilePlan {
    let current_by_name: HashMap<&str, &Device> = current.iter().map(|d| (d.name.as_str(), d)).collect();
    let proposed_by_name: HashMap<&str, &Device> = proposed.iter().map(|d| (d.name.as_str(), d)).collect();

    let mut plan = ReconcilePlan::default();
    for name in proposed_by_name.keys() {
        if !current_by_name.contains_key(name) {
            plan.added.push((*name).to_string());
        }
    }
    for name in current_by_name.keys() {
        if !proposed_by_name.contains_key(name) {
            plan.removed.push((*name).to_string());
        }
    }
    for (name, new_device) in &proposed_by_name {
        if let Some(old_device) = current_by_name.get(name) {
            let blocks = changed_blocks(old_device, new_device);
            if !blocks.is_empty() {
                plan.modified.push(ModifiedDevice { name: (*name).to_string(), changed_blocks: blocks });
            }
        }
    }
    plan.added.sort();
    plan.removed.sort();
    plan.modified.sort_by(|a, b| a.name.cmp(&b.name));
    plan
}

/// Applies a proposed device set against the running index: rebuilds the
/// index atomically (D1 must hold, or the prior snapshot is kept and the
/// error is returned) and returns the plan so the caller can restart the
/// affected transmitters/timers.
pub fn apply(index: &DeviceIndex, current: &[Device], proposed: Vec<Device>) -> Result<ReconcilePlan, Error> {
    let plan = diff(current, &proposed);
    index.rebuild(proposed)?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use niac_types::{DeviceKind, IcmpConfig, MacAddr};
    use std::net::Ipv4Addr;

    fn device(name: &str, mac: [u8; 6], ttl: u8) -> Device {
        Device {
            name: name.into(),
            kind: DeviceKind::Router,
            mac: MacAddr::new(mac),
            ips: vec![Ipv4Addr::new(10, 0, 0, 1)],
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
    fn detects_added_and_removed_devices() {
        let current = vec![device("r1", [1; 6], 64)];
        let proposed = vec![device("r2", [2; 6], 64)];
        let plan = diff(&current, &proposed);
        assert_eq!(plan.added, vec!["r2"]);
        assert_eq!(plan.removed, vec!["r1"]);
        assert!(plan.modified.is_empty());
    }

    #[test]
    fn detects_modified_blocks_by_name() {
        let current = vec![device("r1", [1; 6], 64)];
        let proposed = vec![device("r1", [1; 6], 128)];
        let plan = diff(&current, &proposed);
        assert!(plan.added.is_empty() && plan.removed.is_empty());
        assert_eq!(plan.modified.len(), 1);
        assert_eq!(plan.modified[0].changed_blocks, vec!["icmp"]);
    }

    #[test]
    fn apply_rejects_duplicate_mac_and_leaves_prior_snapshot() {
        let index = DeviceIndex::new();
        index.rebuild(vec![device("r1", [1; 6], 64)]).unwrap();
        let current = vec![device("r1", [1; 6], 64)];
        let bad_proposed = vec![device("r1", [1; 6], 64), device("r2", [1; 6], 64)];
        assert!(apply(&index, &current, bad_proposed).is_err());
        assert_eq!(index.snapshot().len(), 1);
    }

    #[test]
    fn unchanged_devices_produce_an_empty_plan() {
        let current = vec![device("r1", [1; 6], 64)];
        let proposed = vec![device("r1", [1; 6], 64)];
        assert!(diff(&current, &proposed).is_empty());
    }
}
