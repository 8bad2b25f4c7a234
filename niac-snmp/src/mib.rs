//! The combined MIB view an agent answers from: the synthesized system MIB
//! (`1.3.6.1.2.1.1`) overlaid on a device's walk-file-backed entries.

use std::time::Instant;

use niac_types::{MibEntry, MibValue, Oid};

const SYSTEM_PREFIX: &[u32] = &[1, 3, 6, 1, 2, 1, 1];

fn system_oid(leaf: u32) -> Oid {
    let mut arcs = SYSTEM_PREFIX.to_vec();
    arcs.push(leaf);
    arcs.push(0);
    Oid(arcs)
}

/// Parameters used to synthesize the system MIB for one device.
#[derive(Debug, Clone)]
pub struct SystemMibConfig {
    pub sys_descr: String,
    pub sys_object_id: Oid,
    pub sys_contact: String,
    pub sys_name: String,
    pub sys_location: String,
    pub sys_services: i64,
}

/// Tracks agent start time so `sysUpTime` is monotonic and wraps correctly.
pub struct UpTimeClock {
    started: Instant,
}

impl UpTimeClock {
    pub fn start() -> Self {
        UpTimeClock { started: Instant::now() }
    }

    /// Hundredths of a second since start, wrapping at `u32::MAX` per
    /// RFC 1155's `TimeTicks` definition.
    pub fn ticks(&self) -> u32 {
        let hundredths = self.started.elapsed().as_millis() / 10;
        (hundredths % (u32::MAX as u128 + 1)) as u32
    }
}

fn system_entries(config: &SystemMibConfig, uptime: &UpTimeClock) -> Vec<MibEntry> {
    vec![
        MibEntry { oid: system_oid(1), value: MibValue::String(config.sys_descr.clone()) },
        MibEntry { oid: system_oid(2), value: MibValue::Oid(config.sys_object_id.clone()) },
        MibEntry { oid: system_oid(3), value: MibValue::Timeticks(uptime.ticks()) },
        MibEntry { oid: system_oid(4), value: MibValue::String(config.sys_contact.clone()) },
        MibEntry { oid: system_oid(5), value: MibValue::String(config.sys_name.clone()) },
        MibEntry { oid: system_oid(6), value: MibValue::String(config.sys_location.clone()) },
        MibEntry { oid: system_oid(7), value: MibValue::Integer(config.sys_services) },
    ]
}

/// A device's full MIB view: the synthesized system subtree plus whatever
/// was loaded from its walk file, merged and kept in strict OID order (D2).
pub struct MibStore {
    system: SystemMibConfig,
    uptime: UpTimeClock,
    walk: Vec<MibEntry>,
}

impl MibStore {
    pub fn new(system: SystemMibConfig, walk: Vec<MibEntry>) -> Self {
        // A later entry for the same OID replaces an earlier one (D2); a
        // map fold naturally gives the last-inserted value priority.
        let mut by_oid: std::collections::BTreeMap<Oid, MibValue> = std::collections::BTreeMap::new();
        for entry in walk {
            by_oid.insert(entry.oid, entry.value);
        }
        let walk = by_oid.into_iter().map(|(oid, value)| MibEntry { oid, value }).collect();
        MibStore { system, uptime: UpTimeClock::start(), walk }
    }

    fn merged(&self) -> Vec<MibEntry> {
        let mut entries = system_entries(&self.system, &self.uptime);
        entries.extend(self.walk.iter().cloned());
        entries.sort_by(|a, b| a.oid.cmp(&b.oid));
        entries
    }

    /// Exact match: system MIB takes priority when the OID falls under
    /// `1.3.6.1.2.1.1`, otherwise the walk MIB.
    pub fn get(&self, oid: &Oid) -> Option<MibValue> {
        if oid.starts_with(&Oid(SYSTEM_PREFIX.to_vec())) {
            return system_entries(&self.system, &self.uptime)
                .into_iter()
                .find(|e| &e.oid == oid)
                .map(|e| e.value);
        }
        self.walk.iter().find(|e| &e.oid == oid).map(|e| e.value.clone())
    }

    /// The lexicographically smallest OID strictly greater than `oid`,
    /// across the merged view.
    pub fn get_next(&self, oid: &Oid) -> Option<MibEntry> {
        self.merged().into_iter().find(|e| &e.oid > oid)
    }

    pub fn is_writable(&self, oid: &Oid, writable: &std::collections::BTreeSet<String>) -> bool {
        writable.contains(&oid.to_string())
    }

    /// `sysUpTime`'s raw tick value, for stamping traps with the same clock
    /// `GetRequest` responses use.
    pub fn uptime_ticks(&self) -> u32 {
        self.uptime.ticks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SystemMibConfig {
        SystemMibConfig {
            sys_descr: "niac simulated router".into(),
            sys_object_id: Oid::parse("1.3.6.1.4.1.9.1.1").unwrap(),
            sys_contact: "ops@example.com".into(),
            sys_name: "r1".into(),
            sys_location: "lab".into(),
            sys_services: 78,
        }
    }

    #[test]
    fn system_mib_overlays_walk_at_matching_oid() {
        let walk = vec![MibEntry { oid: Oid::parse("1.3.6.1.2.1.1.1.0").unwrap(), value: MibValue::String("ignored".into()) }];
        let store = MibStore::new(config(), walk);
        let got = store.get(&Oid::parse("1.3.6.1.2.1.1.1.0").unwrap()).unwrap();
        assert_eq!(got, MibValue::String("niac simulated router".into()));
    }

    #[test]
    fn get_next_walks_strictly_increasing() {
        let walk = vec![
            MibEntry { oid: Oid::parse("1.3.6.1.2.1.2.2.1.1.1").unwrap(), value: MibValue::Integer(1) },
            MibEntry { oid: Oid::parse("1.3.6.1.2.1.2.2.1.1.2").unwrap(), value: MibValue::Integer(2) },
        ];
        let store = MibStore::new(config(), walk);
        let first = store.get_next(&Oid::parse("1.3.6.1.2.1.2.2.1.1.1").unwrap()).unwrap();
        assert_eq!(first.oid, Oid::parse("1.3.6.1.2.1.2.2.1.1.2").unwrap());
        assert!(store.get_next(&first.oid).is_none() || store.get_next(&first.oid).unwrap().oid > first.oid);
    }

    #[test]
    fn duplicate_walk_oids_keep_later_entry() {
        let walk = vec![
            MibEntry { oid: Oid::parse("1.3.6.1.2.1.99.0").unwrap(), value: MibValue::Integer(1) },
            MibEntry { oid: Oid::parse("1.3.6.1.2.1.99.0").unwrap(), value: MibValue::Integer(2) },
        ];
        let store = MibStore::new(config(), walk);
        assert_eq!(store.get(&Oid::parse("1.3.6.1.2.1.99.0").unwrap()), Some(MibValue::Integer(2)));
    }
}
