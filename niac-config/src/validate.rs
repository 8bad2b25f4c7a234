//! Structured validation (`spec.md` §6): every failure carries a field
//! path, what was expected, what was found, and (where possible) a fix
//! suggestion, rather than relying on `serde`'s parse-error text.

use std::collections::HashSet;

use niac_types::Error;

use crate::model::SimConfig;

pub fn validate(config: &SimConfig) -> Result<(), Error> {
    let mut names = HashSet::new();
    let mut macs = HashSet::new();
    let mut ips = HashSet::new();

    for (idx, device) in config.devices.iter().enumerate() {
        let path = format!("devices[{idx}]");

        if device.name.is_empty() {
            return Err(Error::config_invalid(format!("{path}.name"), "non-empty string", "\"\"", None));
        }
        if !names.insert(device.name.clone()) {
            return Err(Error::Conflict(format!("duplicate device name {:?} ({path})", device.name)));
        }
        if !macs.insert(device.mac) {
            return Err(Error::Conflict(format!("duplicate MAC {} ({path})", device.mac)));
        }
        for ip in &device.ips {
            if !ips.insert(*ip) {
                return Err(Error::Conflict(format!("duplicate IP {ip} ({path})")));
            }
        }

        if let Some(stp) = &device.stp {
            if stp.bridge_priority > 61440 || stp.bridge_priority % 4096 != 0 {
                return Err(Error::config_invalid(
                    format!("{path}.stp.bridge_priority"),
                    "multiple of 4096 in [0, 61440]",
                    stp.bridge_priority.to_string(),
                    Some("use e.g. 32768"),
                ));
            }
        }

        if let Some(snmp) = &device.snmp_agent {
            for (ti, trap) in snmp.traps.iter().enumerate() {
                if !(0.0..=100.0).contains(&trap.threshold) {
                    return Err(Error::config_invalid(
                        format!("{path}.snmp_agent.traps[{ti}].threshold"),
                        "a value in [0, 100]",
                        trap.threshold.to_string(),
                        None,
                    ));
                }
            }
        }

        if let Some(dhcp) = &device.dhcp {
            if let Some(pool) = &dhcp.pool {
                if u32::from(pool.start) > u32::from(pool.end) {
                    return Err(Error::config_invalid(
                        format!("{path}.dhcp.pool"),
                        "start <= end",
                        format!("{} > {}", pool.start, pool.end),
                        None,
                    ));
                }
            }
        }
    }

    for (idx, entry) in config.capture_playback.iter().enumerate() {
        if entry.scale <= 0.0 {
            return Err(Error::config_invalid(
                format!("capture_playback[{idx}].scale"),
                "a positive number",
                entry.scale.to_string(),
                Some("use 1.0 for real-time playback"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use niac_types::{Device, MacAddr, StpConfig};

    fn base_device(name: &str, mac: [u8; 6]) -> Device {
        Device {
            name: name.into(),
            kind: Default::default(),
            mac: MacAddr::new(mac),
            ips: vec![],
            ipv6s: vec![],
            vlan: None,
            interfaces: vec![],
            icmp: Default::default(),
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
    fn duplicate_mac_fails_validation() {
        let config = SimConfig {
            devices: vec![base_device("a", [1, 2, 3, 4, 5, 6]), base_device("b", [1, 2, 3, 4, 5, 6])],
            ..Default::default()
        };
        assert!(matches!(validate(&config), Err(Error::Conflict(_))));
    }

    #[test]
    fn bridge_priority_must_be_multiple_of_4096() {
        let mut device = base_device("sw1", [1, 2, 3, 4, 5, 6]);
        device.stp = Some(StpConfig { bridge_priority: 1000, max_age_secs: 20, forward_delay_secs: 15 });
        let config = SimConfig { devices: vec![device], ..Default::default() };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn valid_config_passes() {
        let mut device = base_device("r1", [1, 2, 3, 4, 5, 6]);
        device.stp = Some(StpConfig { bridge_priority: 32768, max_age_secs: 20, forward_delay_secs: 15 });
        let config = SimConfig { devices: vec![device], ..Default::default() };
        assert!(validate(&config).is_ok());
    }
}
