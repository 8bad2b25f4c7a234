//! Legacy `.cfg` format (`spec.md` §6): a restricted key/value subset,
//! one `[device]` section per device, converging into the same [`Device`]
//! struct the YAML loader produces.

use std::net::Ipv4Addr;
use std::str::FromStr;

use niac_types::{Device, DeviceKind, Error, MacAddr, Vlan};

pub fn parse(contents: &str) -> Result<Vec<Device>, Error> {
    let mut devices = Vec::new();
    let mut current: Option<Device> = None;

    for (lineno, raw) in contents.lines().enumerate() {
        let line = raw.split(['#', ';']).next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        if line == "[device]" {
            if let Some(device) = current.take() {
                devices.push(finish(device, lineno)?);
            }
            current = Some(blank_device());
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| legacy_error(lineno, line, "missing '='"))?;
        let (key, value) = (key.trim(), value.trim());
        let device = current
            .as_mut()
            .ok_or_else(|| legacy_error(lineno, line, "key/value found outside a [device] section"))?;

        match key {
            "name" => device.name = value.to_string(),
            "type" => device.kind = parse_kind(value),
            "mac" => {
                device.mac = MacAddr::from_str(value).map_err(|_| legacy_error(lineno, line, "invalid MAC address"))?
            }
            "ip" => device.ips.push(
                Ipv4Addr::from_str(value).map_err(|_| legacy_error(lineno, line, "invalid IPv4 address"))?,
            ),
            "vlan" => {
                let id: u16 = value.parse().map_err(|_| legacy_error(lineno, line, "invalid VLAN id"))?;
                device.vlan = Some(Vlan::new(id).ok_or_else(|| legacy_error(lineno, line, "VLAN id out of range 1..=4094"))?);
            }
            other => return Err(legacy_error(lineno, line, &format!("unsupported legacy key {other:?}"))),
        }
    }

    if let Some(device) = current.take() {
        devices.push(finish(device, contents.lines().count())?);
    }

    Ok(devices)
}

fn blank_device() -> Device {
    Device {
        name: String::new(),
        kind: DeviceKind::default(),
        mac: MacAddr::ZERO,
        ips: Vec::new(),
        ipv6s: Vec::new(),
        vlan: None,
        interfaces: Vec::new(),
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
        port_channels: Vec::new(),
        trunk_ports: Vec::new(),
        gratuitous_arp: false,
    }
}

fn parse_kind(value: &str) -> DeviceKind {
    match value {
        "router" => DeviceKind::Router,
        "switch" => DeviceKind::Switch,
        "access-point" => DeviceKind::AccessPoint,
        "server" => DeviceKind::Server,
        "workstation" => DeviceKind::Workstation,
        "firewall" => DeviceKind::Firewall,
        other => DeviceKind::Other(other.to_string()),
    }
}

fn finish(device: Device, lineno: usize) -> Result<Device, Error> {
    if device.name.is_empty() {
        return Err(legacy_error(lineno, "[device]", "section ended without a name ="));
    }
    if device.mac == MacAddr::ZERO {
        return Err(legacy_error(lineno, "[device]", "section ended without a mac ="));
    }
    Ok(device)
}

fn legacy_error(lineno: usize, line: &str, suggestion: &str) -> Error {
    Error::ConfigInvalid {
        field: format!("legacy_cfg:{}", lineno + 1),
        expected: "key = value, or [device]".into(),
        got: line.to_string(),
        suggestion: suggestion.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_devices() {
        let input = "\
            [device]\n\
            name = r1\n\
            type = router\n\
            mac = 00:11:22:33:44:55\n\
            ip = 192.168.1.1\n\
            [device]\n\
            name = sw1\n\
            type = switch\n\
            mac = 00:11:22:33:44:66\n\
        ";
        let devices = parse(input).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "r1");
        assert_eq!(devices[0].ips, vec![Ipv4Addr::new(192, 168, 1, 1)]);
        assert_eq!(devices[1].kind, DeviceKind::Switch);
    }

    #[test]
    fn rejects_key_outside_device_section() {
        assert!(parse("name = orphan\n").is_err());
    }
}
