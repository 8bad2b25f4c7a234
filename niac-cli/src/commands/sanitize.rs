//! `niac sanitize`: strip SNMP community strings and contact details
//! before a config is shared outside the team that owns it.

use std::path::PathBuf;

use clap::Args as ClapArgs;
use niac_config::SimConfig;

const REDACTED: &str = "REDACTED";

#[derive(ClapArgs)]
pub struct Args {
    pub config: PathBuf,
    pub output: PathBuf,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(&args.config)?;
    let base_dir = args.config.parent().unwrap_or_else(|| std::path::Path::new("."));
    let mut config = SimConfig::load_yaml(&contents, base_dir)?;

    for device in &mut config.devices {
        if let Some(snmp) = &mut device.snmp_agent {
            if !snmp.community.is_empty() {
                snmp.community = REDACTED.to_string();
            }
            if !snmp.sys_contact.is_empty() {
                snmp.sys_contact = REDACTED.to_string();
            }
        }
        if let Some(dhcp) = &mut device.dhcp {
            for lease in &mut dhcp.static_leases {
                lease.hostname = lease.hostname.as_ref().map(|_| REDACTED.to_string());
            }
        }
    }

    std::fs::write(&args.output, config.to_yaml()?)?;
    println!("wrote sanitized config to {}", args.output.display());
    Ok(())
}
