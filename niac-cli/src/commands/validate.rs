//! `niac validate`: parse and validate a config without running anything.

use std::path::PathBuf;

use clap::Args as ClapArgs;
use niac_config::SimConfig;

#[derive(ClapArgs)]
pub struct Args {
    pub config: PathBuf,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(&args.config)?;
    let base_dir = args.config.parent().unwrap_or_else(|| std::path::Path::new("."));
    let config = SimConfig::load_yaml(&contents, base_dir)?;
    niac_config::validate(&config)?;

    println!(
        "{}: OK ({} device{})",
        args.config.display(),
        config.devices.len(),
        if config.devices.len() == 1 { "" } else { "s" }
    );
    Ok(())
}
