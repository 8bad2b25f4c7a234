//! `niac config`: export/diff/merge helpers that operate purely on YAML
//! files and never touch a running simulation (`spec.md` §6).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Subcommand};
use niac_config::SimConfig;

#[derive(ClapArgs)]
pub struct Args {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand)]
pub enum Action {
    /// Load, validate, and re-serialize a config into canonical YAML
    Export { config: PathBuf, output: PathBuf },
    /// Summarize which devices were added, removed, or changed between two configs
    Diff { a: PathBuf, b: PathBuf },
    /// Merge two configs, with devices in `overlay` replacing same-named devices in `base`
    Merge { base: PathBuf, overlay: PathBuf, output: PathBuf },
}

pub fn run(args: Args) -> anyhow::Result<()> {
    match args.action {
        Action::Export { config, output } => export(&config, &output),
        Action::Diff { a, b } => diff(&a, &b),
        Action::Merge { base, overlay, output } => merge(&base, &overlay, &output),
    }
}

fn load(path: &Path) -> anyhow::Result<SimConfig> {
    let contents = std::fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(SimConfig::load_yaml(&contents, base_dir)?)
}

fn export(config: &Path, output: &Path) -> anyhow::Result<()> {
    let cfg = load(config)?;
    niac_config::validate(&cfg)?;
    std::fs::write(output, cfg.to_yaml()?)?;
    println!("wrote {}", output.display());
    Ok(())
}

fn diff(a: &Path, b: &Path) -> anyhow::Result<()> {
    let cfg_a = load(a)?;
    let cfg_b = load(b)?;
    let names_a: BTreeSet<_> = cfg_a.devices.iter().map(|d| d.name.clone()).collect();
    let names_b: BTreeSet<_> = cfg_b.devices.iter().map(|d| d.name.clone()).collect();

    for added in names_b.difference(&names_a) {
        println!("+ {added}");
    }
    for removed in names_a.difference(&names_b) {
        println!("- {removed}");
    }
    for name in names_a.intersection(&names_b) {
        let da = cfg_a.devices.iter().find(|d| &d.name == name);
        let db = cfg_b.devices.iter().find(|d| &d.name == name);
        if serde_yaml::to_string(&da)? != serde_yaml::to_string(&db)? {
            println!("~ {name}");
        }
    }
    Ok(())
}

fn merge(base: &Path, overlay: &Path, output: &Path) -> anyhow::Result<()> {
    let mut cfg = load(base)?;
    let overlay_cfg = load(overlay)?;

    for device in overlay_cfg.devices {
        match cfg.devices.iter_mut().find(|d| d.name == device.name) {
            Some(existing) => *existing = device,
            None => cfg.devices.push(device),
        }
    }

    niac_config::validate(&cfg)?;
    std::fs::write(output, cfg.to_yaml()?)?;
    println!("wrote {}", output.display());
    Ok(())
}
