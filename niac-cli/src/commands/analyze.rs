//! `niac analyze-walk` / `niac analyze-pcap`: quick summaries of the
//! reference files a device's SNMP agent or a `capture_playback` entry
//! loads, without needing a running simulation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args as ClapArgs;

#[derive(ClapArgs)]
pub struct WalkArgs {
    pub file: PathBuf,
}

#[derive(ClapArgs)]
pub struct PcapArgs {
    pub file: PathBuf,
}

pub fn run_walk(args: WalkArgs) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(&args.file)?;
    let entries = niac_snmp::parse_walk_file(&contents)?;

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for entry in &entries {
        *counts.entry(entry.value.type_name()).or_default() += 1;
    }

    println!(
        "{} entries, OID range [{} .. {}]",
        entries.len(),
        entries.first().map(|e| e.oid.to_string()).unwrap_or_default(),
        entries.last().map(|e| e.oid.to_string()).unwrap_or_default(),
    );
    for (type_name, count) in counts {
        println!("  {type_name}: {count}");
    }
    Ok(())
}

pub fn run_pcap(args: PcapArgs) -> anyhow::Result<()> {
    let frames = niac_replay::load_pcap(&args.file)?;
    let total_secs = frames.last().map(|f| f.offset.as_secs_f64()).unwrap_or(0.0);
    let total_bytes: usize = frames.iter().map(|f| f.bytes.len()).sum();
    let avg_bytes = total_bytes.checked_div(frames.len()).unwrap_or(0);

    println!("{} frames over {total_secs:.3}s, {total_bytes} bytes total ({avg_bytes} bytes/frame avg)", frames.len());
    Ok(())
}
