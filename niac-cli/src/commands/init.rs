//! `niac init`: write a starter config so a new user has something to
//! edit instead of starting from a blank file.

use std::path::PathBuf;

use clap::Args as ClapArgs;
use niac_types::Error;

const STARTER: &str = include_str!("../../templates/office-switch.yaml");

#[derive(ClapArgs)]
pub struct Args {
    /// Where to write the starter config
    #[arg(default_value = "niac.yaml")]
    pub output: PathBuf,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    if args.output.exists() {
        return Err(Error::Conflict(format!("{} already exists", args.output.display())).into());
    }
    std::fs::write(&args.output, STARTER)?;
    println!("wrote starter config to {}", args.output.display());
    Ok(())
}
