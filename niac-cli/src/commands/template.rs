//! `niac template`: the built-in starter configs a new user reaches for
//! before hand-rolling a device list.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Subcommand};
use niac_types::Error;

#[derive(ClapArgs)]
pub struct Args {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand)]
pub enum Action {
    /// List the built-in template names
    List,
    /// Print a template's YAML to stdout
    Show { name: String },
    /// Write a template to a file
    Use { name: String, output: PathBuf },
}

const TEMPLATES: &[(&str, &str)] = &[
    ("office-switch", include_str!("../../templates/office-switch.yaml")),
    ("edge-router", include_str!("../../templates/edge-router.yaml")),
    ("access-point", include_str!("../../templates/access-point.yaml")),
];

fn lookup(name: &str) -> Result<&'static str, Error> {
    TEMPLATES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, yaml)| *yaml)
        .ok_or_else(|| Error::NotFound(format!("no template named {name:?}; run `niac template list`")))
}

pub fn run(args: Args) -> anyhow::Result<()> {
    match args.action {
        Action::List => {
            for (name, _) in TEMPLATES {
                println!("{name}");
            }
        }
        Action::Show { name } => print!("{}", lookup(&name)?),
        Action::Use { name, output } => {
            std::fs::write(&output, lookup(&name)?)?;
            println!("wrote {}", output.display());
        }
    }
    Ok(())
}
