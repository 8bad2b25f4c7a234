//! `niac`: the CLI front described in `spec.md` §6 — a thin collaborator
//! over the library crates, plus the `simulate`/`daemon` entry points that
//! actually run the engine.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "niac", version, about = "Network device simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation directly against a network interface until Ctrl-C
    Simulate(commands::simulate::Args),
    /// Parse and validate a config without running anything
    Validate(commands::validate::Args),
    /// Run the REST/WebSocket control plane
    Daemon(commands::daemon::Args),
    /// Work with built-in starter config templates
    Template(commands::template::Args),
    /// Export, diff, or merge config files
    Config(commands::config::Args),
    /// Write a starter config to get going quickly
    Init(commands::init::Args),
    /// Redact secrets from a config before sharing it
    Sanitize(commands::sanitize::Args),
    /// Summarize a walk file's contents
    AnalyzeWalk(commands::analyze::WalkArgs),
    /// Summarize a pcap file's contents
    AnalyzePcap(commands::analyze::PcapArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let code = err.downcast_ref::<niac_types::Error>().map(|e| e.exit_code()).unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

async fn dispatch(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Simulate(args) => commands::simulate::run(args).await,
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Daemon(args) => commands::daemon::run(args).await,
        Commands::Template(args) => commands::template::run(args),
        Commands::Config(args) => commands::config::run(args),
        Commands::Init(args) => commands::init::run(args),
        Commands::Sanitize(args) => commands::sanitize::run(args),
        Commands::AnalyzeWalk(args) => commands::analyze::run_walk(args),
        Commands::AnalyzePcap(args) => commands::analyze::run_pcap(args),
    }
}

/// Installs a plain stdout subscriber for subcommands that aren't the
/// daemon (which installs its own broadcast-backed one via
/// `niac_server::logging::init`).
pub(crate) fn init_basic_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
