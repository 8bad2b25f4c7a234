//! `niac simulate`: run a simulation directly against a real interface
//! without the control plane, for one-off or scripted use.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args as ClapArgs;
use niac_capture::{interface_exists, PnetCapture};
use niac_config::SimConfig;
use niac_engine::simulation::{Simulation, WalkFileLoader};
use niac_store::Store;
use niac_types::Error;

#[derive(ClapArgs)]
pub struct Args {
    /// Network interface to bind, e.g. eth0
    pub interface: String,
    /// Path to the YAML simulation config
    pub config: PathBuf,
    /// Name recorded in run history (defaults to the config file's stem)
    #[arg(long)]
    pub name: Option<String>,
    /// Run-history storage path, or "disabled" to skip persistence
    #[arg(long)]
    pub storage: Option<String>,
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    crate::init_basic_logging();

    let contents = std::fs::read_to_string(&args.config).map_err(|e| Error::ConfigInvalid {
        field: "config".into(),
        expected: "a readable YAML file".into(),
        got: args.config.display().to_string(),
        suggestion: e.to_string(),
    })?;
    let base_dir = args.config.parent().unwrap_or_else(|| std::path::Path::new("."));
    let config = SimConfig::load_yaml(&contents, base_dir)?;
    niac_config::validate(&config)?;

    if !interface_exists(&args.interface) {
        return Err(Error::InterfaceUnavailable(args.interface.clone()).into());
    }
    let capture: Box<dyn niac_capture::CaptureHandle> = Box::new(PnetCapture::open(&args.interface, None)?);

    let storage = args.storage.clone().unwrap_or_else(|| niac_store::default_storage_path().to_string_lossy().into_owned());
    let store = Arc::new(open_store(&storage));
    let config_name = args
        .name
        .clone()
        .or_else(|| args.config.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "config".to_string());
    let run_id = format!("run-{}", rand::random::<u32>());

    let sim = Simulation::build(run_id, &config, args.interface.clone(), config_name, capture, store, walk_file_loader())?;
    sim.start();

    tracing::info!(interface = %args.interface, devices = config.devices.len(), "simulation running, press Ctrl-C to stop");
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("stopping simulation");
    sim.stop().await;
    Ok(())
}

fn walk_file_loader() -> WalkFileLoader {
    Arc::new(|path: &str| {
        std::fs::read_to_string(path).map_err(|e| Error::ConfigInvalid {
            field: "snmp_agent.walk_file".into(),
            expected: "a readable walk file".into(),
            got: path.to_string(),
            suggestion: e.to_string(),
        })
    })
}

fn open_store(storage: &std::ffi::OsStr) -> Store {
    if storage == "disabled" {
        Store::disabled()
    } else {
        Store::open(std::path::Path::new(storage))
    }
}
