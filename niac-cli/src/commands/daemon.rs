//! `niac daemon`: boots the REST/WebSocket control plane (`spec.md` §6,
//! C15) with a shared run-history store and the live-reloading log
//! broadcaster.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Args as ClapArgs;
use niac_server::{AppState, EngineHandle, LogBroadcaster};

#[derive(ClapArgs)]
pub struct Args {
    /// Address to bind the control plane to
    #[arg(long, default_value = "127.0.0.1:8787")]
    pub listen: SocketAddr,
    /// Bearer token required on every request; unset disables auth
    #[arg(long, env = "NIAC_TOKEN")]
    pub token: Option<String>,
    /// Run-history storage path, or "disabled" to skip persistence
    #[arg(long)]
    pub storage: Option<String>,
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let broadcaster = LogBroadcaster::new();
    niac_server::logging::init(broadcaster.clone());

    let storage = args.storage.unwrap_or_else(|| niac_store::default_storage_path().to_string_lossy().into_owned());
    let store = Arc::new(if storage == "disabled" {
        niac_store::Store::disabled()
    } else {
        niac_store::Store::open(Path::new(&storage))
    });
    let supervisor = EngineHandle::spawn(store.clone());
    let state = AppState::new(supervisor, store, args.token, broadcaster);

    niac_server::serve(args.listen, state).await?;
    Ok(())
}
