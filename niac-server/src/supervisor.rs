//! The engine side of the control plane's message-passing boundary
//! (`spec.md` §9: "callback-heavy control plane becomes explicit message
//! passing"). [`EngineHandle`] is the cheap, cloneable front the HTTP
//! handlers hold; the task spawned by [`EngineHandle::spawn`] is the single
//! owner of the running `Simulation`, giving configuration mutation and
//! simulation start/stop single-writer semantics without a shared mutex in
//! the handler layer.
//!
//! `spec.md`'s open question on "multiple simultaneous simulations" is
//! resolved here: the supervisor holds exactly one slot, and `Start` fails
//! with `Conflict` while it's occupied.

use std::sync::Arc;

use niac_capture::{CaptureHandle, PnetCapture};
use niac_config::SimConfig;
use niac_engine::inject::ErrorKind;
use niac_engine::reconcile::ReconcilePlan;
use niac_engine::simulation::{Simulation, WalkFileLoader};
use niac_engine::stats::StatsSnapshot;
use niac_engine::topology::TopologySnapshot;
use niac_replay::PlaybackConfig;
use niac_store::Store;
use niac_types::{Device, Error, NeighborRecord, RunRecord};
use tokio::sync::{mpsc, oneshot};

/// Everything the REST layer needs to know about the active run, beyond
/// what's already in `StatsSnapshot`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub interface: Option<String>,
    pub config_name: Option<String>,
    pub device_count: usize,
}

enum Command {
    Start { interface: String, config: SimConfig, config_name: String, reply: oneshot::Sender<Result<(), Error>> },
    Stop { reply: oneshot::Sender<Result<(), Error>> },
    Status { reply: oneshot::Sender<StatusSnapshot> },
    Stats { reply: oneshot::Sender<Result<StatsSnapshot, Error>> },
    Devices { reply: oneshot::Sender<Result<Vec<Device>, Error>> },
    Neighbors { reply: oneshot::Sender<Result<Vec<NeighborRecord>, Error>> },
    Topology { reply: oneshot::Sender<Result<TopologySnapshot, Error>> },
    Reconcile { devices: Vec<Device>, reply: oneshot::Sender<Result<ReconcilePlan, Error>> },
    ReplayStart { playback: PlaybackConfig, reply: oneshot::Sender<Result<(), Error>> },
    ReplayStop { reply: oneshot::Sender<Result<(), Error>> },
    ReplayStatus { reply: oneshot::Sender<bool> },
    History { reply: oneshot::Sender<Vec<RunRecord>> },
    InjectSet { device: String, interface: String, kind: ErrorKind, rate_percent: u8, reply: oneshot::Sender<Result<(), Error>> },
    InjectClear { device: String, interface: String, kind: ErrorKind, reply: oneshot::Sender<Result<(), Error>> },
}

/// One running simulation plus the bookkeeping the supervisor needs that
/// isn't already tracked inside `Simulation` itself.
struct Active {
    sim: Arc<Simulation>,
    interface: String,
    config_name: String,
}

/// A cheap, `Clone`-able front onto the supervisor task. Every call sends
/// one command and awaits its one reply; the supervisor itself never
/// blocks on I/O longer than the single engine operation it's performing,
/// so handlers can call it freely from any number of concurrent requests.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
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

fn open_capture(interface: &str) -> Result<Box<dyn CaptureHandle>, Error> {
    if !niac_capture::interface_exists(interface) {
        return Err(Error::InterfaceUnavailable(interface.to_string()));
    }
    Ok(Box::new(PnetCapture::open(interface, None)?))
}

impl EngineHandle {
    /// Spawns the supervisor task and returns the handle used to talk to
    /// it. `store` is shared with whatever started the daemon so run
    /// records end up in the same database regardless of how a
    /// simulation was started (CLI or control plane).
    pub fn spawn(store: Arc<Store>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(64);
        tokio::spawn(async move {
            let mut active: Option<Active> = None;
            while let Some(cmd) = rx.recv().await {
                handle_command(cmd, &mut active, &store).await;
            }
        });
        EngineHandle { tx }
    }

    pub async fn start(&self, interface: String, config: SimConfig, config_name: String) -> Result<(), Error> {
        self.request(|reply| Command::Start { interface, config, config_name, reply }).await
    }

    pub async fn stop(&self) -> Result<(), Error> {
        self.request(|reply| Command::Stop { reply }).await
    }

    pub async fn status(&self) -> StatusSnapshot {
        self.request_infallible(|reply| Command::Status { reply }).await
    }

    pub async fn stats(&self) -> Result<StatsSnapshot, Error> {
        self.request(|reply| Command::Stats { reply }).await
    }

    pub async fn devices(&self) -> Result<Vec<Device>, Error> {
        self.request(|reply| Command::Devices { reply }).await
    }

    pub async fn neighbors(&self) -> Result<Vec<NeighborRecord>, Error> {
        self.request(|reply| Command::Neighbors { reply }).await
    }

    pub async fn topology(&self) -> Result<TopologySnapshot, Error> {
        self.request(|reply| Command::Topology { reply }).await
    }

    pub async fn reconcile(&self, devices: Vec<Device>) -> Result<ReconcilePlan, Error> {
        self.request(|reply| Command::Reconcile { devices, reply }).await
    }

    pub async fn replay_start(&self, playback: PlaybackConfig) -> Result<(), Error> {
        self.request(|reply| Command::ReplayStart { playback, reply }).await
    }

    pub async fn replay_stop(&self) -> Result<(), Error> {
        self.request(|reply| Command::ReplayStop { reply }).await
    }

    pub async fn replay_status(&self) -> bool {
        self.request_infallible(|reply| Command::ReplayStatus { reply }).await
    }

    pub async fn history(&self) -> Vec<RunRecord> {
        self.request_infallible(|reply| Command::History { reply }).await
    }

    pub async fn inject_set(&self, device: String, interface: String, kind: ErrorKind, rate_percent: u8) -> Result<(), Error> {
        self.request(|reply| Command::InjectSet { device, interface, kind, rate_percent, reply }).await
    }

    pub async fn inject_clear(&self, device: String, interface: String, kind: ErrorKind) -> Result<(), Error> {
        self.request(|reply| Command::InjectClear { device, interface, kind, reply }).await
    }

    async fn request<T: Send + 'static>(&self, build: impl FnOnce(oneshot::Sender<Result<T, Error>>) -> Command) -> Result<T, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).await.map_err(|_| Error::Internal("supervisor task unavailable".into()))?;
        rx.await.map_err(|_| Error::Internal("supervisor task dropped the reply".into()))?
    }

    async fn request_infallible<T: Send + Default + 'static>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> T {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(build(reply)).await.is_err() {
            return T::default();
        }
        rx.await.unwrap_or_default()
    }
}

async fn handle_command(cmd: Command, active: &mut Option<Active>, store: &Arc<Store>) {
    match cmd {
        Command::Start { interface, config, config_name, reply } => {
            let result = start_simulation(active, &interface, &config, &config_name, store.clone());
            let _ = reply.send(result);
        }
        Command::Stop { reply } => {
            let result = match active.take() {
                Some(a) => {
                    a.sim.stop().await;
                    Ok(())
                }
                None => Err(Error::NotFound("no simulation is running".into())),
            };
            let _ = reply.send(result);
        }
        Command::Status { reply } => {
            let snapshot = match active {
                Some(a) => StatusSnapshot {
                    running: true,
                    interface: Some(a.interface.clone()),
                    config_name: Some(a.config_name.clone()),
                    device_count: a.sim.index.snapshot().len(),
                },
                None => StatusSnapshot::default(),
            };
            let _ = reply.send(snapshot);
        }
        Command::Stats { reply } => {
            let result = require_active(active).map(|a| a.sim.stats_snapshot());
            let _ = reply.send(result);
        }
        Command::Devices { reply } => {
            let result = require_active(active).map(|a| a.sim.index.snapshot().devices().iter().map(|d| (**d).clone()).collect());
            let _ = reply.send(result);
        }
        Command::Neighbors { reply } => {
            let result = require_active(active).map(|a| a.sim.neighbors.snapshot());
            let _ = reply.send(result);
        }
        Command::Topology { reply } => {
            let result = require_active(active).map(|a| a.sim.topology_snapshot());
            let _ = reply.send(result);
        }
        Command::Reconcile { devices, reply } => {
            let result = require_active(active).and_then(|a| a.sim.reconcile(devices));
            let _ = reply.send(result);
        }
        Command::ReplayStart { playback, reply } => {
            let result = match require_active(active) {
                Ok(a) => a.sim.start_replay(playback).await,
                Err(e) => Err(e),
            };
            let _ = reply.send(result);
        }
        Command::ReplayStop { reply } => {
            let result = require_active(active).map(|a| a.sim.stop_replay());
            let _ = reply.send(result);
        }
        Command::ReplayStatus { reply } => {
            let running = active.as_ref().map(|a| a.sim.replay.is_active()).unwrap_or(false);
            let _ = reply.send(running);
        }
        Command::History { reply } => {
            let _ = reply.send(store.list_runs());
        }
        Command::InjectSet { device, interface, kind, rate_percent, reply } => {
            let result = require_active(active).map(|a| a.sim.injection.set_rate(&device, &interface, kind, rate_percent));
            let _ = reply.send(result);
        }
        Command::InjectClear { device, interface, kind, reply } => {
            let result = require_active(active).map(|a| a.sim.injection.clear(&device, &interface, kind));
            let _ = reply.send(result);
        }
    }
}

fn require_active(active: &Option<Active>) -> Result<&Active, Error> {
    active.as_ref().ok_or_else(|| Error::NotFound("no simulation is running".into()))
}

fn start_simulation(active: &mut Option<Active>, interface: &str, config: &SimConfig, config_name: &str, store: Arc<Store>) -> Result<(), Error> {
    if active.is_some() {
        return Err(Error::Conflict("a simulation is already running; stop it first".into()));
    }
    let capture = open_capture(interface)?;
    let run_id = format!("run-{}", rand::random::<u32>());
    let sim = Simulation::build(run_id, config, interface.to_string(), config_name.to_string(), capture, store, walk_file_loader())?;
    sim.start();
    *active = Some(Active { sim, interface: interface.to_string(), config_name: config_name.to_string() });
    Ok(())
}
