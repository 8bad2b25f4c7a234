//! The simulation engine: capture, device index, packet bus, protocol
//! responders and transmitters, error injection, statistics, and the live
//! reconciler, wired together by [`simulation::Simulation`].

pub mod arp;
pub mod bus;
pub mod discovery;
pub mod icmp;
pub mod index;
pub mod inject;
pub mod reconcile;
pub mod simulation;
pub mod stats;
pub mod topology;
pub mod wire;

pub use index::{DeviceIndex, DeviceIndexSnapshot};
pub use simulation::{Simulation, WalkFileLoader};
