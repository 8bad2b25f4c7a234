//! Configuration loading, validation, and the legacy `.cfg` format.

mod legacy;
mod model;
mod validate;

pub use legacy::parse as parse_legacy_cfg;
pub use model::{CapturePlaybackEntry, DiscoveryProtocolsConfig, SimConfig};
pub use validate::validate;
