//! PCAP playback component (C11): load a capture, re-emit it at its
//! original (optionally scaled) pacing, loop on request, and support
//! cancellation — refusing to start a second playback while one runs.

mod pcap;
mod player;

pub use pcap::{load as load_pcap, PcapFrame};
pub use player::{PlaybackConfig, ReplayController};
