//! Tracing setup for the daemon: the usual stdout formatter plus a second
//! writer that fans every formatted line out over a broadcast channel, so
//! `WS /api/v1/events` can stream live log lines alongside stats
//! (`spec.md` §6: "streaming stats and log lines").

use std::io;

use tokio::sync::broadcast;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct LogBroadcaster {
    tx: broadcast::Sender<String>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(256);
        LogBroadcaster { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

struct BroadcastWriter(broadcast::Sender<String>);

impl io::Write for BroadcastWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(line) = std::str::from_utf8(buf) {
            // No receivers is the common case between WS connections; the
            // send failing there is expected, not an error.
            let _ = self.0.send(line.trim_end().to_string());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBroadcaster {
    type Writer = BroadcastWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BroadcastWriter(self.tx.clone())
    }
}

/// Installs the env-filtered stdout subscriber plus the broadcast fan-out.
/// Honors `NO_COLOR` per `spec.md` §6.
pub fn init(broadcaster: LogBroadcaster) {
    let ansi = std::env::var_os("NO_COLOR").is_none();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = tracing_subscriber::fmt::layer().with_ansi(ansi);
    let broadcast_layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(broadcaster);

    let _ = tracing_subscriber::registry().with(filter).with(stdout_layer).with(broadcast_layer).try_init();
}
