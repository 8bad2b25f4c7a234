//! The Capture Engine (C1): owns the OS network interface handle, reads
//! frames off the wire, and transmits synthesized replies.
//!
//! Real capture is backed by `pnet::datalink`, the same crate the pack's
//! `passcod-noodle`/`faern-librips` reference implementations use for
//! promiscuous-mode Layer-2 I/O. A [`FakeCapture`] backs unit and
//! integration tests that don't have a real interface to bind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use niac_types::{Error, Frame, SerialSource};
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};

/// What [`CaptureHandle::recv`] returns for one poll cycle.
pub enum RecvOutcome {
    Frame(Frame),
    /// No frame arrived before the internal poll timeout; the caller
    /// should check for shutdown and retry.
    Idle,
    /// The handle was closed; no further frames will arrive.
    Eof,
}

/// An optional post-capture filter, standing in for a BPF program: `pnet`
/// doesn't expose raw BPF installation on all platforms uniformly, so
/// filtering is applied in user space after each read instead.
pub type FrameFilter = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// The three operations `spec.md` §4.1 requires of the capture engine.
pub trait CaptureHandle: Send {
    fn recv(&mut self) -> Result<RecvOutcome, Error>;
    fn send(&mut self, bytes: &[u8]) -> Result<(), Error>;
    fn close(&mut self);
}

/// Probe that a named interface exists before attempting to open it, so
/// callers can fail fast with `InterfaceUnavailable` (exit code 2) rather
/// than waiting on an OS-level open error.
pub fn interface_exists(name: &str) -> bool {
    datalink::interfaces().iter().any(|i| i.name == name)
}

fn find_interface(name: &str) -> Result<NetworkInterface, Error> {
    datalink::interfaces()
        .into_iter()
        .find(|i| i.name == name)
        .ok_or_else(|| Error::InterfaceUnavailable(name.to_string()))
}

/// Live capture handle bound to a real interface.
pub struct PnetCapture {
    tx: Box<dyn DataLinkSender>,
    rx: Box<dyn DataLinkReceiver>,
    closed: Arc<AtomicBool>,
    ingest_serials: SerialSource,
    filter: Option<FrameFilter>,
}

impl PnetCapture {
    /// Opens a live, promiscuous capture on `interface_name`. Fails with
    /// `InterfaceUnavailable` if the interface doesn't exist.
    pub fn open(interface_name: &str, filter: Option<FrameFilter>) -> Result<Self, Error> {
        let interface = find_interface(interface_name)?;

        let channel = datalink::channel(
            &interface,
            Config {
                promiscuous: true,
                // Bound the blocking read so `close()` (via the shared
                // flag) is observed promptly instead of hanging forever.
                read_timeout: Some(Duration::from_millis(200)),
                ..Config::default()
            },
        )
        .map_err(|e| Error::CaptureFailed(format!("{interface_name}: {e}")))?;

        let (tx, rx) = match channel {
            Channel::Ethernet(tx, rx) => (tx, rx),
            _ => return Err(Error::CaptureFailed("unsupported channel type".into())),
        };

        Ok(PnetCapture {
            tx,
            rx,
            closed: Arc::new(AtomicBool::new(false)),
            ingest_serials: SerialSource::new(),
            filter,
        })
    }
}

impl CaptureHandle for PnetCapture {
    fn recv(&mut self) -> Result<RecvOutcome, Error> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(RecvOutcome::Eof);
        }
        match self.rx.next() {
            Ok(bytes) => {
                if let Some(filter) = &self.filter {
                    if !filter(bytes) {
                        return Ok(RecvOutcome::Idle);
                    }
                }
                Ok(RecvOutcome::Frame(Frame {
                    timestamp: std::time::SystemTime::now(),
                    bytes: bytes.to_vec(),
                    serial: self.ingest_serials.next(),
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut
                || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                Ok(RecvOutcome::Idle)
            }
            Err(e) => {
                tracing::warn!(error = %e, "capture read error, resuming");
                Ok(RecvOutcome::Idle)
            }
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::InterfaceUnavailable("handle closed".into()));
        }
        match self.tx.send_to(bytes, None) {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(Error::CaptureFailed(e.to_string())),
            None => Err(Error::CaptureFailed("send_to produced no result".into())),
        }
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// In-memory capture handle for tests: frames injected via [`FakeCapture::inject`]
/// are returned from `recv`; frames sent via `send` are captured for assertions.
#[derive(Default)]
pub struct FakeCapture {
    inbound: std::collections::VecDeque<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
    closed: bool,
    serials: SerialSource,
}

impl FakeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&mut self, bytes: Vec<u8>) {
        self.inbound.push_back(bytes);
    }
}

impl CaptureHandle for FakeCapture {
    fn recv(&mut self) -> Result<RecvOutcome, Error> {
        if self.closed {
            return Ok(RecvOutcome::Eof);
        }
        match self.inbound.pop_front() {
            Some(bytes) => Ok(RecvOutcome::Frame(Frame {
                timestamp: std::time::SystemTime::now(),
                bytes,
                serial: self.serials.next(),
            })),
            None => Ok(RecvOutcome::Idle),
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.closed {
            return Err(Error::InterfaceUnavailable("handle closed".into()));
        }
        self.sent.push(bytes.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_capture_replays_injected_frames_in_order() {
        let mut cap = FakeCapture::new();
        cap.inject(vec![1, 2, 3]);
        cap.inject(vec![4, 5, 6]);

        match cap.recv().unwrap() {
            RecvOutcome::Frame(f) => assert_eq!(f.bytes, vec![1, 2, 3]),
            _ => panic!("expected frame"),
        }
        match cap.recv().unwrap() {
            RecvOutcome::Frame(f) => assert_eq!(f.bytes, vec![4, 5, 6]),
            _ => panic!("expected frame"),
        }
        assert!(matches!(cap.recv().unwrap(), RecvOutcome::Idle));
    }

    #[test]
    fn close_is_idempotent_and_unblocks_recv_with_eof() {
        let mut cap = FakeCapture::new();
        cap.close();
        cap.close();
        assert!(matches!(cap.recv().unwrap(), RecvOutcome::Eof));
        assert!(cap.send(&[1]).is_err());
    }
}
