//! PCAP file loading: reads every record into memory up front with
//! timestamps normalized to an offset from the first frame.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use niac_types::Error;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{create_reader, PcapBlockOwned, PcapError};

/// One captured frame: the link-layer bytes plus its offset from the start
/// of the capture.
#[derive(Debug, Clone)]
pub struct PcapFrame {
    pub offset: Duration,
    pub bytes: Vec<u8>,
}

/// Reads an entire `.pcap` file (classic format) into memory, in capture
/// order, with timestamps rebased to the first packet.
pub fn load(path: &Path) -> Result<Vec<PcapFrame>, Error> {
    let file = File::open(path)
        .map_err(|e| Error::ConfigInvalid { field: "capture_playback.path".into(), expected: "readable pcap file".into(), got: path.display().to_string(), suggestion: e.to_string() })?;
    let mut reader = create_reader(65536, file)
        .map_err(|e| Error::FrameMalformed(format!("pcap header: {e}")))?;

    let mut frames = Vec::new();
    let mut first_ts: Option<Duration> = None;

    loop {
        match reader.next() {
            Ok((consumed, block)) => {
                if let PcapBlockOwned::Legacy(pkt) = block {
                    let ts = Duration::new(pkt.ts_sec as u64, pkt.ts_usec.saturating_mul(1000));
                    let base = *first_ts.get_or_insert(ts);
                    frames.push(PcapFrame {
                        offset: ts.saturating_sub(base),
                        bytes: pkt.data.to_vec(),
                    });
                }
                reader.consume(consumed);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| Error::FrameMalformed(format!("pcap refill: {e}")))?;
            }
            Err(e) => return Err(Error::FrameMalformed(format!("pcap parse error: {e}"))),
        }
    }

    if frames.is_empty() {
        return Err(Error::ConfigInvalid {
            field: "capture_playback.path".into(),
            expected: "at least one packet".into(),
            got: path.display().to_string(),
            suggestion: "file contains no Legacy pcap records".into(),
        });
    }

    Ok(frames)
}
