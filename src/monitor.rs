//! Single-producer front end combining packet framing, table decoding and integrity tracking.
//!
//! ```
//! use mpeg2ts_monitor::monitor::{MonitorConfig, StreamMonitor};
//!
//! let config: MonitorConfig =
//!     serde_json::from_str(r#"{ "tracker": { "pcr_jump_threshold": 900000 } }"#).unwrap();
//! let mut monitor = StreamMonitor::new(config);
//! let cancel = monitor.cancel_flag();
//! cancel.cancel();
//! let report = monitor.push(&[0x47; 188]).unwrap();
//! assert!(report.cancelled);
//! ```

use crate::decoder::{DecoderConfig, StreamDecoder, TableView};
use crate::error::ConfigurationError;
use crate::integrity::{IntegrityEvent, IntegrityView, PidIntegrityTracker, TrackerConfig};
use crate::psi::TableChange;
use crate::unpacketise::PacketReader;
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Settings for every stage of a `StreamMonitor`.  Missing fields take their default values
/// when deserialising.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub decoder: DecoderConfig,
    pub tracker: TrackerConfig,
}

/// Shared flag asking a `StreamMonitor` to stop processing.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What a single call to [`StreamMonitor::push()`](struct.StreamMonitor.html#method.push)
/// did.
#[derive(Debug, Default)]
pub struct MonitorReport {
    /// packets processed
    pub packets: usize,
    pub table_changes: Vec<TableChange>,
    pub integrity_events: Vec<IntegrityEvent>,
    /// `1` when the buffer held a malformed packet and was skipped from that point
    pub malformed_batches: usize,
    /// processing stopped because the `CancelFlag` was set
    pub cancelled: bool,
}

pub struct StreamMonitor {
    reader: PacketReader,
    decoder: StreamDecoder,
    tracker: PidIntegrityTracker,
    cancel: CancelFlag,
    malformed_batches: u64,
}

impl StreamMonitor {
    pub fn new(config: MonitorConfig) -> StreamMonitor {
        StreamMonitor {
            reader: PacketReader::new(),
            decoder: StreamDecoder::new(config.decoder),
            tracker: PidIntegrityTracker::new(config.tracker),
            cancel: CancelFlag::default(),
            malformed_batches: 0,
        }
    }

    /// Read handle on the published tables.
    pub fn tables(&self) -> TableView {
        self.decoder.view()
    }

    /// Read handle on the per-PID integrity counters.
    pub fn integrity(&self) -> IntegrityView {
        self.tracker.view()
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Number of buffers that have been abandoned because of a malformed packet.
    pub fn malformed_batches(&self) -> u64 {
        self.malformed_batches
    }

    /// Bytes discarded while searching for packet sync.
    pub fn skipped_bytes(&self) -> u64 {
        self.reader.skipped_bytes()
    }

    /// Processes the packets in `buf`, together with any partial packet left over from the
    /// previous call.
    ///
    /// A malformed packet ends processing of the buffer.  It is reported in
    /// `MonitorReport::malformed_batches` rather than as an error, and the next call carries
    /// on by resynchronising.
    pub fn push(&mut self, buf: &[u8]) -> Result<MonitorReport, ConfigurationError> {
        let mut report = MonitorReport::default();
        if self.cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }
        let packets = match self.reader.push(buf) {
            Ok(packets) => packets,
            Err(e) => {
                warn!("skipping malformed batch of {} bytes: {}", buf.len(), e);
                self.malformed_batches += 1;
                report.malformed_batches = 1;
                return Ok(report);
            }
        };
        for pk in &packets {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            report.integrity_events.extend(self.tracker.observe(pk));
            report.table_changes.extend(self.decoder.add_packet(pk)?);
            report.packets += 1;
        }
        Ok(report)
    }
}

impl Default for StreamMonitor {
    fn default() -> Self {
        StreamMonitor::new(MonitorConfig::default())
    }
}
