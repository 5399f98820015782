//! Monitoring core for MPEG2 Transport Streams, per _ISO/IEC 13818-1_ and the DVB _EN 300 468_
//! service information tables.
//!
//! The crate turns framed byte buffers into a continuously updated picture of a stream:
//!
//!  * [`unpacketise::PacketReader`] finds packet boundaries (resynchronising after garbage) and
//!    [`packet::TsPacket::parse()`] decodes each 188-byte packet, including its adaptation field
//!    and any PES header
//!  * [`decoder::StreamDecoder`] routes packets to [`psi::TableAssembler`] instances which
//!    rebuild the PAT, PMTs and SDT, publishing each new table version to a shared
//!    [`decoder::TableView`]
//!  * [`integrity::PidIntegrityTracker`] keeps per-PID continuity counter, transport error and
//!    PCR statistics
//!  * [`monitor::StreamMonitor`] ties these together for a single producer thread
//!
//! # Design principals
//!
//!  * *Push based*.  Callers hand over `&[u8]` buffers from wherever they come from (a file, a
//!    UDP socket, an SRT receiver) and get back the table changes and integrity events those
//!    bytes caused.  Nothing here performs I/O or blocks.
//!  * *Tolerant of damage*.  Corruption is normal on live feeds.  Damaged sections are logged
//!    and dropped, and damaged packet batches are reported so the caller can skip them.
//!  * *Shared read access*.  Published tables and integrity counters sit behind a mutex that the
//!    decode path takes only to publish, so a reporting thread can take snapshots at any time.
//!
//! ```
//! use mpeg2ts_monitor::monitor::{MonitorConfig, StreamMonitor};
//!
//! let mut monitor = StreamMonitor::new(MonitorConfig::default());
//! let view = monitor.tables();
//! let report = monitor.push(&[0u8; 7]).unwrap();
//! assert_eq!(report.packets, 0);
//! assert!(view.program_map_tables().is_empty());
//! ```

pub mod decoder;
pub mod descriptor;
pub mod error;
pub mod integrity;
pub mod monitor;
pub mod packet;
pub mod pes;
pub mod psi;
pub mod unpacketise;

/// The kind of content carried by an elementary stream, as given in the PMT's `stream_type`
/// field.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum StreamType {
    // 0x00 reserved
    Iso11172Video,
    H262,
    Iso11172Audio,
    Iso138183Audio,
    H2220PrivateSections,
    /// PES packets containing private data, used by DVB for Teletext, subtitles and AC-3
    H2220PesPrivateData,
    Mheg,
    H2220DsmCc,
    DsmccSections,
    Adts,
    Iso144962Visual,
    Latm,
    MetadataInPes,
    H264,
    H265,
    /// `0x81`, AC-3 audio in ATSC systems
    AtscDolbyDigitalAudio,
    /// `0x86`, SCTE-35 splice information
    Scte35SpliceInfo,
    /// `0x87`, Enhanced AC-3 audio in ATSC systems
    AtscEnhancedDolbyDigitalAudio,
    /// `0x80` - `0xff`, other than the values above
    Private(u8),
    /// other values below `0x80`
    Reserved(u8),
}

impl StreamType {
    /// Is this one of the video coding formats known to this crate?
    pub fn is_video(self) -> bool {
        matches!(
            self,
            StreamType::Iso11172Video
                | StreamType::H262
                | StreamType::Iso144962Visual
                | StreamType::H264
                | StreamType::H265
        )
    }

    /// Is this one of the audio coding formats known to this crate?  Note that DVB carries
    /// AC-3 as `H2220PesPrivateData`, so such streams are not reported here.
    pub fn is_audio(self) -> bool {
        matches!(
            self,
            StreamType::Iso11172Audio
                | StreamType::Iso138183Audio
                | StreamType::Adts
                | StreamType::Latm
                | StreamType::AtscDolbyDigitalAudio
                | StreamType::AtscEnhancedDolbyDigitalAudio
        )
    }
}

impl From<u8> for StreamType {
    fn from(val: u8) -> Self {
        match val {
            0x01 => StreamType::Iso11172Video,
            0x02 => StreamType::H262,
            0x03 => StreamType::Iso11172Audio,
            0x04 => StreamType::Iso138183Audio,
            0x05 => StreamType::H2220PrivateSections,
            0x06 => StreamType::H2220PesPrivateData,
            0x07 => StreamType::Mheg,
            0x08 => StreamType::H2220DsmCc,
            0x0D => StreamType::DsmccSections,
            0x0F => StreamType::Adts,
            0x10 => StreamType::Iso144962Visual,
            0x11 => StreamType::Latm,
            0x15 => StreamType::MetadataInPes,
            0x1b => StreamType::H264,
            0x24 => StreamType::H265,
            0x81 => StreamType::AtscDolbyDigitalAudio,
            0x86 => StreamType::Scte35SpliceInfo,
            0x87 => StreamType::AtscEnhancedDolbyDigitalAudio,
            _ if val >= 0x80 => StreamType::Private(val),
            _ => StreamType::Reserved(val),
        }
    }
}

impl From<StreamType> for u8 {
    fn from(val: StreamType) -> Self {
        match val {
            StreamType::Iso11172Video => 0x01,
            StreamType::H262 => 0x02,
            StreamType::Iso11172Audio => 0x03,
            StreamType::Iso138183Audio => 0x04,
            StreamType::H2220PrivateSections => 0x05,
            StreamType::H2220PesPrivateData => 0x06,
            StreamType::Mheg => 0x07,
            StreamType::H2220DsmCc => 0x08,
            StreamType::DsmccSections => 0x0D,
            StreamType::Adts => 0x0F,
            StreamType::Iso144962Visual => 0x10,
            StreamType::Latm => 0x11,
            StreamType::MetadataInPes => 0x15,
            StreamType::H264 => 0x1b,
            StreamType::H265 => 0x24,
            StreamType::AtscDolbyDigitalAudio => 0x81,
            StreamType::Scte35SpliceInfo => 0x86,
            StreamType::AtscEnhancedDolbyDigitalAudio => 0x87,
            StreamType::Reserved(val) => val,
            StreamType::Private(val) => val,
        }
    }
}
