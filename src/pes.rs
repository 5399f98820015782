//! Support for the header of _Packetised Elementary Stream_ packets found at the start of a
//! transport stream packet payload.
//!
//! Only the header is decoded here; elementary stream payload is handed on untouched (for
//! example to an external Teletext decoder, which needs `header_data` as well).

use crate::error::PacketError;
use crate::packet::Pid;
use log::trace;
use std::fmt;
use thiserror::Error;

/// Values which may appear in the `stream_id` field of a PES header, identifying the kind of
/// content within the Packetized Elementary Stream.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StreamId {
    /// `program_stream_map`
    ProgramStreamMap,
    /// `private_stream_1`
    PrivateStream1,
    /// `padding_stream`
    PaddingStream,
    /// `private_stream_2`
    PrivateStream2,
    /// ISO/IEC 13818-3 or ISO/IEC 11172-3 or ISO/IEC 13818-7 or ISO/IEC 14496-3 audio stream
    Audio(u8),
    /// Rec. ITU-T H.262 | ISO/IEC 13818-2, ISO/IEC 11172-2, ISO/IEC 14496-2, Rec. ITU-T H.264 |
    /// ISO/IEC 14496-10 or Rec. ITU-T H.265 | ISO/IEC 23008-2 video stream
    Video(u8),
    /// `ECM_stream`
    EcmStream,
    /// `EMM_stream`
    EmmStream,
    /// Rec. ITU-T H.222.0 | ISO/IEC 13818-1 Annex B or ISO/IEC 13818-6_DSMCC_stream
    DsmCc,
    /// ISO/IEC_13522_stream
    Iso13522Stream,
    /// Rec. ITU-T H.222.1 type A to E
    H2221(u8),
    /// `ancillary_stream`
    AncillaryStream,
    /// ISO/IEC 14496-1_SL-packetized_stream
    SlPacketizedStream,
    /// ISO/IEC 14496-1_FlexMux_stream
    FlexMuxStream,
    /// metadata stream
    MetadataStream,
    /// `extended_stream_id`
    ExtendedStreamId,
    /// reserved data stream
    ReservedDataStream,
    /// `program_stream_directory`
    ProgramStreamDirectory,
    /// Encapsulates a stream_id value not specified in _ISO/IEC 13818-1_
    Unknown(u8),
}
impl StreamId {
    /// Streams of these kinds have no optional PES header (and so no PTS/DTS).
    fn has_optional_header(self) -> bool {
        !matches!(
            self,
            StreamId::ProgramStreamMap
                | StreamId::PaddingStream
                | StreamId::PrivateStream2
                | StreamId::EcmStream
                | StreamId::EmmStream
                | StreamId::ProgramStreamDirectory
                | StreamId::DsmCc
                | StreamId::H2221(b'E')
        )
    }
}
impl From<u8> for StreamId {
    fn from(v: u8) -> Self {
        match v {
            0b1011_1100 => StreamId::ProgramStreamMap,
            0b1011_1101 => StreamId::PrivateStream1,
            0b1011_1110 => StreamId::PaddingStream,
            0b1011_1111 => StreamId::PrivateStream2,
            0b1100_0000..=0b1101_1111 => StreamId::Audio(v & 0b0001_1111),
            0b1110_0000..=0b1110_1111 => StreamId::Video(v & 0b0000_1111),
            0b1111_0000 => StreamId::EcmStream,
            0b1111_0001 => StreamId::EmmStream,
            0b1111_0010 => StreamId::DsmCc,
            0b1111_0011 => StreamId::Iso13522Stream,
            0b1111_0100..=0b1111_1000 => StreamId::H2221(b'A' + (v - 0b1111_0100)),
            0b1111_1001 => StreamId::AncillaryStream,
            0b1111_1010 => StreamId::SlPacketizedStream,
            0b1111_1011 => StreamId::FlexMuxStream,
            0b1111_1100 => StreamId::MetadataStream,
            0b1111_1101 => StreamId::ExtendedStreamId,
            0b1111_1110 => StreamId::ReservedDataStream,
            0b1111_1111 => StreamId::ProgramStreamDirectory,
            _ => StreamId::Unknown(v),
        }
    }
}

/// Header at the start of a PES packet.
///
/// The PES packet as a whole is likely to be split across many transport stream packets; only
/// the packet holding the header (the one with `payload_unit_start_indicator` set) carries one
/// of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PesHeader {
    /// Kind of content in the stream
    pub stream_id: StreamId,
    /// `PES_packet_length`; zero means unbounded (continues until the next payload unit start)
    pub packet_length: u16,
    /// Presentation Time Stamp, if present
    pub pts: Option<Timestamp>,
    /// Decode Time Stamp, if present
    pub dts: Option<Timestamp>,
    /// The optional header bytes following `PES_packet_length` (flags,
    /// `PES_header_data_length` and the header data itself); empty for stream ids without an
    /// optional header
    pub header_data: Vec<u8>,
}

impl PesHeader {
    const START_CODE_SIZE: usize = 3;
    const FIXED_HEADER_SIZE: usize = 6;
    const OPTIONAL_HEADER_SIZE: usize = 3;
    const TIMESTAMP_SIZE: usize = 5;

    /// Decodes a PES header from the start of `buf` (a packet payload).
    ///
    /// Returns `Ok(None)` when `buf` does not start with the `0x000001` start code.  A header
    /// that starts correctly but then violates the syntax, including timestamps with bad
    /// prefix or marker bits, is an error.
    pub fn parse(pid: Pid, buf: &[u8]) -> Result<Option<PesHeader>, PacketError> {
        if buf.len() < Self::START_CODE_SIZE || buf[..Self::START_CODE_SIZE] != [0, 0, 1] {
            return Ok(None);
        }
        if buf.len() < Self::FIXED_HEADER_SIZE {
            return Err(PacketError::PesHeader {
                pid,
                reason: "fixed header truncated",
            });
        }
        let stream_id = StreamId::from(buf[3]);
        let packet_length = u16::from(buf[4]) << 8 | u16::from(buf[5]);
        let mut header = PesHeader {
            stream_id,
            packet_length,
            pts: None,
            dts: None,
            header_data: Vec::new(),
        };
        if !stream_id.has_optional_header() {
            return Ok(Some(header));
        }

        let rest = &buf[Self::FIXED_HEADER_SIZE..];
        if rest.len() < Self::OPTIONAL_HEADER_SIZE {
            return Err(PacketError::PesHeader {
                pid,
                reason: "optional header truncated",
            });
        }
        let check_bits = rest[0] >> 6;
        if check_bits != 0b10 {
            return Err(PacketError::PesHeader {
                pid,
                reason: "check bits are not '10'",
            });
        }
        let header_data_length = rest[2] as usize;
        let end = Self::OPTIONAL_HEADER_SIZE + header_data_length;
        if end > rest.len() {
            return Err(PacketError::PesHeader {
                pid,
                reason: "PES_header_data_length exceeds packet",
            });
        }
        let timestamps = &rest[Self::OPTIONAL_HEADER_SIZE..end];
        let ts_err = |source| PacketError::Timestamp { pid, source };
        match rest[1] >> 6 {
            0b00 => {}
            0b01 => {
                return Err(PacketError::PesHeader {
                    pid,
                    reason: "forbidden PTS_DTS_flags value '01'",
                })
            }
            0b10 => {
                if timestamps.len() < Self::TIMESTAMP_SIZE {
                    return Err(PacketError::PesHeader {
                        pid,
                        reason: "no room for PTS",
                    });
                }
                header.pts = Some(Timestamp::from_pts_bytes(timestamps).map_err(ts_err)?);
            }
            _ => {
                if timestamps.len() < Self::TIMESTAMP_SIZE * 2 {
                    return Err(PacketError::PesHeader {
                        pid,
                        reason: "no room for PTS and DTS",
                    });
                }
                header.pts =
                    Some(Timestamp::from_pts_with_dts_bytes(timestamps).map_err(ts_err)?);
                header.dts = Some(
                    Timestamp::from_dts_bytes(&timestamps[Self::TIMESTAMP_SIZE..])
                        .map_err(ts_err)?,
                );
            }
        }
        header.header_data = rest[..end].to_vec();
        trace!(
            "{:?} PES header {:?} pts={:?} dts={:?}",
            pid,
            header.stream_id,
            header.pts,
            header.dts
        );
        Ok(Some(header))
    }

    /// Number of payload bytes taken up by this header.
    pub fn header_size(&self) -> usize {
        Self::FIXED_HEADER_SIZE + self.header_data.len()
    }
}

/// Failure to parse a timestamp value
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum TimestampError {
    /// Parsing the timestamp failed because the 'prefix-bit' values within the timestamp did not
    /// have the expected values
    #[error("timestamp prefix bits {actual:#06b}, expected {expected:#06b}")]
    IncorrectPrefixBits {
        /// expected prefix-bits for this timestamp
        expected: u8,
        /// the actual, incorrect bits that were present
        actual: u8,
    },
    /// Parsing the timestamp failed because a 'marker-bit' value within the timestamp did not
    /// have the expected value
    #[error("timestamp marker bit {bit_number} not set")]
    MarkerBitNotSet {
        /// the bit-index of the bit which should have been 1, but was found to be 0
        bit_number: u8,
    },
}

/// A 33-bit Elementary Stream timestamp, used to represent PTS and DTS values which may appear in
/// a PES header.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Timestamp {
    val: u64,
}
impl Timestamp {
    /// The largest representable timestamp value before the timestamp wraps back around to zero.
    pub const MAX: Timestamp = Timestamp { val: (1 << 33) - 1 };

    /// 90kHz timebase in which PTS and DTS values are measured.
    pub const TIMEBASE: u64 = 90_000;

    /// Parse a Presentation Time Stamp value from the 5 bytes at the start of the given slice,
    /// where no DTS follows.
    ///
    /// Panics if fewer than 5 bytes given
    pub fn from_pts_bytes(buf: &[u8]) -> Result<Timestamp, TimestampError> {
        Timestamp::check_prefix(buf, 0b0010)?;
        Timestamp::from_bytes(buf)
    }
    /// Parse a Presentation Time Stamp value that is followed by a DTS.
    ///
    /// Panics if fewer than 5 bytes given
    pub fn from_pts_with_dts_bytes(buf: &[u8]) -> Result<Timestamp, TimestampError> {
        Timestamp::check_prefix(buf, 0b0011)?;
        Timestamp::from_bytes(buf)
    }
    /// Parse a Decode Time Stamp value from the 5 bytes at the start of the given slice
    ///
    /// Panics if fewer than 5 bytes given
    pub fn from_dts_bytes(buf: &[u8]) -> Result<Timestamp, TimestampError> {
        Timestamp::check_prefix(buf, 0b0001)?;
        Timestamp::from_bytes(buf)
    }
    fn check_prefix(buf: &[u8], expected: u8) -> Result<(), TimestampError> {
        let actual = buf[0] >> 4;
        if actual == expected {
            Ok(())
        } else {
            Err(TimestampError::IncorrectPrefixBits { expected, actual })
        }
    }
    fn check_marker_bit(buf: &[u8], bit_number: u8) -> Result<(), TimestampError> {
        let byte_index = bit_number / 8;
        let bit_index = bit_number % 8;
        let bit_mask = 1 << (7 - bit_index);
        if buf[byte_index as usize] & bit_mask != 0 {
            Ok(())
        } else {
            Err(TimestampError::MarkerBitNotSet { bit_number })
        }
    }
    /// Parse a Time Stamp value from the 5 bytes at the start of the given slice, without checking
    /// the 4-bit prefix.  The three marker bits are checked.
    ///
    /// Panics if fewer than 5 bytes given
    pub fn from_bytes(buf: &[u8]) -> Result<Timestamp, TimestampError> {
        Timestamp::check_marker_bit(buf, 7)?;
        Timestamp::check_marker_bit(buf, 23)?;
        Timestamp::check_marker_bit(buf, 39)?;
        Ok(Timestamp {
            val: (u64::from(buf[0] & 0b0000_1110) << 29)
                | u64::from(buf[1]) << 22
                | (u64::from(buf[2] & 0b1111_1110) << 14)
                | u64::from(buf[3]) << 7
                | u64::from(buf[4]) >> 1,
        })
    }
    /// Panics if the given val is greater than 2^33-1
    pub fn from_u64(val: u64) -> Timestamp {
        assert!(val <= Self::MAX.val);
        Timestamp { val }
    }
    /// produces the timestamp's value (only the low 33 bits are used)
    pub fn value(self) -> u64 {
        self.val
    }
}
impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "Timestamp({})", self.val)
    }
}
