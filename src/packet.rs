//! Decoding of 188-byte transport stream packets into owned [`TsPacket`](struct.TsPacket.html)
//! records.

use crate::error::PacketError;
use crate::pes::PesHeader;
use log::{trace, warn};
use serde::Serialize;
use std::convert::TryFrom;
use std::fmt;

/// the different values indicating whether a `TsPacket` carries an adaptation field, a payload,
/// or both.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AdaptationControl {
    /// This value is used if the transport stream packet `adaptation_control` field uses the value
    /// `0b00`, which ISO/IEC 13818-1 reserves.
    Reserved,
    /// indicates that this packet contains a payload, but not an adaptation field
    PayloadOnly,
    /// indicates that this packet contains an adaptation field, but not a payload
    AdaptationFieldOnly,
    /// indicates that this packet contains both an adaptation field and a payload
    AdaptationFieldAndPayload,
}

impl AdaptationControl {
    #[inline(always)]
    fn from(val: u8) -> AdaptationControl {
        match val & 0b11 {
            0 => AdaptationControl::Reserved,
            1 => AdaptationControl::PayloadOnly,
            2 => AdaptationControl::AdaptationFieldOnly,
            _ => AdaptationControl::AdaptationFieldAndPayload,
        }
    }

    /// True if this AdaptationControl variant indicates that the packet will have a payload
    #[inline(always)]
    pub fn has_payload(self) -> bool {
        match self {
            AdaptationControl::Reserved | AdaptationControl::AdaptationFieldOnly => false,
            AdaptationControl::PayloadOnly | AdaptationControl::AdaptationFieldAndPayload => true,
        }
    }

    /// True if this AdaptationControl variant indicates that the packet will have an adaptation
    /// field
    #[inline(always)]
    pub fn has_adaptation_field(self) -> bool {
        match self {
            AdaptationControl::Reserved | AdaptationControl::PayloadOnly => false,
            AdaptationControl::AdaptationFieldOnly
            | AdaptationControl::AdaptationFieldAndPayload => true,
        }
    }
}

/// Indicates content scrambling in use, if any.
///
/// Actual content scrambling schemes, indicated through the `u8` value in the `Undefined`
/// variant, are left to be described by other specifications.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TransportScramblingControl {
    /// The stream is not scrambled.
    NotScrambled,
    /// The stream is scrambled using a scheme not defined by ISO/IEC 13818-1.
    Undefined(u8),
}

impl TransportScramblingControl {
    fn from(val: u8) -> TransportScramblingControl {
        match val & 0b11 {
            0 => TransportScramblingControl::NotScrambled,
            v => TransportScramblingControl::Undefined(v),
        }
    }
}

/// A _Clock Reference_ is used to represent the values of PCR fields within the transport
/// stream data.
///
/// A _Clock Reference_ includes a 33-bit, 90kHz `base` component, together with another 9-bit,
/// high-resolution `extension` component.
///
/// Together these can be viewed as a 42-bit, 27MHz quantity (e.g. `let full_value = pcr as u64`).
/// Since the clock reference is limited to 33-bits, at a rate of 90kHz a continuously increasing
/// clock value will wrap-around approximately every 26.5 hours.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct ClockRef {
    base: u64,
    extension: u16,
}

impl From<ClockRef> for u64 {
    fn from(pcr: ClockRef) -> u64 {
        pcr.base * 300 + u64::from(pcr.extension)
    }
}

impl fmt::Debug for ClockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "PCR{{{:08x}:{:04x}}}", self.base, self.extension)
    }
}
impl ClockRef {
    /// Number of distinct 27MHz values before the clock wraps (`2^33 * 300`).
    pub const MODULUS: u64 = (1 << 33) * 300;

    /// Panics if `data` is shorter than 6 bytes
    pub fn from_slice(data: &[u8]) -> ClockRef {
        ClockRef {
            base: u64::from(data[0]) << 25
                | u64::from(data[1]) << 17
                | u64::from(data[2]) << 9
                | u64::from(data[3]) << 1
                | u64::from(data[4]) >> 7,
            extension: (u16::from(data[4]) & 0b1) << 8 | u16::from(data[5]),
        }
    }
    /// Panics if the `base` is greater than 2^33-1 or the `extension` is greater than 2^9-1
    pub fn from_parts(base: u64, extension: u16) -> ClockRef {
        assert!(base < (1 << 33));
        assert!(extension < (1 << 9));
        ClockRef { base, extension }
    }

    /// get the 33-bit, 90kHz 'base' component of the timestamp
    pub fn base(&self) -> u64 {
        self.base
    }

    /// get the 9-bit 'extension' component of the timestamp, measured in 300ths of the 90kHz base
    /// clockrate (i.e. 27MHz)
    pub fn extension(&self) -> u16 {
        self.extension
    }
}

/// Fields of the adaptation field that may follow the 4-byte packet header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptationField {
    /// Value of the `adaptation_field_length` byte
    pub length: usize,
    /// Set by an upstream processor on discovering a break in the data
    pub discontinuity_indicator: bool,
    /// Set when the packet is a good place to start decoding the stream
    pub random_access_indicator: bool,
    /// Set when this packet has higher priority than other packets of the same PID
    pub elementary_stream_priority_indicator: bool,
    /// `OPCR_flag`
    pub opcr_flag: bool,
    /// `splicing_point_flag`
    pub splicing_point_flag: bool,
    /// `transport_private_data_flag`
    pub transport_private_data_flag: bool,
    /// `adaptation_field_extension_flag`
    pub extension_flag: bool,
    /// The _Program Clock Reference_, when `PCR_flag` is set and the field has room for it
    pub pcr: Option<ClockRef>,
}

impl AdaptationField {
    const PCR_SIZE: usize = 6;

    /// Decodes the field contents following the `adaptation_field_length` byte.
    fn from_bytes(buf: &[u8]) -> AdaptationField {
        let flags = buf.first().copied().unwrap_or(0);
        let pcr_flag = flags & 0b1_0000 != 0;
        let pcr = if pcr_flag {
            if buf.len() > Self::PCR_SIZE {
                Some(ClockRef::from_slice(&buf[1..=Self::PCR_SIZE]))
            } else {
                warn!(
                    "PCR_flag set but adaptation field only has {} bytes",
                    buf.len()
                );
                None
            }
        } else {
            None
        };
        AdaptationField {
            length: buf.len(),
            discontinuity_indicator: flags & 0b1000_0000 != 0,
            random_access_indicator: flags & 0b0100_0000 != 0,
            elementary_stream_priority_indicator: flags & 0b0010_0000 != 0,
            opcr_flag: flags & 0b1000 != 0,
            splicing_point_flag: flags & 0b100 != 0,
            transport_private_data_flag: flags & 0b10 != 0,
            extension_flag: flags & 0b1 != 0,
            pcr,
        }
    }

    /// The PCR as a 27MHz tick count, if present.
    pub fn pcr_value(&self) -> Option<u64> {
        self.pcr.map(u64::from)
    }
}

/// A counter value used within a transport stream to detect discontinuities in a sequence of packets.
/// The continuity counter should increase by one for each packet with a given PID for which
/// `adaptation_control` indicates that a payload should be present.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct ContinuityCounter {
    val: u8,
}

impl From<u8> for ContinuityCounter {
    #[inline]
    fn from(count: u8) -> ContinuityCounter {
        ContinuityCounter::new(count)
    }
}

impl ContinuityCounter {
    /// Panics if the given value is greater than 15.
    #[inline]
    pub fn new(count: u8) -> ContinuityCounter {
        assert!(count < 0b10000);
        ContinuityCounter { val: count }
    }

    /// Returns this counter's value, which will be between 0 and 15 inclusive.
    #[inline]
    pub fn count(self) -> u8 {
        self.val
    }

    /// true iff the given `ContinuityCounter` value follows this one.  Note that the maximum counter
    /// value is 15, and the counter 'wraps around':
    ///
    /// ```rust
    /// # use mpeg2ts_monitor::packet::ContinuityCounter;
    /// let a = ContinuityCounter::new(0);
    /// let b = ContinuityCounter::new(15);
    /// assert!(a.follows(b));  // after 15, counter wraps around to 0
    /// ```
    #[inline]
    pub fn follows(self, other: ContinuityCounter) -> bool {
        (other.val + 1) & 0b1111 == self.val
    }
}

/// A Packet Identifier value, between `0x0000` and `0x1fff`.
///
/// PID values identify a particular sub-stream within the overall Transport Stream.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Pid(u16);
impl Pid {
    /// The largest possible PID value, `0x1fff`.
    pub const MAX_VALUE: u16 = 0x1fff;

    /// The total number of distinct PID values, `0x2000` (equal to `MAX_VALUE` + 1)
    pub const PID_COUNT: usize = (Self::MAX_VALUE + 1) as usize;

    /// Carries the Program Association Table
    pub const PAT: Pid = Pid::new(0);
    /// Carries the Service Description Table
    pub const SDT: Pid = Pid::new(0x11);
    /// Null packets used as stuffing
    pub const NULL: Pid = Pid::new(0x1fff);

    /// Panics if the given value is greater than `Pid::MAX_VALUE`.
    pub const fn new(pid: u16) -> Pid {
        assert!(pid <= 0x1fff);
        Pid(pid)
    }

    /// Extracts the 13-bit PID from the two bytes it occupies in packet headers and tables,
    /// ignoring the three high bits of `hi`.
    #[inline]
    pub fn from_bytes(hi: u8, lo: u8) -> Pid {
        Pid(u16::from(hi & 0b0001_1111) << 8 | u16::from(lo))
    }
}
impl TryFrom<u16> for Pid {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if value <= Pid::MAX_VALUE {
            Ok(Pid(value))
        } else {
            Err(())
        }
    }
}
impl From<Pid> for u16 {
    #[inline]
    fn from(pid: Pid) -> Self {
        pid.0
    }
}
impl From<Pid> for usize {
    #[inline]
    fn from(pid: Pid) -> Self {
        pid.0 as usize
    }
}
impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "Pid({:04x})", self.0)
    }
}

const FIXED_HEADER_SIZE: usize = 4;
// when AF present, a 1-byte 'length' field precedes the content,
const ADAPTATION_FIELD_OFFSET: usize = FIXED_HEADER_SIZE + 1;

/// A decoded transport stream packet, per _ISO/IEC 13818-1, Section 2.4.3.3_.
///
/// The record owns a copy of its payload bytes, so it can outlive the buffer it was decoded
/// from.  Packets with `transport_error_indicator` set, and null packets, carry only the
/// fixed header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsPacket {
    /// The sub-stream to which this packet belongs
    pub pid: Pid,
    /// Set if some earlier processing detected an uncorrectable bit error in this packet
    pub transport_error_indicator: bool,
    /// Set if the payload holds the start of a PES packet or PSI section
    pub payload_unit_start_indicator: bool,
    /// `transport_priority`
    pub transport_priority: bool,
    /// `transport_scrambling_control`
    pub transport_scrambling_control: TransportScramblingControl,
    /// Indicates which of adaptation field and payload are present
    pub adaptation_control: AdaptationControl,
    /// The 4-bit `continuity_counter`
    pub continuity_counter: ContinuityCounter,
    /// Adaptation field, when present with non-zero length
    pub adaptation_field: Option<AdaptationField>,
    /// PES header found at the start of the payload
    pub pes_header: Option<PesHeader>,
    /// Bytes following the adaptation field and any PES header
    pub payload: Vec<u8>,
    /// Set when a payload was signalled but one byte or less of it remained
    pub empty_payload: bool,
}

impl TsPacket {
    /// The value `0x47`, which must appear in the first byte of every transport stream packet.
    pub const SYNC_BYTE: u8 = 0x47;

    /// The fixed 188 byte size of a transport stream packet.
    pub const SIZE: usize = 188;

    /// returns `true` if the given value is a valid synchronisation byte, the value
    /// `TsPacket::SYNC_BYTE` (0x47), which must appear at the start of every transport stream
    /// packet.
    #[inline(always)]
    pub fn is_sync_byte(b: u8) -> bool {
        b == Self::SYNC_BYTE
    }

    /// Decode a single packet from exactly `TsPacket::SIZE` bytes.
    pub fn parse(buf: &[u8]) -> Result<TsPacket, PacketError> {
        if buf.len() != Self::SIZE {
            return Err(PacketError::WrongPacketSize { actual: buf.len() });
        }
        if !Self::is_sync_byte(buf[0]) {
            return Err(PacketError::SyncByteMissing {
                offset: 0,
                found: buf[0],
            });
        }
        let pid = Pid::from_bytes(buf[1], buf[2]);
        let adaptation_control = AdaptationControl::from(buf[3] >> 4);
        let mut pk = TsPacket {
            pid,
            transport_error_indicator: buf[1] & 0b1000_0000 != 0,
            payload_unit_start_indicator: buf[1] & 0b0100_0000 != 0,
            transport_priority: buf[1] & 0b0010_0000 != 0,
            transport_scrambling_control: TransportScramblingControl::from(buf[3] >> 6),
            adaptation_control,
            continuity_counter: ContinuityCounter::new(buf[3] & 0b0000_1111),
            adaptation_field: None,
            pes_header: None,
            payload: Vec::new(),
            empty_payload: false,
        };
        if pk.transport_error_indicator || pid == Pid::NULL {
            return Ok(pk);
        }

        let mut offset = FIXED_HEADER_SIZE;
        if adaptation_control.has_adaptation_field() {
            let length = buf[FIXED_HEADER_SIZE] as usize;
            let limit = if adaptation_control.has_payload() {
                Self::SIZE - ADAPTATION_FIELD_OFFSET - 1
            } else {
                Self::SIZE - ADAPTATION_FIELD_OFFSET
            };
            if length > limit {
                return Err(PacketError::AdaptationFieldTooLong { pid, length, limit });
            }
            if length > 0 {
                pk.adaptation_field = Some(AdaptationField::from_bytes(
                    &buf[ADAPTATION_FIELD_OFFSET..ADAPTATION_FIELD_OFFSET + length],
                ));
            }
            offset = ADAPTATION_FIELD_OFFSET + length;
        }
        if !adaptation_control.has_payload() {
            return Ok(pk);
        }

        if pk.payload_unit_start_indicator {
            if let Some(header) = PesHeader::parse(pid, &buf[offset..])? {
                offset += header.header_size();
                pk.pes_header = Some(header);
            }
        }
        if Self::SIZE - offset <= 1 {
            trace!("{:?} has {} payload bytes, flagging empty", pid, Self::SIZE - offset);
            pk.empty_payload = true;
        } else {
            pk.payload = buf[offset..].to_vec();
        }
        Ok(pk)
    }

    /// The payload bytes, or `None` if the packet carries no usable payload.
    pub fn payload(&self) -> Option<&[u8]> {
        if self.payload.is_empty() {
            None
        } else {
            Some(&self.payload[..])
        }
    }

    /// The `discontinuity_indicator` of the adaptation field, `false` when there is none.
    pub fn discontinuity_indicator(&self) -> bool {
        self.adaptation_field
            .as_ref()
            .map(|af| af.discontinuity_indicator)
            .unwrap_or(false)
    }

    /// The PCR carried in this packet's adaptation field, if any.
    pub fn pcr(&self) -> Option<ClockRef> {
        self.adaptation_field.as_ref().and_then(|af| af.pcr)
    }
}

/// Finds the first offset that holds a sync byte and also has sync bytes 1, 2, 3 and 4 packets
/// further on (each checked only while still inside `buf`).
pub fn find_sync(buf: &[u8]) -> Option<usize> {
    (0..buf.len()).find(|&start| {
        TsPacket::is_sync_byte(buf[start])
            && (1..=4)
                .map(|n| start + n * TsPacket::SIZE)
                .take_while(|&pos| pos < buf.len())
                .all(|pos| TsPacket::is_sync_byte(buf[pos]))
    })
}

/// Decodes every whole packet in `buf`, in order, starting from the first synchronised
/// position.
///
/// Returns an empty list when no sync position is found.  The whole batch fails on the first
/// malformed packet; callers should skip the buffer and continue with the next one.
pub fn parse_packets(buf: &[u8]) -> Result<Vec<TsPacket>, PacketError> {
    let start = match find_sync(buf) {
        Some(start) => start,
        None => {
            if !buf.is_empty() {
                warn!("no sync byte found in {} byte buffer", buf.len());
            }
            return Ok(Vec::new());
        }
    };
    let chunks = buf[start..].chunks_exact(TsPacket::SIZE);
    if !chunks.remainder().is_empty() {
        trace!("ignoring {} trailing bytes", chunks.remainder().len());
    }
    chunks
        .enumerate()
        .map(|(i, chunk)| {
            TsPacket::parse(chunk).map_err(|e| match e {
                PacketError::SyncByteMissing { found, .. } => PacketError::SyncByteMissing {
                    offset: start + i * TsPacket::SIZE,
                    found,
                },
                other => other,
            })
        })
        .collect()
}
