//! Types for reconstructing tables of *Program Specific Information* from transport stream
//! packets.
//!
//! # Concepts
//!
//! * There are multiple standard types of Program Specific Information, like the *Program
//!   Association Table* and *Program Map Table*.  DVB adds further tables such as the *Service
//!   Description Table*.
//! * A PSI *Table* can split into *Sections*
//! * A Section can be split across a small number of individual transport stream *Packets*, and
//!   one packet may carry the end of one section followed by the start of others.
//!
//! # Core types
//!
//! * [`TableAssembler`](struct.TableAssembler.html) is bound to one PID and turns the packets
//!   of that PID into complete sections, which it hands to a [`TableSyntax`](trait.TableSyntax.html)
//! * each `TableSyntax` implementation ([`PatSyntax`](pat/struct.PatSyntax.html),
//!   [`PmtSyntax`](pmt/struct.PmtSyntax.html), [`SdtSyntax`](sdt/struct.SdtSyntax.html))
//!   decodes section bodies into a [`Table`](enum.Table.html)
//!
//! Damaged sections are logged and dropped; the assembler then waits for the next section
//! start.  Only feeding an assembler the wrong PID is reported to the caller.

pub mod pat;
pub mod pmt;
pub mod sdt;

use self::pat::ProgramAssociationTable;
use self::pmt::ProgramMapTable;
use self::sdt::ServiceDescriptionTable;
use crate::descriptor::Descriptor;
use crate::error::{ConfigurationError, TableError};
use crate::packet::{Pid, TsPacket};
use crc::{Crc, CRC_32_MPEG_2};
use log::{debug, trace, warn};
use std::fmt;
use std::sync::Arc;

const CRC_MPEG: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Largest `section_length` permitted for the tables handled here.
pub const MAX_SECTION_LENGTH: usize = 1021;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentNext {
    Current,
    Next,
}

impl CurrentNext {
    fn from(v: u8) -> CurrentNext {
        if v & 1 == 0 {
            CurrentNext::Next
        } else {
            CurrentNext::Current
        }
    }
}

/// The three bytes which start every section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionCommonHeader {
    pub table_id: u8,
    pub section_syntax_indicator: bool,
    pub private_indicator: bool,
    pub section_length: usize,
}

impl SectionCommonHeader {
    pub const SIZE: usize = 3;

    /// Decodes the first `SIZE` bytes of `buf`, which must be at least that long.
    pub fn new(buf: &[u8]) -> SectionCommonHeader {
        debug_assert!(buf.len() >= Self::SIZE);
        SectionCommonHeader {
            table_id: buf[0],
            section_syntax_indicator: buf[1] & 0b1000_0000 != 0,
            private_indicator: buf[1] & 0b0100_0000 != 0,
            section_length: ((u16::from(buf[1] & 0b0000_1111) << 8) | u16::from(buf[2])) as usize,
        }
    }

    /// Size of the whole section including these header bytes.
    pub fn total_size(&self) -> usize {
        Self::SIZE + self.section_length
    }

    fn check(&self) -> Result<(), TableError> {
        if !self.section_syntax_indicator {
            return Err(TableError::MissingSectionSyntax(self.table_id));
        }
        if self.section_length < TableSyntaxHeader::SIZE + 4
            || self.section_length > MAX_SECTION_LENGTH
        {
            return Err(TableError::SectionLengthOutOfRange(self.section_length));
        }
        Ok(())
    }
}

/// Represents the fields that appear within table sections that use the common 'section syntax'.
///
/// This will only be used for a table section if the
/// [`section_syntax_indicator`](struct.SectionCommonHeader.html#structfield.section_syntax_indicator)
/// field in the `SectionCommonHeader` of the section is `true`.
#[derive(Debug)]
pub struct TableSyntaxHeader<'buf> {
    buf: &'buf [u8],
}

impl<'buf> TableSyntaxHeader<'buf> {
    pub const SIZE: usize = 5;

    /// Wraps the `SIZE` bytes following the `SectionCommonHeader`; `buf` must be at least that
    /// long.
    pub fn new(buf: &'buf [u8]) -> TableSyntaxHeader<'buf> {
        debug_assert!(buf.len() >= Self::SIZE);
        TableSyntaxHeader { buf }
    }
    /// The initial 16-bit field within a 'section syntax' PSI table (which immediately follows the
    /// `section_length` field).
    /// This field is named,
    ///  - `transport_stream_id` when it appears within a Program Association Section or a
    ///    Service Description Section
    ///  - `program_number` when it appears within a Program Map Section
    pub fn id(&self) -> u16 {
        u16::from(self.buf[0]) << 8 | u16::from(self.buf[1])
    }
    /// A 5-bit value that can be used to quickly check if this table has changed since the last
    /// time it was periodically inserted within the transport stream being read.
    pub fn version(&self) -> u8 {
        (self.buf[2] >> 1) & 0b0001_1111
    }
    /// Is this table applicable now, or will it become applicable at some future time.
    pub fn current_next_indicator(&self) -> CurrentNext {
        CurrentNext::from(self.buf[2])
    }
    /// The number of this section, within a potentially multi-section table.
    pub fn section_number(&self) -> u8 {
        self.buf[3]
    }
    /// Indicates the value of `section_number()` that will appear within the last section within
    /// a table.
    pub fn last_section_number(&self) -> u8 {
        self.buf[4]
    }
}

/// The fields shared by every kind of table, taken from the section that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    /// The PID on which the table was carried
    pub pid: Pid,
    /// `pointer_field` of the packet in which the section started
    pub pointer_field: u8,
    pub table_id: u8,
    pub section_length: usize,
    /// `transport_stream_id` or `program_number`, depending on the table
    pub id: u16,
    pub version: u8,
    pub current_next: CurrentNext,
    pub section_number: u8,
    pub last_section_number: u8,
    /// Table level descriptors, such as the PMT's program-info loop; empty for tables without one
    pub descriptors: Vec<Descriptor>,
}

impl TableHeader {
    fn new(
        pid: Pid,
        pointer_field: u8,
        common: &SectionCommonHeader,
        syntax: &TableSyntaxHeader<'_>,
    ) -> TableHeader {
        TableHeader {
            pid,
            pointer_field,
            table_id: common.table_id,
            section_length: common.section_length,
            id: syntax.id(),
            version: syntax.version(),
            current_next: syntax.current_next_indicator(),
            section_number: syntax.section_number(),
            last_section_number: syntax.last_section_number(),
            descriptors: Vec::new(),
        }
    }
}

/// A reconstructed table of one of the supported kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Table {
    Pat(Arc<ProgramAssociationTable>),
    Pmt(Arc<ProgramMapTable>),
    Sdt(Arc<ServiceDescriptionTable>),
}

impl Table {
    pub fn header(&self) -> &TableHeader {
        match self {
            Table::Pat(t) => &t.header,
            Table::Pmt(t) => &t.header,
            Table::Sdt(t) => &t.header,
        }
    }

    /// Short name of the table kind, e.g. `"PAT"`.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Pat(_) => "PAT",
            Table::Pmt(_) => "PMT",
            Table::Sdt(_) => "SDT",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.header();
        write!(f, "{} version {} on {:?}: ", self.name(), h.version, h.pid)?;
        match self {
            Table::Pat(t) => write!(
                f,
                "transport_stream_id {}, {} programs",
                t.transport_stream_id,
                t.program_numbers.len()
            ),
            Table::Pmt(t) => write!(
                f,
                "program {}, PCR on {:?}, {} elementary streams",
                t.program_number,
                t.pcr_pid,
                t.elementary_streams.len()
            ),
            Table::Sdt(t) => write!(
                f,
                "transport_stream_id {}, original_network_id {}, {} services",
                t.transport_stream_id,
                t.original_network_id,
                t.items.len()
            ),
        }
    }
}

/// Notification that a new version of a table has been published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChange {
    /// The PID that carried the new table
    pub pid: Pid,
    pub table: Table,
    /// Human readable description of the new table
    pub summary: String,
}

impl TableChange {
    fn new(pid: Pid, table: Table) -> TableChange {
        TableChange {
            pid,
            summary: table.to_string(),
            table,
        }
    }
}

/// Decodes the body of complete sections for one kind of table.
pub trait TableSyntax {
    /// Used in log messages.
    const NAME: &'static str;

    /// Should the section with these headers be given to this syntax at all?  Sections that are
    /// not accepted are skipped silently.
    fn accepts(&self, common: &SectionCommonHeader, syntax: &TableSyntaxHeader<'_>) -> bool;

    /// Does this section repeat data that has already been published?  The default compares
    /// the section's version to that of the last published table.
    fn is_redundant(&self, syntax: &TableSyntaxHeader<'_>, published_version: Option<u8>) -> bool {
        published_version == Some(syntax.version())
    }

    /// Decode `body`, the bytes between the section's 8-byte header and its `CRC_32`.
    fn section(&mut self, header: TableHeader, body: &[u8]) -> Result<Table, TableError>;

    /// Forget any state accumulated across sections.
    fn reset(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssemblerState {
    /// waiting for a packet with `payload_unit_start_indicator` set
    Idle,
    /// collecting a section; `total` is known once its 3 header bytes have arrived
    Accumulating { total: Option<usize> },
}

/// Turns the packets of one PID into tables.
///
/// A section is accumulated until `section_length + 3` bytes are present, then checked and
/// decoded by `S`.  Each table produced is returned from [`push()`](#method.push) as a
/// [`TableChange`](struct.TableChange.html).
pub struct TableAssembler<S: TableSyntax> {
    pid: Pid,
    syntax: S,
    verify_crc: bool,
    state: AssemblerState,
    pointer_field: u8,
    buf: Vec<u8>,
    published_version: Option<u8>,
}

impl<S: TableSyntax> TableAssembler<S> {
    /// Creates an assembler bound to `pid`.  When `verify_crc` is `true`, sections whose
    /// `CRC_32` does not match are dropped.
    pub fn new(pid: Pid, syntax: S, verify_crc: bool) -> TableAssembler<S> {
        TableAssembler {
            pid,
            syntax,
            verify_crc,
            state: AssemblerState::Idle,
            pointer_field: 0,
            buf: Vec::with_capacity(MAX_SECTION_LENGTH + SectionCommonHeader::SIZE),
            published_version: None,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn syntax(&self) -> &S {
        &self.syntax
    }

    /// Version of the last table this assembler published.
    pub fn published_version(&self) -> Option<u8> {
        self.published_version
    }

    /// Is part of a section currently buffered?
    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, AssemblerState::Accumulating { .. })
    }

    /// Drop any partial section along with the record of what has been published.
    pub fn reset(&mut self) {
        self.abandon();
        self.published_version = None;
        self.syntax.reset();
    }

    /// Consumes one packet of this assembler's PID, returning a change for every table
    /// completed by it.
    ///
    /// Damaged sections are logged and dropped.  A packet from any other PID is a
    /// `ConfigurationError`.
    pub fn push(&mut self, pk: &TsPacket) -> Result<Vec<TableChange>, ConfigurationError> {
        if pk.pid != self.pid {
            return Err(ConfigurationError::PidMismatch {
                bound: self.pid,
                actual: pk.pid,
            });
        }
        let mut changes = Vec::new();
        let payload = match pk.payload() {
            Some(payload) => payload,
            None => return Ok(changes),
        };
        if pk.payload_unit_start_indicator {
            let pointer = payload[0] as usize;
            let rest = &payload[1..];
            if pointer > rest.len() {
                warn!(
                    "{} on {:?}: {}",
                    S::NAME,
                    self.pid,
                    TableError::PointerBeyondPayload {
                        pointer,
                        available: rest.len()
                    }
                );
                self.abandon();
                return Ok(changes);
            }
            if pointer > 0 && self.is_accumulating() {
                self.append(&rest[..pointer], &mut changes);
            }
            if self.is_accumulating() {
                debug!(
                    "{} on {:?}: new section starts before previous one completed",
                    S::NAME,
                    self.pid
                );
            }
            self.abandon();
            self.pointer_field = payload[0];
            self.state = AssemblerState::Accumulating { total: None };
            self.append(&rest[pointer..], &mut changes);
        } else if self.is_accumulating() {
            self.append(payload, &mut changes);
        } else {
            trace!("{} on {:?}: continuation outside section", S::NAME, self.pid);
        }
        Ok(changes)
    }

    fn abandon(&mut self) {
        self.state = AssemblerState::Idle;
        self.buf.clear();
    }

    fn append(&mut self, mut data: &[u8], changes: &mut Vec<TableChange>) {
        while let AssemblerState::Accumulating { total } = self.state {
            let total = match total {
                Some(total) => total,
                None => {
                    if self.buf.is_empty() {
                        match data.first() {
                            // stuffing: no further sections in this packet
                            Some(0xff) => {
                                self.abandon();
                                return;
                            }
                            // section ended with the payload; the next starts with a PUSI
                            None => {
                                self.abandon();
                                return;
                            }
                            Some(_) => (),
                        }
                    }
                    let take = (SectionCommonHeader::SIZE - self.buf.len()).min(data.len());
                    self.buf.extend_from_slice(&data[..take]);
                    data = &data[take..];
                    if self.buf.len() < SectionCommonHeader::SIZE {
                        return;
                    }
                    let header = SectionCommonHeader::new(&self.buf);
                    if let Err(e) = header.check() {
                        warn!("{} on {:?}: {}", S::NAME, self.pid, e);
                        self.abandon();
                        return;
                    }
                    let total = header.total_size();
                    self.state = AssemblerState::Accumulating { total: Some(total) };
                    total
                }
            };
            let take = (total - self.buf.len()).min(data.len());
            self.buf.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.buf.len() < total {
                return;
            }
            let section = std::mem::take(&mut self.buf);
            match self.complete(&section) {
                Ok(Some(table)) => changes.push(TableChange::new(self.pid, table)),
                Ok(None) => (),
                Err(e) => warn!("{} on {:?}: dropping section: {}", S::NAME, self.pid, e),
            }
            self.buf = section;
            self.buf.clear();
            self.state = AssemblerState::Accumulating { total: None };
        }
    }

    fn complete(&mut self, section: &[u8]) -> Result<Option<Table>, TableError> {
        let common = SectionCommonHeader::new(section);
        let syntax = TableSyntaxHeader::new(&section[SectionCommonHeader::SIZE..]);
        if !self.syntax.accepts(&common, &syntax) {
            trace!(
                "{} on {:?}: ignoring table_id {:#04x} id {}",
                S::NAME,
                self.pid,
                common.table_id,
                syntax.id()
            );
            return Ok(None);
        }
        if syntax.current_next_indicator() == CurrentNext::Next {
            trace!("{} on {:?}: ignoring section not yet applicable", S::NAME, self.pid);
            return Ok(None);
        }
        if self.syntax.is_redundant(&syntax, self.published_version) {
            return Ok(None);
        }
        let crc_pos = section.len() - 4;
        if self.verify_crc && !cfg!(fuzzing) {
            let expected = u32::from_be_bytes([
                section[crc_pos],
                section[crc_pos + 1],
                section[crc_pos + 2],
                section[crc_pos + 3],
            ]);
            let actual = CRC_MPEG.checksum(&section[..crc_pos]);
            if expected != actual {
                return Err(TableError::CrcMismatch {
                    table_id: common.table_id,
                    expected,
                    actual,
                });
            }
        }
        let header = TableHeader::new(self.pid, self.pointer_field, &common, &syntax);
        let body = &section[SectionCommonHeader::SIZE + TableSyntaxHeader::SIZE..crc_pos];
        let table = self.syntax.section(header, body)?;
        self.published_version = Some(syntax.version());
        Ok(Some(table))
    }
}

/// Computes the `CRC_32` which terminates a section.
pub fn section_crc(section: &[u8]) -> u32 {
    CRC_MPEG.checksum(section)
}

#[cfg(test)]
pub(crate) mod test {
    use super::pat::PatSyntax;
    use super::*;
    use crate::packet::test::make_packet;
    use assert_matches::assert_matches;
    use hex_literal::*;

    /// Appends the section CRC to a section lacking one.
    pub(crate) fn with_crc(section: &[u8]) -> Vec<u8> {
        let mut v = section.to_vec();
        v.extend_from_slice(&section_crc(section).to_be_bytes());
        v
    }

    /// Splits `section` across as many packets as it needs, with a zero pointer_field.
    pub(crate) fn packetise(pid: u16, first_cc: u8, section: &[u8]) -> Vec<TsPacket> {
        let mut data = vec![0];
        data.extend_from_slice(section);
        data.chunks(TsPacket::SIZE - 4)
            .enumerate()
            .map(|(i, chunk)| {
                let cc = first_cc.wrapping_add(i as u8) & 0xf;
                TsPacket::parse(&make_packet(pid, cc, i == 0, chunk)).unwrap()
            })
            .collect()
    }

    fn section(table_id: u8, id: u16, version: u8, body: &[u8]) -> Vec<u8> {
        let section_length = TableSyntaxHeader::SIZE + body.len() + 4;
        let mut s = vec![
            table_id,
            0xb0 | (section_length >> 8) as u8,
            section_length as u8,
        ];
        s.extend_from_slice(&id.to_be_bytes());
        s.extend_from_slice(&[0xc1 | (version << 1), 0, 0]);
        s.extend_from_slice(body);
        with_crc(&s)
    }

    /// A PAT section listing `(program_number, pmt_pid)` pairs.
    pub(crate) fn pat_section(version: u8, programs: &[(u16, u16)]) -> Vec<u8> {
        let mut body = vec![];
        for &(program_number, pid) in programs {
            body.extend_from_slice(&program_number.to_be_bytes());
            body.extend_from_slice(&(0xe000 | pid).to_be_bytes());
        }
        section(pat::TABLE_ID, 1, version, &body)
    }

    /// A PMT section listing `(stream_type, elementary_pid, descriptors)` entries.
    pub(crate) fn pmt_section(
        program_number: u16,
        version: u8,
        pcr_pid: u16,
        streams: &[(u8, u16, &[u8])],
    ) -> Vec<u8> {
        let mut body = vec![];
        body.extend_from_slice(&(0xe000 | pcr_pid).to_be_bytes());
        body.extend_from_slice(&[0xf0, 0x00]);
        for &(stream_type, pid, descriptors) in streams {
            body.push(stream_type);
            body.extend_from_slice(&(0xe000 | pid).to_be_bytes());
            body.extend_from_slice(&(0xf000 | descriptors.len() as u16).to_be_bytes());
            body.extend_from_slice(descriptors);
        }
        section(pmt::TABLE_ID, program_number, version, &body)
    }

    // PAT version 1, transport_stream_id 1, program 1 on PID 0x100
    const PAT: [u8; 12] = hex!("00b00d 0001 c3 00 00 0001e100");

    fn pat_assembler() -> TableAssembler<PatSyntax> {
        TableAssembler::new(Pid::PAT, PatSyntax::default(), true)
    }

    #[test]
    fn continuation_outside_section() {
        let pk = TsPacket::parse(&make_packet(0, 0, false, &[1, 2, 3])).unwrap();
        let mut a = pat_assembler();
        assert!(a.push(&pk).unwrap().is_empty());
        assert!(!a.is_accumulating());
    }

    #[test]
    fn pid_mismatch() {
        let pk = TsPacket::parse(&make_packet(0x21, 0, true, &[0])).unwrap();
        let mut a = pat_assembler();
        assert_matches!(
            a.push(&pk),
            Err(ConfigurationError::PidMismatch { bound, actual }) => {
                assert_eq!(bound, Pid::PAT);
                assert_eq!(actual, Pid::new(0x21));
            }
        );
    }

    #[test]
    fn pointer_beyond_payload() {
        let pk = TsPacket::parse(&make_packet(0, 0, true, &[200])).unwrap();
        let mut a = pat_assembler();
        assert!(a.push(&pk).unwrap().is_empty());
        assert!(!a.is_accumulating());
    }

    #[test]
    fn zero_section_length() {
        let pk = TsPacket::parse(&make_packet(0, 0, true, &hex!("00 00b000"))).unwrap();
        let mut a = pat_assembler();
        assert!(a.push(&pk).unwrap().is_empty());
        assert!(!a.is_accumulating());
    }

    #[test]
    fn crc_mismatch_is_dropped() {
        let mut section = with_crc(&PAT);
        let last = section.len() - 1;
        section[last] ^= 1;
        let mut a = pat_assembler();
        for pk in packetise(0, 0, &section) {
            assert!(a.push(&pk).unwrap().is_empty());
        }
        assert_eq!(a.published_version(), None);

        let mut a = TableAssembler::new(Pid::PAT, PatSyntax::default(), false);
        let changes: Vec<_> = packetise(0, 0, &section)
            .iter()
            .flat_map(|pk| a.push(pk).unwrap())
            .collect();
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn same_version_published_once() {
        let section = with_crc(&PAT);
        let mut a = pat_assembler();
        let mut count = 0;
        for cc in 0..2 {
            for pk in packetise(0, cc, &section) {
                count += a.push(&pk).unwrap().len();
            }
        }
        assert_eq!(count, 1);
        assert_eq!(a.published_version(), Some(1));
    }

    #[test]
    fn not_yet_applicable() {
        let mut next = PAT;
        next[5] &= 0b1111_1110;
        let mut a = pat_assembler();
        for pk in packetise(0, 0, &with_crc(&next)) {
            assert!(a.push(&pk).unwrap().is_empty());
        }
    }

    #[test]
    fn two_sections_in_one_packet() {
        let first = with_crc(&PAT);
        let mut second = PAT;
        second[5] = 0xc5; // version 2
        let second = with_crc(&second);
        let mut data = vec![0];
        data.extend_from_slice(&first);
        data.extend_from_slice(&second);
        let pk = TsPacket::parse(&make_packet(0, 0, true, &data)).unwrap();
        let mut a = pat_assembler();
        let changes = a.push(&pk).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].table.header().version, 2);
        assert!(!a.is_accumulating());
    }

    #[test]
    fn header_split_across_packets() {
        let section = with_crc(&PAT);
        // the previous section occupies all but the last two payload bytes of the first packet
        let mut data = vec![0xff; TsPacket::SIZE - 4];
        data[0] = 0;
        let mut filler = vec![0x00, 0xb0, (TsPacket::SIZE - 4 - 2 - 1 - 3) as u8];
        filler.resize(TsPacket::SIZE - 4 - 1 - 2, 0xaa);
        data[1..1 + filler.len()].copy_from_slice(&filler);
        let split = 1 + filler.len();
        data[split..].copy_from_slice(&section[..2]);
        let mut a = TableAssembler::new(Pid::PAT, PatSyntax::default(), true);
        let pk1 = TsPacket::parse(&make_packet(0, 0, true, &data)).unwrap();
        // the filler section is flagged as not yet applicable, so it is skipped
        assert!(a.push(&pk1).unwrap().is_empty());
        assert!(a.is_accumulating());
        let pk2 = TsPacket::parse(&make_packet(0, 1, false, &section[2..])).unwrap();
        let changes = a.push(&pk2).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].pid, Pid::PAT);
        assert_eq!(
            changes[0].summary,
            "PAT version 1 on Pid(0000): transport_stream_id 1, 1 programs"
        );
    }

    #[test]
    fn section_filling_payload_returns_to_idle() {
        // one stream carrying a 162 byte descriptor makes a 183 byte section, which exactly
        // fills the payload after the pointer_field
        let mut descriptor = vec![0xf0, 160];
        descriptor.resize(162, 0x00);
        let section = pmt_section(1, 0, 0x101, &[(0x1b, 0x101, &descriptor[..])]);
        assert_eq!(section.len(), TsPacket::SIZE - 5);
        let mut a = TableAssembler::new(Pid::new(0x100), pmt::PmtSyntax::new(1), true);
        let packets = packetise(0x100, 0, &section);
        assert_eq!(packets.len(), 1);
        assert_eq!(a.push(&packets[0]).unwrap().len(), 1);
        assert!(!a.is_accumulating());

        // a complete section at the start of a packet without payload_unit_start_indicator
        // is not a section start
        let next = pmt_section(1, 1, 0x101, &[]);
        let pk = TsPacket::parse(&make_packet(0x100, 1, false, &next)).unwrap();
        assert!(a.push(&pk).unwrap().is_empty());
        assert_eq!(a.published_version(), Some(0));
    }
}
