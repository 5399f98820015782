//! Types related to the _Program Map Table_

use super::{SectionCommonHeader, Table, TableHeader, TableSyntax, TableSyntaxHeader};
use crate::descriptor::{self, Descriptor, DescriptorVariant};
use crate::error::TableError;
use crate::packet::Pid;
use crate::StreamType;
use std::sync::Arc;

/// `table_id` of a `TS_program_map_section`
pub const TABLE_ID: u8 = 0x02;

/// Details of a particular elementary stream within a program.
///
///  - `stream_type` gives an indication of the kind of content carried within the stream
///  - The `elementary_pid` property allows us to find Transport Stream packets that belong to the
///    elementary stream
///  - `descriptors` _may_ provide extra metadata describing some of the
///     stream's properties (for example, the streams 'language' might be given in a descriptor; or
///     it might not)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementaryStreamInfo {
    pub stream_type: StreamType,
    pub elementary_pid: Pid,
    pub descriptors: Vec<Descriptor>,
}

impl ElementaryStreamInfo {
    const HEADER_SIZE: usize = 5;

    /// Decodes the entry at the start of `data`, returning it with its size in bytes.
    fn from_bytes(data: &[u8]) -> Result<(ElementaryStreamInfo, usize), TableError> {
        if data.len() < Self::HEADER_SIZE {
            return Err(TableError::LoopOverrun {
                field: "elementary stream entry",
                length: Self::HEADER_SIZE,
                available: data.len(),
            });
        }
        let es_info_length = (usize::from(data[3] & 0b0000_1111) << 8) | usize::from(data[4]);
        let end = Self::HEADER_SIZE + es_info_length;
        if end > data.len() {
            return Err(TableError::LoopOverrun {
                field: "ES_info_length",
                length: es_info_length,
                available: data.len() - Self::HEADER_SIZE,
            });
        }
        let info = ElementaryStreamInfo {
            stream_type: StreamType::from(data[0]),
            elementary_pid: Pid::from_bytes(data[1], data[2]),
            descriptors: descriptor::decode_loop(&data[Self::HEADER_SIZE..end])?,
        };
        Ok((info, end))
    }

    /// The first descriptor of type `T` attached to this stream.
    pub fn descriptor<T: DescriptorVariant>(&self) -> Option<&T> {
        descriptor::find(&self.descriptors)
    }

    /// The first descriptor with the given tag attached to this stream.
    pub fn descriptor_by_tag(&self, tag: u8) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.tag == tag)
    }
}

/// The _Program Map Table_ gives details of the streams within a particular program.
///
/// The program-info descriptors are held in `header.descriptors`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramMapTable {
    pub header: TableHeader,
    pub program_number: u16,
    /// PID of packets that will contain the Program Clock Reference for this program
    pub pcr_pid: Pid,
    pub elementary_streams: Vec<ElementaryStreamInfo>,
}

impl ProgramMapTable {
    /// Program level descriptors.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.header.descriptors
    }

    /// The streams of the given type, in PMT order.
    pub fn streams_of_type(
        &self,
        stream_type: StreamType,
    ) -> impl Iterator<Item = &ElementaryStreamInfo> {
        self.elementary_streams
            .iter()
            .filter(move |s| s.stream_type == stream_type)
    }
}

/// Decodes the PMT sections of one program.
///
/// Several programs may share a PMT PID, so sections whose `program_number` differs from the
/// one given here are skipped.
pub struct PmtSyntax {
    program_number: u16,
}

impl PmtSyntax {
    const HEADER_SIZE: usize = 4;

    pub fn new(program_number: u16) -> PmtSyntax {
        PmtSyntax { program_number }
    }

    pub fn program_number(&self) -> u16 {
        self.program_number
    }
}

impl TableSyntax for PmtSyntax {
    const NAME: &'static str = "PMT";

    fn accepts(&self, common: &SectionCommonHeader, syntax: &TableSyntaxHeader<'_>) -> bool {
        common.table_id == TABLE_ID && syntax.id() == self.program_number
    }

    fn section(&mut self, mut header: TableHeader, body: &[u8]) -> Result<Table, TableError> {
        if body.len() < Self::HEADER_SIZE {
            return Err(TableError::SectionTooShort {
                table: Self::NAME,
                actual: body.len(),
                expected: Self::HEADER_SIZE,
            });
        }
        let pcr_pid = Pid::from_bytes(body[0], body[1]);
        let program_info_length = (usize::from(body[2] & 0b0000_1111) << 8) | usize::from(body[3]);
        let descriptor_end = Self::HEADER_SIZE + program_info_length;
        if descriptor_end > body.len() {
            return Err(TableError::LoopOverrun {
                field: "program_info_length",
                length: program_info_length,
                available: body.len() - Self::HEADER_SIZE,
            });
        }
        header.descriptors = descriptor::decode_loop(&body[Self::HEADER_SIZE..descriptor_end])?;

        let mut elementary_streams = Vec::new();
        let mut rest = &body[descriptor_end..];
        while !rest.is_empty() {
            let (info, size) = ElementaryStreamInfo::from_bytes(rest)?;
            elementary_streams.push(info);
            rest = &rest[size..];
        }
        Ok(Table::Pmt(Arc::new(ProgramMapTable {
            program_number: header.id,
            header,
            pcr_pid,
            elementary_streams,
        })))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::descriptor::iso_639_language::Iso639LanguageDescriptor;
    use crate::descriptor::teletext::TeletextDescriptor;
    use crate::error::ConfigurationError;
    use crate::psi::test::{packetise, with_crc};
    use crate::psi::TableAssembler;
    use assert_matches::assert_matches;
    use hex_literal::*;

    // program 1, version 0, PCR on 0x101, registration descriptor 'CUEI',
    // H.264 on 0x101, MPEG audio on 0x102 with language 'eng', teletext on 0x103
    pub(crate) const PMT: [u8; 46] = hex!(
        "02b02f 0001 c1 00 00
         e101 f006 050443554549
         1b e101 f000
         04 e102 f006 0a04656e6700
         06 e103 f007 5605656e670988"
    );

    fn decode(section: &[u8], program_number: u16) -> Vec<Table> {
        let mut a = TableAssembler::new(Pid::new(0x100), PmtSyntax::new(program_number), true);
        packetise(0x100, 0, &with_crc(section))
            .iter()
            .flat_map(|pk| a.push(pk).unwrap())
            .map(|c| c.table)
            .collect()
    }

    #[test]
    fn streams_and_descriptors() {
        let tables = decode(&PMT, 1);
        assert_eq!(tables.len(), 1);
        assert_matches!(tables[0], Table::Pmt(ref pmt) => {
            assert_eq!(pmt.program_number, 1);
            assert_eq!(pmt.pcr_pid, Pid::new(0x101));
            assert_eq!(pmt.descriptors().len(), 1);
            assert_eq!(pmt.descriptors()[0].tag, 0x05);
            let types: Vec<_> = pmt.elementary_streams.iter().map(|s| s.stream_type).collect();
            assert_eq!(
                types,
                vec![StreamType::H264, StreamType::Iso138183Audio, StreamType::H2220PesPrivateData]
            );
            let audio = pmt.streams_of_type(StreamType::Iso138183Audio).next().unwrap();
            assert_eq!(audio.elementary_pid, Pid::new(0x102));
            let lang = audio.descriptor::<Iso639LanguageDescriptor>().unwrap();
            assert_eq!(lang.languages[0].code, "eng");
            let ttx = pmt.elementary_streams[2].descriptor::<TeletextDescriptor>().unwrap();
            assert_eq!(ttx.languages[0].page(), 188);
            assert!(pmt.elementary_streams[0].descriptor_by_tag(0x0a).is_none());
        });
    }

    #[test]
    fn other_program_is_skipped() {
        assert!(decode(&PMT, 2).is_empty());
    }

    #[test]
    fn es_info_length_overrun() {
        let mut bad = PMT;
        // first ES_info_length claims more bytes than remain
        bad[22] = 0xff;
        assert!(decode(&bad, 1).is_empty());
    }

    #[test]
    fn program_info_length_overrun() {
        let mut bad = PMT;
        bad[11] = 0x60;
        assert!(decode(&bad, 1).is_empty());
    }

    #[test]
    fn bound_to_one_pid() {
        let mut a = TableAssembler::new(Pid::new(0x20), PmtSyntax::new(1), true);
        let pk = &packetise(0x21, 0, &with_crc(&PMT))[0];
        assert_matches!(
            a.push(pk),
            Err(ConfigurationError::PidMismatch { .. })
        );
    }
}
