//! Types related to the DVB _Service Description Table_
//!
//! The SDT describes the services (channels) of a transport stream.  Unlike the PAT and PMT,
//! one version of the table is commonly split over several sections, so the items of each
//! section are aggregated until the version changes.

use super::{SectionCommonHeader, Table, TableHeader, TableSyntax, TableSyntaxHeader};
use crate::descriptor::service::ServiceDescriptor;
use crate::descriptor::{self, Descriptor, DescriptorVariant};
use crate::error::TableError;
use fixedbitset::FixedBitSet;
use log::debug;
use std::sync::Arc;

/// `table_id` of a `service_description_section` describing the actual transport stream
pub const TABLE_ID_ACTUAL: u8 = 0x42;
/// `table_id` of a `service_description_section` describing some other transport stream
pub const TABLE_ID_OTHER: u8 = 0x46;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningStatus {
    Undefined,
    NotRunning,
    StartsInAFewSeconds,
    Pausing,
    Running,
    ServiceOffAir,
    Reserved(u8),
}
impl From<u8> for RunningStatus {
    fn from(v: u8) -> Self {
        match v {
            0 => RunningStatus::Undefined,
            1 => RunningStatus::NotRunning,
            2 => RunningStatus::StartsInAFewSeconds,
            3 => RunningStatus::Pausing,
            4 => RunningStatus::Running,
            5 => RunningStatus::ServiceOffAir,
            _ => RunningStatus::Reserved(v),
        }
    }
}

/// One service described by the SDT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdtItem {
    /// equal to the `program_number` of the service's PMT
    pub service_id: u16,
    /// EIT schedule information for the service is present in the stream
    pub eit_schedule: bool,
    /// EIT present/following information for the service is present in the stream
    pub eit_present_following: bool,
    pub running_status: RunningStatus,
    /// one or more component streams are scrambled
    pub free_ca_mode: bool,
    pub descriptors: Vec<Descriptor>,
}

impl SdtItem {
    const HEADER_SIZE: usize = 5;

    fn from_bytes(data: &[u8]) -> Result<(SdtItem, usize), TableError> {
        if data.len() < Self::HEADER_SIZE {
            return Err(TableError::LoopOverrun {
                field: "service entry",
                length: Self::HEADER_SIZE,
                available: data.len(),
            });
        }
        let descriptors_loop_length =
            (usize::from(data[3] & 0b0000_1111) << 8) | usize::from(data[4]);
        let end = Self::HEADER_SIZE + descriptors_loop_length;
        if end > data.len() {
            return Err(TableError::LoopOverrun {
                field: "descriptors_loop_length",
                length: descriptors_loop_length,
                available: data.len() - Self::HEADER_SIZE,
            });
        }
        let item = SdtItem {
            service_id: u16::from(data[0]) << 8 | u16::from(data[1]),
            eit_schedule: data[2] & 0b10 != 0,
            eit_present_following: data[2] & 0b01 != 0,
            running_status: RunningStatus::from(data[3] >> 5),
            free_ca_mode: data[3] & 0b0001_0000 != 0,
            descriptors: descriptor::decode_loop(&data[Self::HEADER_SIZE..end])?,
        };
        Ok((item, end))
    }

    /// The first descriptor of type `T` describing this service.
    pub fn descriptor<T: DescriptorVariant>(&self) -> Option<&T> {
        descriptor::find(&self.descriptors)
    }

    /// The `service_descriptor` giving this service's name, if present.
    pub fn service_descriptor(&self) -> Option<&ServiceDescriptor> {
        self.descriptor::<ServiceDescriptor>()
    }
}

/// The services gathered from the sections of one SDT version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptionTable {
    /// header of the most recently received section
    pub header: TableHeader,
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    /// items of every section received so far, in order of arrival
    pub items: Vec<SdtItem>,
    /// every section from `0` to `last_section_number` has been received
    pub complete: bool,
}

impl ServiceDescriptionTable {
    pub fn item(&self, service_id: u16) -> Option<&SdtItem> {
        self.items.iter().find(|i| i.service_id == service_id)
    }
}

/// Aggregates SDT sections.
///
/// The set of completed section numbers and the aggregated items are cleared whenever a
/// section with a new version (or a different `transport_stream_id`) arrives.
pub struct SdtSyntax {
    accept_other: bool,
    current: Option<(u16, u8)>,
    completed: FixedBitSet,
    items: Vec<SdtItem>,
}

impl SdtSyntax {
    const HEADER_SIZE: usize = 3;

    /// When `accept_other` is `false`, only sections describing the actual transport stream
    /// (`table_id` 0x42) are decoded.
    pub fn new(accept_other: bool) -> SdtSyntax {
        SdtSyntax {
            accept_other,
            current: None,
            completed: FixedBitSet::with_capacity(256),
            items: Vec::new(),
        }
    }

    /// Section numbers received for the current version.
    pub fn completed_sections(&self) -> impl Iterator<Item = usize> + '_ {
        self.completed.ones()
    }
}

impl Default for SdtSyntax {
    fn default() -> Self {
        SdtSyntax::new(false)
    }
}

impl TableSyntax for SdtSyntax {
    const NAME: &'static str = "SDT";

    fn accepts(&self, common: &SectionCommonHeader, _syntax: &TableSyntaxHeader<'_>) -> bool {
        common.table_id == TABLE_ID_ACTUAL
            || (self.accept_other && common.table_id == TABLE_ID_OTHER)
    }

    fn is_redundant(&self, syntax: &TableSyntaxHeader<'_>, _published_version: Option<u8>) -> bool {
        self.current == Some((syntax.id(), syntax.version()))
            && self.completed.contains(usize::from(syntax.section_number()))
    }

    fn section(&mut self, header: TableHeader, body: &[u8]) -> Result<Table, TableError> {
        if body.len() < Self::HEADER_SIZE {
            return Err(TableError::SectionTooShort {
                table: Self::NAME,
                actual: body.len(),
                expected: Self::HEADER_SIZE,
            });
        }
        let original_network_id = u16::from(body[0]) << 8 | u16::from(body[1]);
        let mut new_items = Vec::new();
        let mut rest = &body[Self::HEADER_SIZE..];
        while !rest.is_empty() {
            let (item, size) = SdtItem::from_bytes(rest)?;
            new_items.push(item);
            rest = &rest[size..];
        }

        let key = (header.id, header.version);
        if self.current != Some(key) {
            if self.current.is_some() {
                debug!(
                    "SDT for transport_stream_id {} now version {}",
                    header.id, header.version
                );
            }
            self.current = Some(key);
            self.completed.clear();
            self.items.clear();
        }
        self.completed.insert(usize::from(header.section_number));
        self.items.extend(new_items);
        let complete =
            (0..=usize::from(header.last_section_number)).all(|n| self.completed.contains(n));
        Ok(Table::Sdt(Arc::new(ServiceDescriptionTable {
            transport_stream_id: header.id,
            header,
            original_network_id,
            items: self.items.clone(),
            complete,
        })))
    }

    fn reset(&mut self) {
        self.current = None;
        self.completed.clear();
        self.items.clear();
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::packet::Pid;
    use crate::psi::test::{packetise, with_crc};
    use crate::psi::TableAssembler;
    use hex_literal::*;

    /// Builds an SDT section (with CRC) listing the given services, each with a
    /// `service_descriptor`.
    pub(crate) fn sdt_section(
        version: u8,
        section_number: u8,
        last_section_number: u8,
        services: &[(u16, &str)],
    ) -> Vec<u8> {
        let mut body = vec![0x23, 0x3a, 0xff];
        for (service_id, name) in services {
            let desc_len = 2 + 3 + name.len();
            body.extend_from_slice(&service_id.to_be_bytes());
            body.push(0xfd);
            body.push(0x80 | (desc_len >> 8) as u8);
            body.push(desc_len as u8);
            body.extend_from_slice(&[0x48, (3 + name.len()) as u8, 0x01, 0x00, name.len() as u8]);
            body.extend_from_slice(name.as_bytes());
        }
        let section_length = 5 + body.len() + 4;
        let mut section = vec![
            TABLE_ID_ACTUAL,
            0xf0 | (section_length >> 8) as u8,
            section_length as u8,
            0x40,
            0x84,
            0xc1 | (version << 1),
            section_number,
            last_section_number,
        ];
        section.extend_from_slice(&body);
        with_crc(&section)
    }

    fn assemble(
        a: &mut TableAssembler<SdtSyntax>,
        section: &[u8],
    ) -> Vec<Arc<ServiceDescriptionTable>> {
        packetise(0x11, 0, section)
            .iter()
            .flat_map(|pk| a.push(pk).unwrap())
            .map(|c| match c.table {
                Table::Sdt(sdt) => sdt,
                other => panic!("unexpected {:?}", other),
            })
            .collect()
    }

    #[test]
    fn broadcast_sample() {
        // captured from a UK DVB-T2 multiplex; the section spans two packets
        let section = hex!(
            "42f13040 84e90000 233aff44 40ff8026
            480d1900 0a424243 2054574f 20484473
            0c66702e 6262632e 636f2e75 6b5f0400
            00233a7e 01f744c4 ff802148 09190006
            49545620 4844730b 7777772e 6974762e
            636f6d5f 04000023 3a7e01f7 4500ff80
            2c480f19 000c4368 616e6e65 6c203420
            48447310 7777772e 6368616e 6e656c34
            2e636f6d 5f040000 233a7e01 f74484ff
            8026480d 19000a42 4243204f 4e452048
            44730c66 702e6262 632e636f 2e756b5f
            04000023 3a7e01f7 46c0ff80 23480a19
            00074342 42432048 44730c66 702e6262
            632e636f 2e756b5f 04000023 3a7e01f7
            4f80ff80 1e480a16 00074669 6c6d342b
            31731077 77772e63 68616e6e 656c342e
            636f6d45 40ff8027 480f1900 0c436861
            6e6e656c 20352048 44730b77 77772e66
            6976652e 74765f04 0000233a 7e01f7f2
            8b26c4"
        );
        let mut a = TableAssembler::new(Pid::SDT, SdtSyntax::default(), true);
        let tables = assemble(&mut a, &section);
        assert_eq!(tables.len(), 1);
        let sdt = &tables[0];
        assert_eq!(sdt.transport_stream_id, 0x4084);
        assert_eq!(sdt.original_network_id, 0x233a);
        assert_eq!(sdt.header.version, 20);
        assert!(sdt.complete);
        let names: Vec<_> = sdt
            .items
            .iter()
            .map(|i| i.service_descriptor().unwrap().service_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "BBC TWO HD",
                "ITV HD",
                "Channel 4 HD",
                "BBC ONE HD",
                "CBBC HD",
                "Film4+1",
                "Channel 5 HD"
            ]
        );
        let film4 = sdt.item(0x4f80).unwrap();
        assert_eq!(film4.running_status, RunningStatus::Running);
        assert!(film4.eit_schedule);
        assert!(film4.eit_present_following);
        assert!(!film4.free_ca_mode);
        assert_eq!(film4.service_descriptor().unwrap().service_type, 0x16);
    }

    #[test]
    fn sections_are_aggregated() {
        let mut a = TableAssembler::new(Pid::SDT, SdtSyntax::default(), true);
        let first = assemble(&mut a, &sdt_section(1, 0, 1, &[(1, "One")]));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].items.len(), 1);
        assert!(!first[0].complete);

        let second = assemble(&mut a, &sdt_section(1, 1, 1, &[(2, "Two"), (3, "Three")]));
        assert_eq!(second.len(), 1);
        let sdt = &second[0];
        let ids: Vec<_> = sdt.items.iter().map(|i| i.service_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(sdt.complete);
        let name = sdt
            .item(3)
            .and_then(|i| i.service_descriptor())
            .map(|d| d.service_name.as_str());
        assert_eq!(name, Some("Three"));
        assert_eq!(a.syntax().completed_sections().collect::<Vec<_>>(), vec![0, 1]);

        // repeats of either section are not republished
        assert!(assemble(&mut a, &sdt_section(1, 0, 1, &[(1, "One")])).is_empty());
        assert!(assemble(&mut a, &sdt_section(1, 1, 1, &[(2, "Two"), (3, "Three")])).is_empty());

        let bumped = assemble(&mut a, &sdt_section(2, 0, 1, &[(1, "Uno")]));
        assert_eq!(bumped.len(), 1);
        assert_eq!(bumped[0].items.len(), 1);
        assert_eq!(bumped[0].items[0].service_descriptor().unwrap().service_name, "Uno");
        assert!(!bumped[0].complete);
        assert_eq!(a.syntax().completed_sections().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn other_transport_stream_ignored_by_default() {
        let mut section = sdt_section(0, 0, 0, &[(1, "One")]);
        section[0] = TABLE_ID_OTHER;
        let n = section.len() - 4;
        let crc = crate::psi::section_crc(&section[..n]);
        section[n..].copy_from_slice(&crc.to_be_bytes());

        let mut a = TableAssembler::new(Pid::SDT, SdtSyntax::default(), true);
        assert!(assemble(&mut a, &section).is_empty());
        let mut a = TableAssembler::new(Pid::SDT, SdtSyntax::new(true), true);
        assert_eq!(assemble(&mut a, &section).len(), 1);
    }

    #[test]
    fn descriptor_loop_overrun() {
        let mut section = sdt_section(0, 0, 0, &[(1, "One")]);
        // descriptors_loop_length of the only item
        section[15] = 0x40;
        let n = section.len() - 4;
        let crc = crate::psi::section_crc(&section[..n]);
        section[n..].copy_from_slice(&crc.to_be_bytes());
        let mut a = TableAssembler::new(Pid::SDT, SdtSyntax::default(), true);
        assert!(assemble(&mut a, &section).is_empty());
    }
}
