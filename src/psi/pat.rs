//! Types related to the _Program Association Table_

use super::{SectionCommonHeader, Table, TableHeader, TableSyntax, TableSyntaxHeader};
use crate::error::TableError;
use crate::packet::Pid;
use std::sync::Arc;

/// `table_id` of a `program_association_section`
pub const TABLE_ID: u8 = 0x00;

/// One entry of the PAT's program loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramDescriptor {
    /// `program_number` zero gives the PID of the Network Information Table
    Network { pid: Pid },
    Program { program_number: u16, pid: Pid },
}

impl ProgramDescriptor {
    pub const SIZE: usize = 4;

    /// Decodes the first `SIZE` bytes of `data`, which must be at least that long.
    pub fn from_bytes(data: &[u8]) -> ProgramDescriptor {
        let program_number = (u16::from(data[0]) << 8) | u16::from(data[1]);
        let pid = Pid::from_bytes(data[2], data[3]);
        if program_number == 0 {
            ProgramDescriptor::Network { pid }
        } else {
            ProgramDescriptor::Program {
                program_number,
                pid,
            }
        }
    }

    pub fn pid(&self) -> Pid {
        match *self {
            ProgramDescriptor::Network { pid } => pid,
            ProgramDescriptor::Program { pid, .. } => pid,
        }
    }
}

/// The _Program Association Table_ gives the PID of the Program Map Table for each program
/// within a transport stream.  There may be only one program, or in the case of a broadcast
/// multiplex, there may be many.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramAssociationTable {
    pub header: TableHeader,
    pub transport_stream_id: u16,
    /// program numbers, in the order they appear in the section
    pub program_numbers: Vec<u16>,
    /// PMT PIDs, index-aligned with `program_numbers`
    pub pmt_pids: Vec<Pid>,
    /// PID of the Network Information Table, if the PAT names one
    pub network_pid: Option<Pid>,
}

impl ProgramAssociationTable {
    /// Iterate over `(program_number, pmt_pid)` pairs.
    pub fn programs(&self) -> impl Iterator<Item = (u16, Pid)> + '_ {
        self.program_numbers
            .iter()
            .copied()
            .zip(self.pmt_pids.iter().copied())
    }

    /// The PMT PID for the given program.
    pub fn pmt_pid(&self, program_number: u16) -> Option<Pid> {
        self.programs()
            .find(|&(p, _)| p == program_number)
            .map(|(_, pid)| pid)
    }
}

#[derive(Default)]
pub struct PatSyntax;

impl TableSyntax for PatSyntax {
    const NAME: &'static str = "PAT";

    fn accepts(&self, common: &SectionCommonHeader, _syntax: &TableSyntaxHeader<'_>) -> bool {
        common.table_id == TABLE_ID
    }

    fn section(&mut self, header: TableHeader, body: &[u8]) -> Result<Table, TableError> {
        if body.len() % ProgramDescriptor::SIZE != 0 {
            return Err(TableError::LoopOverrun {
                field: "program loop",
                length: body.len(),
                available: body.len() - body.len() % ProgramDescriptor::SIZE,
            });
        }
        let mut pat = ProgramAssociationTable {
            transport_stream_id: header.id,
            header,
            program_numbers: Vec::new(),
            pmt_pids: Vec::new(),
            network_pid: None,
        };
        for entry in body.chunks_exact(ProgramDescriptor::SIZE) {
            match ProgramDescriptor::from_bytes(entry) {
                ProgramDescriptor::Network { pid } => pat.network_pid = Some(pid),
                ProgramDescriptor::Program {
                    program_number,
                    pid,
                } => {
                    pat.program_numbers.push(program_number);
                    pat.pmt_pids.push(pid);
                }
            }
        }
        Ok(Table::Pat(Arc::new(pat)))
    }
}
