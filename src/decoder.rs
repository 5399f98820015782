//! Routes the packets of a transport stream to table assemblers, and publishes the tables
//! they produce.
//!
//! PID `0x0000` carries the PAT and PID `0x0011` the SDT.  The PMT PIDs are learned from the
//! PAT, and whenever a new PAT version arrives every PMT and SDT assembler is discarded and
//! rebuilt, so that tables from two generations of the stream are never mixed.
//!
//! Published tables are reachable through a [`TableView`](struct.TableView.html), which can
//! be cloned and handed to another thread.

use crate::descriptor::service::ServiceDescriptor;
use crate::descriptor::{Descriptor, DescriptorVariant};
use crate::error::ConfigurationError;
use crate::packet::{Pid, TsPacket};
use crate::psi::pat::{PatSyntax, ProgramAssociationTable};
use crate::psi::pmt::{PmtSyntax, ProgramMapTable};
use crate::psi::sdt::{SdtSyntax, ServiceDescriptionTable};
use crate::psi::{Table, TableAssembler, TableChange};
use crate::StreamType;
use fixedbitset::FixedBitSet;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Options for table decoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Drop sections whose `CRC_32` does not match their contents
    pub verify_crc: bool,
    /// Also decode SDT sections describing other transport streams (`table_id` 0x46)
    pub accept_sdt_other: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            verify_crc: true,
            accept_sdt_other: false,
        }
    }
}

#[derive(Debug, Default)]
struct Published {
    pat: Option<Arc<ProgramAssociationTable>>,
    pmts: BTreeMap<u16, Arc<ProgramMapTable>>,
    sdt: Option<Arc<ServiceDescriptionTable>>,
    /// number of programs listed in the current PAT
    expected_programs: usize,
}

/// Read access to the most recently published tables.
///
/// Each query takes the lock briefly and returns owned data (usually an `Arc`), so results
/// stay valid while the decoder carries on publishing.
#[derive(Clone, Default)]
pub struct TableView {
    published: Arc<Mutex<Published>>,
}

impl TableView {
    fn lock(&self) -> MutexGuard<'_, Published> {
        self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pat(&self) -> Option<Arc<ProgramAssociationTable>> {
        self.lock().pat.clone()
    }

    pub fn sdt(&self) -> Option<Arc<ServiceDescriptionTable>> {
        self.lock().sdt.clone()
    }

    /// The published PMTs, ordered by program number.
    pub fn program_map_tables(&self) -> Vec<Arc<ProgramMapTable>> {
        self.lock().pmts.values().cloned().collect()
    }

    /// The PMT of the given program; or, when no program is given, that of the lowest numbered
    /// program.
    ///
    /// Without a program number, nothing is returned until a PMT has been published for every
    /// program of the PAT, so that the choice does not change as further PMTs arrive.
    pub fn selected_pmt(&self, program_number: Option<u16>) -> Option<Arc<ProgramMapTable>> {
        let published = self.lock();
        match program_number {
            Some(program_number) => published.pmts.get(&program_number).cloned(),
            None => {
                if published.expected_programs == 0
                    || published.pmts.len() != published.expected_programs
                {
                    return None;
                }
                published.pmts.values().next().cloned()
            }
        }
    }

    /// The `service_descriptor` of the SDT entry whose `service_id` equals `program_number`.
    pub fn service_descriptor_for_program(&self, program_number: u16) -> Option<ServiceDescriptor> {
        let sdt = self.sdt()?;
        sdt.item(program_number)?.service_descriptor().cloned()
    }

    /// Searches the elementary streams of the selected PMT (see
    /// [`selected_pmt()`](#method.selected_pmt)) for the first one of type `stream_type`
    /// carrying a descriptor with the given tag.
    pub fn descriptor_for_program_by_tag(
        &self,
        program_number: Option<u16>,
        stream_type: StreamType,
        tag: u8,
    ) -> Option<Descriptor> {
        let pmt = self.selected_pmt(program_number)?;
        let found = pmt
            .streams_of_type(stream_type)
            .find_map(|s| s.descriptor_by_tag(tag))
            .cloned();
        found
    }

    /// As [`descriptor_for_program_by_tag()`](#method.descriptor_for_program_by_tag), with
    /// the tag and the returned payload given by `T`.
    pub fn descriptor_for_program<T: DescriptorVariant + Clone>(
        &self,
        program_number: Option<u16>,
        stream_type: StreamType,
    ) -> Option<T> {
        let pmt = self.selected_pmt(program_number)?;
        let found = pmt
            .streams_of_type(stream_type)
            .find_map(|s| s.descriptor::<T>())
            .cloned();
        found
    }
}

/// Rebuilds the PAT, PMTs and SDT of a transport stream from its packets.
pub struct StreamDecoder {
    config: DecoderConfig,
    pat: TableAssembler<PatSyntax>,
    sdt: TableAssembler<SdtSyntax>,
    pmts: HashMap<Pid, Vec<TableAssembler<PmtSyntax>>>,
    pmt_pids: FixedBitSet,
    view: TableView,
}

impl StreamDecoder {
    pub fn new(config: DecoderConfig) -> StreamDecoder {
        StreamDecoder {
            pat: TableAssembler::new(Pid::PAT, PatSyntax, config.verify_crc),
            sdt: Self::sdt_assembler(&config),
            pmts: HashMap::new(),
            pmt_pids: FixedBitSet::with_capacity(Pid::PID_COUNT),
            view: TableView::default(),
            config,
        }
    }

    fn sdt_assembler(config: &DecoderConfig) -> TableAssembler<SdtSyntax> {
        TableAssembler::new(
            Pid::SDT,
            SdtSyntax::new(config.accept_sdt_other),
            config.verify_crc,
        )
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// A handle on the published tables, usable from other threads.
    pub fn view(&self) -> TableView {
        self.view.clone()
    }

    /// Is `pid` listed in the current PAT as carrying a PMT?
    pub fn is_pmt_pid(&self, pid: Pid) -> bool {
        self.pmt_pids.contains(usize::from(pid))
    }

    /// Feeds one packet to whichever assembler handles its PID, publishing and returning any
    /// tables it completes.  Packets of other PIDs are ignored.
    pub fn add_packet(&mut self, pk: &TsPacket) -> Result<Vec<TableChange>, ConfigurationError> {
        let changes = if pk.pid == Pid::PAT {
            self.pat.push(pk)?
        } else if pk.pid == Pid::SDT {
            self.sdt.push(pk)?
        } else if self.is_pmt_pid(pk.pid) {
            let mut changes = Vec::new();
            if let Some(assemblers) = self.pmts.get_mut(&pk.pid) {
                for assembler in assemblers.iter_mut() {
                    changes.extend(assembler.push(pk)?);
                }
            }
            changes
        } else {
            return Ok(Vec::new());
        };
        for change in &changes {
            self.publish(&change.table);
        }
        Ok(changes)
    }

    fn publish(&mut self, table: &Table) {
        match table {
            Table::Pat(pat) => self.new_generation(pat),
            Table::Pmt(pmt) => {
                let mut published = self.view.lock();
                published.pmts.insert(pmt.program_number, pmt.clone());
            }
            Table::Sdt(sdt) => {
                self.view.lock().sdt = Some(sdt.clone());
            }
        }
    }

    fn new_generation(&mut self, pat: &Arc<ProgramAssociationTable>) {
        let previous = self.view.pat();
        if let Some(ref previous) = previous {
            info!(
                "PAT version {} replaces version {}, discarding {} PMT PIDs and SDT",
                pat.header.version,
                previous.header.version,
                self.pmts.len()
            );
        }
        self.pmts.clear();
        self.pmt_pids.clear();
        self.sdt = Self::sdt_assembler(&self.config);
        let mut programs = BTreeSet::new();
        for (program_number, pid) in pat.programs() {
            if !programs.insert(program_number) {
                warn!("program {} listed more than once in PAT", program_number);
                continue;
            }
            debug!("program {} has PMT on {:?}", program_number, pid);
            self.pmt_pids.insert(usize::from(pid));
            self.pmts
                .entry(pid)
                .or_default()
                .push(TableAssembler::new(
                    pid,
                    PmtSyntax::new(program_number),
                    self.config.verify_crc,
                ));
        }

        let mut published = self.view.lock();
        published.pat = Some(pat.clone());
        published.pmts.clear();
        published.sdt = None;
        published.expected_programs = programs.len();
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        StreamDecoder::new(DecoderConfig::default())
    }
}
