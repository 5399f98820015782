//! Error types shared across the crate.
//!
//! Errors fall into two groups.  `PacketError` and `TableError` describe damaged stream data
//! and are expected on live feeds: callers skip the affected buffer or section and carry on.
//! `ConfigurationError` describes incorrect wiring of the decoder itself and should be surfaced
//! immediately.

use crate::descriptor::DescriptorError;
use crate::packet::Pid;
use crate::pes::TimestampError;
use thiserror::Error;

/// A transport stream packet that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// A packet expected at this offset did not start with `0x47`.
    #[error("sync byte missing at offset {offset} (found {found:#04x})")]
    SyncByteMissing {
        /// Offset of the packet within the buffer
        offset: usize,
        /// The byte found where the sync byte should be
        found: u8,
    },

    /// The buffer handed to the single-packet parser was not 188 bytes.
    #[error("packet buffer has {actual} bytes, expected 188")]
    WrongPacketSize {
        /// Size of the buffer actually supplied
        actual: usize,
    },

    /// The `adaptation_field_length` does not fit within the packet.
    #[error("adaptation_field_length {length} exceeds limit {limit} on {pid:?}")]
    AdaptationFieldTooLong {
        /// PID of the offending packet
        pid: Pid,
        /// The declared adaptation field length
        length: usize,
        /// Largest value allowed for this packet's adaptation control
        limit: usize,
    },

    /// A PTS or DTS field in a PES header violated the timestamp syntax.
    #[error("invalid PES timestamp on {pid:?}: {source}")]
    Timestamp {
        /// PID of the offending packet
        pid: Pid,
        /// Details of the violation
        #[source]
        source: TimestampError,
    },

    /// The optional PES header did not have the expected structure.
    #[error("malformed PES header on {pid:?}: {reason}")]
    PesHeader {
        /// PID of the offending packet
        pid: Pid,
        /// What was wrong
        reason: &'static str,
    },
}

/// A PSI section that could not be turned into a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// The `pointer_field` points past the end of the packet payload.
    #[error("pointer_field {pointer} beyond payload of {available} bytes")]
    PointerBeyondPayload {
        /// The pointer_field value
        pointer: usize,
        /// Payload bytes available after the pointer_field
        available: usize,
    },

    /// The section does not have room for its fixed fields.
    #[error("{table} section too short: {actual} bytes, at least {expected} required")]
    SectionTooShort {
        /// Name of the table being decoded
        table: &'static str,
        /// Bytes actually present
        actual: usize,
        /// Minimum number of bytes required
        expected: usize,
    },

    /// `section_length` was zero, too small for the syntax header or above the 1021 limit.
    #[error("section_length {0} out of range")]
    SectionLengthOutOfRange(usize),

    /// The section syntax indicator was clear on a table that requires it.
    #[error("section_syntax_indicator not set for table_id {0:#04x}")]
    MissingSectionSyntax(u8),

    /// The CRC_32 at the end of the section did not match the section data.
    #[error("CRC mismatch for table_id {table_id:#04x}: expected {expected:#010x}, computed {actual:#010x}")]
    CrcMismatch {
        /// Table id of the damaged section
        table_id: u8,
        /// CRC carried in the section
        expected: u32,
        /// CRC computed over the section
        actual: u32,
    },

    /// A length field inside the section points past the end of its enclosing structure.
    #[error("{field} of {length} bytes overruns the {available} bytes remaining")]
    LoopOverrun {
        /// The length field at fault
        field: &'static str,
        /// Declared length
        length: usize,
        /// Bytes remaining in the enclosing structure
        available: usize,
    },

    /// A descriptor inside the section could not be decoded.
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
}

/// The decoder was wired incorrectly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// An assembler bound to one PID was given a packet from another.
    #[error("assembler bound to {bound:?} received packet for {actual:?}")]
    PidMismatch {
        /// The PID the assembler was created for
        bound: Pid,
        /// The PID of the packet that was supplied
        actual: Pid,
    },
}
