//! Splits a sequence of arbitrarily sized buffers into transport stream packets.
//!
//! Buffers read from a socket or file seldom end on a packet boundary.  `PacketReader` keeps
//! the trailing partial packet from one call and completes it with the start of the next, and
//! re-runs sync detection whenever a packet boundary is missing its sync byte.

use crate::error::PacketError;
use crate::packet::{self, TsPacket};
use log::warn;

/// Stateful front end to [`packet::parse_packets()`](../packet/fn.parse_packets.html).
#[derive(Default)]
pub struct PacketReader {
    remainder: Vec<u8>,
    skipped_bytes: u64,
}

impl PacketReader {
    pub fn new() -> PacketReader {
        PacketReader::default()
    }

    /// Decode all whole packets available after appending `buf` to any leftover bytes from the
    /// previous call.
    ///
    /// On error the pending bytes are dropped; the next call starts by resynchronising.
    pub fn push(&mut self, buf: &[u8]) -> Result<Vec<TsPacket>, PacketError> {
        let joined;
        let data: &[u8] = if self.remainder.is_empty() {
            buf
        } else {
            joined = [&self.remainder[..], buf].concat();
            &joined[..]
        };

        let mut packets = Vec::with_capacity(data.len() / TsPacket::SIZE);
        let mut offset = 0;
        while data.len() - offset >= TsPacket::SIZE {
            if !TsPacket::is_sync_byte(data[offset]) {
                let skip = packet::find_sync(&data[offset..]).unwrap_or(data.len() - offset);
                warn!("lost sync at offset {}, skipping {} bytes", offset, skip);
                self.skipped_bytes += skip as u64;
                offset += skip;
                continue;
            }
            match TsPacket::parse(&data[offset..offset + TsPacket::SIZE]) {
                Ok(pk) => packets.push(pk),
                Err(e) => {
                    self.remainder.clear();
                    return Err(e);
                }
            }
            offset += TsPacket::SIZE;
        }
        self.remainder = data[offset..].to_vec();
        Ok(packets)
    }

    /// Total number of bytes discarded while searching for sync.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped_bytes
    }

    /// Number of bytes held back waiting for the rest of their packet.
    pub fn pending(&self) -> usize {
        self.remainder.len()
    }

    /// Forget any partial packet, e.g. after the source has been reopened.
    pub fn reset(&mut self) {
        self.remainder.clear();
    }
}
