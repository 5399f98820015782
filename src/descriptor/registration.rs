//! Registration descriptor indicates which kind of syntax any 'private data' within the transport
//! stream will be following

use super::{DescriptorError, DescriptorVariant};
use std::fmt;

/// Indicates which kind of syntax any 'private data' within the transport stream will be following
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationDescriptor {
    format_identifier: [u8; 4],
    /// bytes whose meaning is defined by the format identifier
    pub additional_identification_info: Vec<u8>,
}
impl RegistrationDescriptor {
    /// Decode the descriptor payload (the bytes following `descriptor_length`).
    pub fn new(buf: &[u8]) -> Result<RegistrationDescriptor, DescriptorError> {
        if buf.len() < 4 {
            Err(DescriptorError::NotEnoughData {
                tag: Self::TAG,
                actual: buf.len(),
                expected: 4,
            })
        } else {
            Ok(RegistrationDescriptor {
                format_identifier: [buf[0], buf[1], buf[2], buf[3]],
                additional_identification_info: buf[4..].to_vec(),
            })
        }
    }

    /// Format identifier value assigned by a _Registration Authority_.
    ///
    /// Values are usually four ASCII characters, such as `CUEI` for SCTE-35 splice information.
    pub fn format_identifier(&self) -> u32 {
        u32::from_be_bytes(self.format_identifier)
    }

    /// The format identifier's raw bytes.
    pub fn format_identifier_bytes(&self) -> &[u8; 4] {
        &self.format_identifier
    }

    /// true if the format identifier matches the given four bytes
    pub fn is_format(&self, id: &[u8; 4]) -> bool {
        &self.format_identifier == id
    }
}
impl fmt::Debug for RegistrationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("RegistrationDescriptor")
            .field(
                "format_identifier",
                &String::from_utf8_lossy(&self.format_identifier),
            )
            .field(
                "additional_identification_info",
                &format!("{:x?}", self.additional_identification_info),
            )
            .finish()
    }
}
