use super::{DescriptorError, DescriptorVariant};

/// `stream_identifier_descriptor`: labels a component stream so that EIT component
/// descriptors can refer to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamIdentifierDescriptor {
    pub component_tag: u8,
}

impl StreamIdentifierDescriptor {
    pub fn new(buf: &[u8]) -> Result<StreamIdentifierDescriptor, DescriptorError> {
        match buf.first() {
            Some(&component_tag) => Ok(StreamIdentifierDescriptor { component_tag }),
            None => Err(DescriptorError::NotEnoughData {
                tag: Self::TAG,
                actual: 0,
                expected: 1,
            }),
        }
    }
}
