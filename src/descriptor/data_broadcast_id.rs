use super::{DescriptorError, DescriptorVariant};

/// `data_broadcast_id_descriptor`: identifies the data broadcast specification used by a
/// component, such as `0x0106` for MHEG-5 or `0x0123` for HbbTV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBroadcastIdDescriptor {
    pub data_broadcast_id: u16,
    /// `id_selector_byte`s, whose syntax depends on `data_broadcast_id`
    pub selector: Vec<u8>,
}

impl DataBroadcastIdDescriptor {
    pub fn new(buf: &[u8]) -> Result<DataBroadcastIdDescriptor, DescriptorError> {
        if buf.len() < 2 {
            return Err(DescriptorError::NotEnoughData {
                tag: Self::TAG,
                actual: buf.len(),
                expected: 2,
            });
        }
        Ok(DataBroadcastIdDescriptor {
            data_broadcast_id: u16::from(buf[0]) << 8 | u16::from(buf[1]),
            selector: buf[2..].to_vec(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn hbbtv() {
        let d = DataBroadcastIdDescriptor::new(&[0x01, 0x23, 0x00, 0x01]).unwrap();
        assert_eq!(d.data_broadcast_id, 0x0123);
        assert_eq!(d.selector, vec![0x00, 0x01]);
        assert_matches!(
            DataBroadcastIdDescriptor::new(&[0x01]),
            Err(DescriptorError::NotEnoughData { tag: 0x66, .. })
        );
    }
}
