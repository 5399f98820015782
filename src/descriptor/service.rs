//! DVB service and service list descriptors, found in the SDT and NIT respectively.

use super::text::decode_text;
use super::{DescriptorError, DescriptorVariant};
use log::warn;

/// `service_descriptor`: the name and kind of a service, and the name of its provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// `service_type`, e.g. `0x01` digital television, `0x02` digital radio, `0x19` HD television
    pub service_type: u8,
    pub provider_name: String,
    pub service_name: String,
}

impl ServiceDescriptor {
    /// Decode the descriptor payload.
    pub fn new(buf: &[u8]) -> Result<ServiceDescriptor, DescriptorError> {
        let not_enough = |expected| DescriptorError::NotEnoughData {
            tag: Self::TAG,
            actual: buf.len(),
            expected,
        };
        if buf.len() < 2 {
            return Err(not_enough(2));
        }
        let service_type = buf[0];
        let provider_end = 2 + buf[1] as usize;
        // room for the provider name plus the service_name_length byte
        if provider_end + 1 > buf.len() {
            return Err(not_enough(provider_end + 1));
        }
        let provider_name = decode_text(&buf[2..provider_end]);
        let service_end = provider_end + 1 + buf[provider_end] as usize;
        if service_end > buf.len() {
            return Err(not_enough(service_end));
        }
        Ok(ServiceDescriptor {
            service_type,
            provider_name,
            service_name: decode_text(&buf[provider_end + 1..service_end]),
        })
    }
}

/// One entry in a `service_list_descriptor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceListEntry {
    pub service_id: u16,
    pub service_type: u8,
}

/// `service_list_descriptor`: the services carried in a transport stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceListDescriptor {
    pub services: Vec<ServiceListEntry>,
}

impl ServiceListDescriptor {
    const ENTRY_SIZE: usize = 3;

    /// Decode the descriptor payload.  A trailing partial entry is ignored.
    pub fn new(buf: &[u8]) -> Result<ServiceListDescriptor, DescriptorError> {
        let entries = buf.chunks_exact(Self::ENTRY_SIZE);
        if !entries.remainder().is_empty() {
            warn!(
                "service_list_descriptor has {} trailing bytes",
                entries.remainder().len()
            );
        }
        Ok(ServiceListDescriptor {
            services: entries
                .map(|e| ServiceListEntry {
                    service_id: u16::from(e[0]) << 8 | u16::from(e[1]),
                    service_type: e[2],
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::super::{decode, DescriptorBody};
    use super::*;
    use assert_matches::assert_matches;
    use hex_literal::*;

    #[test]
    fn service_name_without_provider() {
        // captured from a UK DVB-T multiplex
        let data = hex!("480d1900 0a424243 2054574f 204844");
        let (desc, next) = decode(&data, 0).unwrap();
        assert_eq!(next, data.len());
        assert_matches!(desc.body, DescriptorBody::Service(ref s) => {
            assert_eq!(s.service_type, 0x19);
            assert_eq!(s.provider_name, "");
            assert_eq!(s.service_name, "BBC TWO HD");
        });
    }

    #[test]
    fn provider_and_service() {
        let d = ServiceDescriptor::new(&hex!("01 03 425342 05 4e657773 8a")).unwrap();
        assert_eq!(d.provider_name, "BSB");
        assert_eq!(d.service_name, "News\r\n");
    }

    #[test]
    fn truncated_service_name() {
        assert_matches!(
            ServiceDescriptor::new(&hex!("01 00 05 4e65")),
            Err(DescriptorError::NotEnoughData {
                tag: 0x48,
                actual: 5,
                expected: 8
            })
        );
        assert_matches!(
            ServiceDescriptor::new(&hex!("01 04 4e65")),
            Err(DescriptorError::NotEnoughData { expected: 7, .. })
        );
    }

    #[test]
    fn service_list() {
        let data = hex!("4106 1041 01 1042 02");
        let (desc, _) = decode(&data, 0).unwrap();
        assert_matches!(desc.body, DescriptorBody::ServiceList(ref l) => {
            assert_eq!(
                l.services,
                vec![
                    ServiceListEntry { service_id: 0x1041, service_type: 1 },
                    ServiceListEntry { service_id: 0x1042, service_type: 2 },
                ]
            );
        });
    }
}
