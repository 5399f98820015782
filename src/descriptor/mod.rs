//! Descriptors provide metadata about an element of a Transport Stream.
//!
//! For example, a descriptor may be used to specify the language of an audio track.  Use of
//! specific descriptors is often not mandatory (many streams do not describe the language of their
//! audio).
//!
//! The syntax of specific PSI tables often allows descriptors to be attached to the table
//! itself, or to entries within the table.
//!
//! Every descriptor is a tag-length-value record.  [`decode()`](fn.decode.html) dispatches on
//! the tag to one of a closed set of decoders; tags without a decoder produce
//! `DescriptorBody::Generic`, keeping only the tag and length.
//!
//! ```
//! # use mpeg2ts_monitor::descriptor::{self, DescriptorBody};
//! let data = [0x52, 0x01, 0x07, 0x0e, 0x00];
//! let (desc, next) = descriptor::decode(&data, 0).unwrap();
//! assert_eq!(next, 3);
//! if let DescriptorBody::StreamIdentifier(ref s) = desc.body {
//!     assert_eq!(s.component_tag, 7);
//! }
//! let (desc, next) = descriptor::decode(&data, next).unwrap();
//! assert_eq!((desc.tag, desc.length, next), (0x0e, 0, 5));
//! assert_eq!(desc.body, DescriptorBody::Generic);
//! ```

pub mod data_broadcast_id;
pub mod iso_639_language;
pub mod registration;
pub mod service;
pub mod stream_identifier;
pub mod subtitling;
pub mod teletext;
pub mod text;

use self::data_broadcast_id::DataBroadcastIdDescriptor;
use self::iso_639_language::Iso639LanguageDescriptor;
use self::registration::RegistrationDescriptor;
use self::service::{ServiceDescriptor, ServiceListDescriptor};
use self::stream_identifier::StreamIdentifierDescriptor;
use self::subtitling::SubtitlingDescriptor;
use self::teletext::TeletextDescriptor;
use thiserror::Error;

/// Implemented by each decoded descriptor payload type, linking it to its tag so that callers
/// can ask for a descriptor by type.
pub trait DescriptorVariant: Sized {
    /// The descriptor tag value which identifies this kind of descriptor
    const TAG: u8;

    /// Borrow the payload from `body` if it holds this variant.
    fn from_body(body: &DescriptorBody) -> Option<&Self>;
}

macro_rules! descriptor_body {
    (
        $(#[$outer:meta])*
        $name:ident {
            $(
                $(#[$inner:meta])*
                $case_name:ident $tag:literal => $t:ident
            ),*,
        }
    ) => {
        $(#[$outer])*
        pub enum $name {
            $(
                $(#[$inner])*
                $case_name($t),
            )*
            /// A tag with no dedicated decoder; only the tag and length are kept
            Generic,
        }
        impl $name {
            fn decode(tag: u8, payload: &[u8]) -> Result<$name, DescriptorError> {
                match tag {
                    $( $tag => Ok($name::$case_name($t::new(payload)?)), )*
                    _ => Ok($name::Generic),
                }
            }
        }
        $(
            impl DescriptorVariant for $t {
                const TAG: u8 = $tag;
                fn from_body(body: &$name) -> Option<&$t> {
                    match body {
                        $name::$case_name(d) => Some(d),
                        _ => None,
                    }
                }
            }
        )*
    }
}

descriptor_body! {
    /// The decoded payload of a descriptor.
    #[derive(Debug, Clone, PartialEq, Eq)]
    DescriptorBody {
        /// `registration_descriptor`, ISO/IEC 13818-1
        Registration 0x05 => RegistrationDescriptor,
        /// `ISO_639_language_descriptor`, ISO/IEC 13818-1
        Iso639Language 0x0a => Iso639LanguageDescriptor,
        /// `service_list_descriptor`, EN 300 468
        ServiceList 0x41 => ServiceListDescriptor,
        /// `service_descriptor`, EN 300 468
        Service 0x48 => ServiceDescriptor,
        /// `stream_identifier_descriptor`, EN 300 468
        StreamIdentifier 0x52 => StreamIdentifierDescriptor,
        /// `teletext_descriptor`, EN 300 468
        Teletext 0x56 => TeletextDescriptor,
        /// `subtitling_descriptor`, EN 300 468
        Subtitling 0x59 => SubtitlingDescriptor,
        /// `data_broadcast_id_descriptor`, EN 300 468
        DataBroadcastId 0x66 => DataBroadcastIdDescriptor,
    }
}

/// A single decoded descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// `descriptor_tag`
    pub tag: u8,
    /// `descriptor_length`, the number of payload bytes following the two header bytes
    pub length: u8,
    /// The payload, decoded according to `tag`
    pub body: DescriptorBody,
}

impl Descriptor {
    /// Borrow the payload as `T`, if this descriptor holds that variant.
    pub fn variant<T: DescriptorVariant>(&self) -> Option<&T> {
        T::from_body(&self.body)
    }
}

/// Returns the first descriptor in `descriptors` that holds variant `T`.
pub fn find<T: DescriptorVariant>(descriptors: &[Descriptor]) -> Option<&T> {
    descriptors.iter().find_map(|d| d.variant::<T>())
}

/// Decode the descriptor whose tag byte is at `bytes[offset]`, returning it together with the
/// offset of the byte following it (`offset + 2 + descriptor_length`).
pub fn decode(bytes: &[u8], offset: usize) -> Result<(Descriptor, usize), DescriptorError> {
    let buf = bytes.get(offset..).unwrap_or(&[]);
    if buf.len() < 2 {
        return Err(DescriptorError::BufferTooShort { buflen: buf.len() });
    }
    let tag = buf[0];
    let length = buf[1];
    let tag_end = 2 + length as usize;
    if tag_end > buf.len() {
        return Err(DescriptorError::TagTooLongForBuffer {
            taglen: length as usize,
            buflen: buf.len(),
        });
    }
    let body = DescriptorBody::decode(tag, &buf[2..tag_end])?;
    Ok((Descriptor { tag, length, body }, offset + tag_end))
}

/// Iterator over the descriptors in a descriptor loop.  After the first error, no further
/// items are produced.
pub struct DescriptorIter<'buf> {
    buf: &'buf [u8],
    offset: usize,
}
impl<'buf> DescriptorIter<'buf> {
    pub fn new(buf: &'buf [u8]) -> DescriptorIter<'buf> {
        DescriptorIter { buf, offset: 0 }
    }
}
impl<'buf> Iterator for DescriptorIter<'buf> {
    type Item = Result<Descriptor, DescriptorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.buf.len() {
            return None;
        }
        match decode(self.buf, self.offset) {
            Ok((desc, next)) => {
                self.offset = next;
                Some(Ok(desc))
            }
            Err(e) => {
                // ensure another call to next() will yield None,
                self.offset = self.buf.len();
                Some(Err(e))
            }
        }
    }
}

/// Decode a whole descriptor loop, failing if any descriptor in it is malformed.
pub fn decode_loop(buf: &[u8]) -> Result<Vec<Descriptor>, DescriptorError> {
    DescriptorIter::new(buf).collect()
}

/// Problems found while decoding a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The payload is shorter than the fixed fields of this descriptor type require.
    #[error("descriptor tag {tag:#04x} needs {expected} bytes, only {actual} present")]
    NotEnoughData {
        /// the descriptor tag
        tag: u8,
        /// bytes present
        actual: usize,
        /// bytes required
        expected: usize,
    },
    /// `descriptor_length` runs past the end of the descriptor loop.
    #[error("descriptor_length {taglen} too long for remaining {buflen} bytes")]
    TagTooLongForBuffer {
        /// the descriptor_length value, excluding the 2 header bytes
        taglen: usize,
        /// bytes remaining, including the 2 header bytes
        buflen: usize,
    },
    /// Fewer than the two header bytes remain.
    #[error("only {buflen} bytes remain, too short for a descriptor header")]
    BufferTooShort {
        /// bytes remaining
        buflen: usize,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use hex_literal::*;

    #[test]
    fn generic_keeps_tag_and_length() {
        let data = hex!("0e03c0ffee");
        let (desc, next) = decode(&data, 0).unwrap();
        assert_eq!(next, 5);
        assert_eq!(
            desc,
            Descriptor {
                tag: 0x0e,
                length: 3,
                body: DescriptorBody::Generic
            }
        );
    }

    #[test]
    fn offset_advances_past_each_descriptor() {
        let data = hex!("ffff 520101 5203ffffff 520102");
        let (_, next) = decode(&data, 2).unwrap();
        assert_eq!(next, 5);
        // bytes beyond component_tag are skipped along with the descriptor
        let (desc, next) = decode(&data, next).unwrap();
        assert_eq!(desc.length, 3);
        assert_eq!(next, 10);
        let (desc, next) = decode(&data, next).unwrap();
        assert_eq!(next, data.len());
        assert_eq!(
            desc.variant::<StreamIdentifierDescriptor>().map(|s| s.component_tag),
            Some(2)
        );
    }

    #[test]
    fn too_long() {
        let data = hex!("4805 0100");
        assert_matches!(
            decode(&data, 0),
            Err(DescriptorError::TagTooLongForBuffer {
                taglen: 5,
                buflen: 4
            })
        );
        assert_matches!(
            decode(&data, 3),
            Err(DescriptorError::BufferTooShort { buflen: 1 })
        );
        assert_matches!(
            decode(&data, 10),
            Err(DescriptorError::BufferTooShort { buflen: 0 })
        );
    }

    #[test]
    fn loop_stops_at_first_error() {
        let data = hex!("520101 0509");
        let mut iter = DescriptorIter::new(&data);
        assert_matches!(iter.next(), Some(Ok(_)));
        assert_matches!(iter.next(), Some(Err(_)));
        assert_matches!(iter.next(), None);
        assert!(decode_loop(&data).is_err());
        assert_eq!(decode_loop(&[]).unwrap(), vec![]);
    }

    #[test]
    fn find_by_type() {
        let data = hex!("0a04656e6700 520105");
        let descriptors = decode_loop(&data).unwrap();
        assert_eq!(
            find::<StreamIdentifierDescriptor>(&descriptors[..]).map(|d| d.component_tag),
            Some(5)
        );
        assert!(find::<TeletextDescriptor>(&descriptors[..]).is_none());
    }
}
