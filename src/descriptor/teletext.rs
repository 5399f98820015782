//! Identifies the Teletext pages carried by a stream, with their language.

use super::text::decode_language_code;
use super::DescriptorError;
use log::warn;

/// `teletext_type` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeletextType {
    InitialPage,
    Subtitle,
    AdditionalInformation,
    ProgrammeSchedule,
    HearingImpairedSubtitle,
    Reserved(u8),
}
impl From<u8> for TeletextType {
    fn from(v: u8) -> Self {
        match v {
            0x01 => TeletextType::InitialPage,
            0x02 => TeletextType::Subtitle,
            0x03 => TeletextType::AdditionalInformation,
            0x04 => TeletextType::ProgrammeSchedule,
            0x05 => TeletextType::HearingImpairedSubtitle,
            _ => TeletextType::Reserved(v),
        }
    }
}

/// One 5-byte language block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeletextLanguage {
    pub language: String,
    pub teletext_type: TeletextType,
    /// `teletext_magazine_number`, where `0` denotes magazine 8
    pub magazine_number: u8,
    /// `teletext_page_number`, two BCD digits
    pub page_number: u8,
}
impl TeletextLanguage {
    /// The three digit page number as shown to viewers, e.g. `888`.
    pub fn page(&self) -> u16 {
        let magazine = if self.magazine_number == 0 {
            8
        } else {
            u16::from(self.magazine_number)
        };
        magazine * 100 + u16::from(self.page_number >> 4) * 10 + u16::from(self.page_number & 0xf)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeletextDescriptor {
    pub languages: Vec<TeletextLanguage>,
}
impl TeletextDescriptor {
    const BLOCK_SIZE: usize = 5;

    pub fn new(buf: &[u8]) -> Result<TeletextDescriptor, DescriptorError> {
        let blocks = buf.chunks_exact(Self::BLOCK_SIZE);
        if !blocks.remainder().is_empty() {
            warn!(
                "teletext_descriptor has {} trailing bytes",
                blocks.remainder().len()
            );
        }
        Ok(TeletextDescriptor {
            languages: blocks
                .map(|b| TeletextLanguage {
                    language: decode_language_code(&b[0..3]),
                    teletext_type: TeletextType::from(b[3] >> 3),
                    magazine_number: b[3] & 0b111,
                    page_number: b[4],
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
    fn one_block() {
        let data = hex!("5605 656e67 1088");
        let (desc, next) = decode(&data, 0).unwrap();
        assert_eq!(next, 7);
        assert_matches!(desc.body, DescriptorBody::Teletext(ref t) => {
            assert_eq!(t.languages.len(), 1);
            let l = &t.languages[0];
            assert_eq!(l.language, "eng");
            assert_eq!(l.teletext_type, TeletextType::Subtitle);
            assert_eq!(l.magazine_number, 0);
            assert_eq!(l.page(), 888);
        });
    }

    #[test]
    fn two_blocks() {
        let data = hex!("560a 656e67 0900 637977 2a01 ff");
        let (desc, next) = decode(&data, 0).unwrap();
        assert_eq!(next, 12);
        assert_matches!(desc.body, DescriptorBody::Teletext(ref t) => {
            assert_eq!(t.languages.len(), 2);
            assert_eq!(t.languages[0].teletext_type, TeletextType::InitialPage);
            assert_eq!(t.languages[0].page(), 100);
            assert_eq!(t.languages[1].language, "cyw");
            assert_eq!(t.languages[1].teletext_type, TeletextType::HearingImpairedSubtitle);
            assert_eq!(t.languages[1].page(), 201);
        });
    }
}
