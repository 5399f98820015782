//! Language of the associated program element, with an indication of the audio type.

use super::text::decode_language_code;
use super::DescriptorError;
use log::warn;

/// `ISO_639_language_descriptor`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso639LanguageDescriptor {
    /// One entry per 4-byte record in the descriptor
    pub languages: Vec<Language>,
}
impl Iso639LanguageDescriptor {
    const ENTRY_SIZE: usize = 4;

    /// Decode the descriptor payload.  A trailing partial record is ignored.
    pub fn new(buf: &[u8]) -> Result<Iso639LanguageDescriptor, DescriptorError> {
        let entries = buf.chunks_exact(Self::ENTRY_SIZE);
        if !entries.remainder().is_empty() {
            warn!(
                "ISO_639_language_descriptor length {} is not a multiple of {}",
                buf.len(),
                Self::ENTRY_SIZE
            );
        }
        Ok(Iso639LanguageDescriptor {
            languages: entries
                .map(|e| Language {
                    code: decode_language_code(&e[0..3]),
                    audio_type: AudioType::from(e[3]),
                })
                .collect(),
        })
    }
}

/// The kind of audio carried by a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioType {
    Undefined,
    CleanEffects,
    HearingImpaired,
    VisualImpairedCommentary,
    /// Values `0x04` to `0x7F` are user private; `0x80` and above are reserved
    Reserved(u8),
}
impl From<u8> for AudioType {
    fn from(v: u8) -> Self {
        match v {
            0 => AudioType::Undefined,
            1 => AudioType::CleanEffects,
            2 => AudioType::HearingImpaired,
            3 => AudioType::VisualImpairedCommentary,
            _ => AudioType::Reserved(v),
        }
    }
}

/// One language entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    /// ISO 639-2 three letter code
    pub code: String,
    pub audio_type: AudioType,
}
