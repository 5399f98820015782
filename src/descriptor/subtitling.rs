use super::text::decode_language_code;
use super::DescriptorError;
use log::warn;

/// One 8-byte entry of a `subtitling_descriptor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtitle {
    pub language: String,
    /// the `component_type` value for DVB subtitles, e.g. `0x10` for normal subtitles with no
    /// monitor aspect ratio criticality
    pub subtitling_type: u8,
    pub composition_page_id: u16,
    pub ancillary_page_id: u16,
}

/// `subtitling_descriptor`: the DVB subtitle services carried by a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitlingDescriptor {
    pub subtitles: Vec<Subtitle>,
}
impl SubtitlingDescriptor {
    const ENTRY_SIZE: usize = 8;

    pub fn new(buf: &[u8]) -> Result<SubtitlingDescriptor, DescriptorError> {
        let entries = buf.chunks_exact(Self::ENTRY_SIZE);
        if !entries.remainder().is_empty() {
            warn!(
                "subtitling_descriptor has {} trailing bytes",
                entries.remainder().len()
            );
        }
        Ok(SubtitlingDescriptor {
            subtitles: entries
                .map(|e| Subtitle {
                    language: decode_language_code(&e[0..3]),
                    subtitling_type: e[3],
                    composition_page_id: u16::from(e[4]) << 8 | u16::from(e[5]),
                    ancillary_page_id: u16::from(e[6]) << 8 | u16::from(e[7]),
                })
                .collect(),
        })
    }
}
