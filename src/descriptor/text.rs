//! Decoding of DVB text fields (EN 300 468, Annex A).
//!
//! The first byte of a text field may select a character table.  Bytes `0x20` and above mean
//! no selector is present and the default table applies, which is treated as ISO/IEC 8859-1.
//!
//! In single byte tables the range `0x80..=0x9F` holds control codes.  `0x8A` is a line break
//! and becomes `"\r\n"`; the rest (emphasis on/off and reserved codes) are dropped.  Two byte
//! tables use `0xE080..=0xE09F` for the same codes.

use encoding_rs::Encoding;

const CR_LF: u8 = 0x8a;
const CONTROL_CODES: std::ops::RangeInclusive<u8> = 0x80..=0x9f;
const WIDE_CR_LF: char = '\u{e08a}';
const WIDE_CONTROL_CODES: std::ops::RangeInclusive<char> = '\u{e080}'..='\u{e09f}';

enum CharacterTable {
    SingleByte(&'static Encoding),
    MultiByte(&'static Encoding),
}

// ISO 8859-1 and -9 are not offered by encoding_rs; windows-1252 and windows-1254 agree with
// them everywhere outside 0x80..=0x9F, which is removed before decoding.  Likewise
// windows-874 for ISO 8859-11.
fn iso_8859_part(part: u16) -> &'static Encoding {
    match part {
        2 => encoding_rs::ISO_8859_2,
        3 => encoding_rs::ISO_8859_3,
        4 => encoding_rs::ISO_8859_4,
        5 => encoding_rs::ISO_8859_5,
        6 => encoding_rs::ISO_8859_6,
        7 => encoding_rs::ISO_8859_7,
        8 => encoding_rs::ISO_8859_8,
        9 => encoding_rs::WINDOWS_1254,
        10 => encoding_rs::ISO_8859_10,
        11 => encoding_rs::WINDOWS_874,
        13 => encoding_rs::ISO_8859_13,
        14 => encoding_rs::ISO_8859_14,
        15 => encoding_rs::ISO_8859_15,
        16 => encoding_rs::ISO_8859_16,
        _ => encoding_rs::WINDOWS_1252,
    }
}

fn select_table(buf: &[u8]) -> (CharacterTable, &[u8]) {
    use self::CharacterTable::*;
    match buf.first() {
        None => (SingleByte(encoding_rs::WINDOWS_1252), buf),
        Some(&b) if b >= 0x20 => (SingleByte(encoding_rs::WINDOWS_1252), buf),
        Some(&b) if (0x01..=0x0b).contains(&b) => {
            (SingleByte(iso_8859_part(u16::from(b) + 4)), &buf[1..])
        }
        Some(0x10) if buf.len() >= 3 => {
            let part = u16::from(buf[1]) << 8 | u16::from(buf[2]);
            (SingleByte(iso_8859_part(part)), &buf[3..])
        }
        Some(0x11) => (MultiByte(encoding_rs::UTF_16BE), &buf[1..]),
        Some(0x12) => (MultiByte(encoding_rs::EUC_KR), &buf[1..]),
        Some(0x13) => (MultiByte(encoding_rs::GBK), &buf[1..]),
        Some(0x14) => (MultiByte(encoding_rs::BIG5), &buf[1..]),
        Some(0x15) => (MultiByte(encoding_rs::UTF_8), &buf[1..]),
        // reserved or unsupported selectors
        Some(_) => (SingleByte(encoding_rs::WINDOWS_1252), &buf[1..]),
    }
}

/// Decode a DVB text field (service name, provider name, ...) to a `String`.
///
/// Undecodable sequences become U+FFFD.  Leading and trailing whitespace is preserved.
pub fn decode_text(buf: &[u8]) -> String {
    match select_table(buf) {
        (CharacterTable::SingleByte(encoding), text) => {
            let mut filtered = Vec::with_capacity(text.len());
            for &b in text {
                if b == CR_LF {
                    filtered.extend_from_slice(b"\r\n");
                } else if !CONTROL_CODES.contains(&b) {
                    filtered.push(b);
                }
            }
            let (decoded, _) = encoding.decode_without_bom_handling(&filtered);
            decoded.into_owned()
        }
        (CharacterTable::MultiByte(encoding), text) => {
            let (decoded, _) = encoding.decode_without_bom_handling(text);
            let mut result = String::with_capacity(decoded.len());
            for c in decoded.chars() {
                if c == WIDE_CR_LF {
                    result.push_str("\r\n");
                } else if !WIDE_CONTROL_CODES.contains(&c) {
                    result.push(c);
                }
            }
            result
        }
    }
}

/// Decode a 3-character ISO 639-2 language code.
pub fn decode_language_code(code: &[u8]) -> String {
    let (decoded, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(code);
    decoded.into_owned()
}
