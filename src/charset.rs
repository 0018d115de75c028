//! Decoding into and encoding out of the supported character encodings
//!
//! Single-byte encodings go through the tables in [`crate::tables`]; the
//! Unicode encodings are handled directly.

use std::collections::HashMap;

use crate::tables::{self, CharTable};
use crate::{Encoding, Error, Result};

/// Replacement for bytes that have no mapping in the source encoding.
const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

/// Converts bytes of a source encoding into characters and characters into
/// bytes of a target encoding.
#[derive(Debug, Clone)]
pub struct Transcoder {
    from: Encoding,
    to: Encoding,
    /// Reverse lookup for single-byte targets: char -> byte
    char_to_byte: Option<HashMap<char, u8>>,
}

impl Transcoder {
    /// Create a transcoder between two encodings
    pub fn new(from: Encoding, to: Encoding) -> Self {
        let char_to_byte = tables::get_encoding_chars(to).map(reverse_table);
        Self {
            from,
            to,
            char_to_byte,
        }
    }

    /// Get source encoding
    pub fn from_encoding(&self) -> Encoding {
        self.from
    }

    /// Get target encoding
    pub fn to_encoding(&self) -> Encoding {
        self.to
    }

    /// Decode the whole input into characters.
    ///
    /// Never fails: bytes without a mapping and malformed Unicode sequences
    /// become U+FFFD.
    pub fn decode(&self, input: &[u8]) -> Vec<char> {
        if let Some(from_chars) = tables::get_encoding_chars(self.from) {
            return input
                .iter()
                .map(|&byte| from_chars[byte as usize].unwrap_or(REPLACEMENT))
                .collect();
        }

        match self.from {
            Encoding::UTF16LE => decode_utf16(input, u16::from_le_bytes),
            Encoding::UTF16BE => decode_utf16(input, u16::from_be_bytes),
            _ => String::from_utf8_lossy(input).chars().collect(),
        }
    }

    /// Encode characters into the target encoding.
    ///
    /// The first character the target cannot represent aborts the encoding.
    pub fn encode<I>(&self, chars: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = char>,
    {
        let chars = chars.into_iter();
        let mut output = Vec::with_capacity(chars.size_hint().0);

        if let Some(char_to_byte) = &self.char_to_byte {
            for (position, ch) in chars.enumerate() {
                match char_to_byte.get(&ch) {
                    Some(&byte) => output.push(byte),
                    None => {
                        return Err(Error::UnencodableOutput {
                            character: ch,
                            position,
                            encoding: self.to.name(),
                        });
                    }
                }
            }
            return Ok(output);
        }

        match self.to {
            Encoding::UTF16LE => encode_utf16(chars, &mut output, u16::to_le_bytes),
            Encoding::UTF16BE => encode_utf16(chars, &mut output, u16::to_be_bytes),
            _ => {
                let mut buf = [0u8; 4];
                for ch in chars {
                    output.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
            }
        }

        Ok(output)
    }
}

fn reverse_table(chars: &CharTable) -> HashMap<char, u8> {
    let mut char_to_byte = HashMap::with_capacity(chars.len());
    for (byte, &ch_opt) in chars.iter().enumerate() {
        if let Some(ch) = ch_opt {
            char_to_byte.insert(ch, byte as u8);
        }
    }
    char_to_byte
}

fn decode_utf16(input: &[u8], to_unit: fn([u8; 2]) -> u16) -> Vec<char> {
    let chunks = input.chunks_exact(2);
    let dangling = !chunks.remainder().is_empty();

    let mut chars: Vec<char> = char::decode_utf16(chunks.map(|c| to_unit([c[0], c[1]])))
        .map(|unit| unit.unwrap_or(REPLACEMENT))
        .collect();
    if dangling {
        chars.push(REPLACEMENT);
    }
    chars
}

fn encode_utf16(
    chars: impl Iterator<Item = char>,
    output: &mut Vec<u8>,
    to_bytes: fn(u16) -> [u8; 2],
) {
    let mut buf = [0u16; 2];
    for ch in chars {
        for &unit in ch.encode_utf16(&mut buf).iter() {
            output.extend_from_slice(&to_bytes(unit));
        }
    }
}
