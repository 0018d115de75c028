//! Character-level transform applied between decoding and encoding
//!
//! Every decoded character is either kept, replaced by a space when it is a
//! non-printable control character, or turned into a line feed when it is the
//! mainframe "next line" code. Line structure is then rebuilt according to the
//! [`LineMode`].

use std::num::NonZeroUsize;

/// Line feed emitted at line boundaries
pub const LINE_FEED: char = '\n';

/// Mainframe "next line" control value
pub const NEXT_LINE: char = '\u{15}';

/// Replacement for non-printable characters
pub const SPACE: char = ' ';

/// Decoded values of the non-printable EBCDIC characters, replaced by [`SPACE`].
///
/// These are the Unicode values of the Cp1047 control area (bytes 0x00-0x3F)
/// followed by the space and the non-breaking space.
#[rustfmt::skip]
pub const NON_PRINTABLE: [char; 66] = [
    '\u{00}', '\u{01}', '\u{02}', '\u{03}', '\u{9C}', '\u{09}', '\u{86}', '\u{7F}',
    '\u{97}', '\u{8D}', '\u{8E}', '\u{0B}', '\u{0C}', '\u{0D}', '\u{0E}', '\u{0F}',
    '\u{10}', '\u{11}', '\u{12}', '\u{13}', '\u{9D}', '\u{85}', '\u{08}', '\u{87}',
    '\u{18}', '\u{19}', '\u{92}', '\u{8F}', '\u{1C}', '\u{1D}', '\u{1E}', '\u{1F}',
    '\u{80}', '\u{81}', '\u{82}', '\u{83}', '\u{84}', '\u{0A}', '\u{17}', '\u{1B}',
    '\u{88}', '\u{89}', '\u{8A}', '\u{8B}', '\u{8C}', '\u{05}', '\u{06}', '\u{07}',
    '\u{90}', '\u{91}', '\u{16}', '\u{93}', '\u{94}', '\u{95}', '\u{96}', '\u{04}',
    '\u{98}', '\u{99}', '\u{9A}', '\u{9B}', '\u{14}', '\u{15}', '\u{9E}', '\u{1A}',
    '\u{20}', '\u{A0}',
];

/// Bitmask of [`NON_PRINTABLE`] over code points 0-255 (256 bits = 4 u64s)
const NON_PRINTABLE_MASK: [u64; 4] = build_mask(&NON_PRINTABLE);

const fn build_mask(chars: &[char]) -> [u64; 4] {
    let mut mask = [0u64; 4];
    let mut i = 0;
    while i < chars.len() {
        let code = chars[i] as usize;
        mask[code / 64] |= 1u64 << (code % 64);
        i += 1;
    }
    mask
}

/// Check if a decoded character is replaced by a space
#[inline]
pub fn is_non_printable(ch: char) -> bool {
    let code = ch as usize;
    code < 256 && NON_PRINTABLE_MASK[code / 64] & (1u64 << (code % 64)) != 0
}

/// How the character stream is split into lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineMode {
    /// Hard line break every `n` characters; [`NEXT_LINE`] is blanked like
    /// any other non-printable character.
    FixedWidth(NonZeroUsize),
    /// Lines end at [`NEXT_LINE`]; no width-based breaks.
    #[default]
    ControlCodeDelimited,
}

impl LineMode {
    /// Mode for a record length, where `0` means "no fixed width"
    pub fn from_columns(columns: usize) -> Self {
        NonZeroUsize::new(columns).map_or(LineMode::ControlCodeDelimited, LineMode::FixedWidth)
    }

    /// Record length, if fixed-width
    pub fn columns(self) -> Option<NonZeroUsize> {
        match self {
            LineMode::FixedWidth(columns) => Some(columns),
            LineMode::ControlCodeDelimited => None,
        }
    }
}

/// Transform a single character, ignoring record boundaries.
pub fn transform_char(ch: char, mode: LineMode) -> char {
    if mode == LineMode::ControlCodeDelimited && ch == NEXT_LINE {
        LINE_FEED
    } else if is_non_printable(ch) {
        SPACE
    } else {
        ch
    }
}

/// Number of line feeds [`transform`] inserts for an input of `len` characters
pub fn inserted_line_feeds(len: usize, mode: LineMode) -> usize {
    match mode {
        LineMode::FixedWidth(columns) if len > 0 => (len - 1) / columns.get(),
        _ => 0,
    }
}

/// Transform a decoded character stream in one pass.
///
/// In fixed-width mode a line feed is emitted before every position that is
/// a non-zero multiple of the width. Output order equals input order and no
/// character is dropped.
pub fn transform(input: &[char], mode: LineMode) -> String {
    let mut output = String::with_capacity(input.len() + inserted_line_feeds(input.len(), mode));

    for (index, &ch) in input.iter().enumerate() {
        if let LineMode::FixedWidth(columns) = mode {
            if index > 0 && index % columns.get() == 0 {
                output.push(LINE_FEED);
            }
        }
        output.push(transform_char(ch, mode));
    }

    output
}
