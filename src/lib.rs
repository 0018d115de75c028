//! # ebcdic-convert - Mainframe Text Transcoder
//!
//! Converts text files from fixed-width EBCDIC code pages (Cp1047 by default)
//! into a modern encoding such as UTF-8, normalizing line structure on the way.
//!
//! ## Features
//!
//! - **Single-pass codec** that decodes, blanks non-printable control
//!   characters, re-segments lines and re-encodes
//! - **Two line modes**: fixed-width records or the mainframe "next line" control code
//! - **EBCDIC sanity check** rejecting input that already looks like plain text
//! - **Directory batch conversion** mirroring a source tree into a destination tree
//!
//! ## Quick Start
//!
//! ```rust
//! use std::num::NonZeroUsize;
//! use ebcdic_convert::{Converter, Encoding};
//!
//! let converter = Converter::new(Encoding::EBCDIC_1047, Encoding::UTF8)
//!     .with_fixed_width(NonZeroUsize::new(3).unwrap());
//!
//! // "ABCDEF" in Cp1047
//! let ebcdic_data = &[0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6];
//! let utf8_result = converter.convert_bytes(ebcdic_data).unwrap();
//! assert_eq!(std::str::from_utf8(&utf8_result).unwrap(), "ABC\nDEF");
//! ```

#![deny(missing_docs)]

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub mod batch;
mod charset;
pub mod codec;
mod converter;
pub mod detection;
mod tables;

pub use batch::{BatchOptions, BatchReport, ErrorPolicy};
pub use charset::Transcoder;
pub use codec::LineMode;
pub use converter::{ConversionConfig, Converter};

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting files
#[derive(Debug, Error)]
pub enum Error {
    /// A path expected to be a directory does not exist
    #[error("No such directory: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// A path expected to be a directory is something else
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The named encoding is not supported
    #[error("'{0}' is an unknown charset")]
    UnknownEncoding(String),

    /// Open, read, write or rename failed on a specific path
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        /// Path the operation was working on
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to an unnamed stream failed
    #[error("Stream I/O failure: {0}")]
    Stream(#[from] io::Error),

    /// The input does not look like it is in the declared source encoding
    #[error(
        "Input does not look like {encoding}: {run} consecutive plain-text characters at offset {offset}"
    )]
    EncodingMismatch {
        /// Declared source encoding
        encoding: &'static str,
        /// Offset of the suspicious run in the input
        offset: usize,
        /// Length of the suspicious run
        run: usize,
    },

    /// Character cannot be represented in the target encoding
    #[error("Cannot encode character {character:?} at position {position} in {encoding}")]
    UnencodableOutput {
        /// The unencodable character
        character: char,
        /// Position of the character in the transformed stream
        position: usize,
        /// Target encoding name
        encoding: &'static str,
    },

    /// Converting one file of a batch failed
    #[error("Unable to convert file {}", path.display())]
    Conversion {
        /// Source file that failed
        path: PathBuf,
        /// Cause of the failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Supported character encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Encoding {
    // Unicode encodings
    /// UTF-8 Unicode encoding (variable length, 1-4 bytes)
    UTF8,
    /// UTF-16LE Unicode encoding (little endian)
    UTF16LE,
    /// UTF-16BE Unicode encoding (big endian)
    UTF16BE,

    // ASCII and Latin encodings
    /// ASCII (7-bit, 0-127)
    ASCII,
    /// ISO-8859-1 (Latin-1) - Western European
    ISO_8859_1,
    /// ISO-8859-15 (Latin-9) - Western European with Euro
    ISO_8859_15,
    /// Windows-1252 (Western European)
    WINDOWS_1252,

    // EBCDIC variants
    /// IBM EBCDIC Code Page 037 (US/Canada)
    EBCDIC_037,
    /// IBM EBCDIC Code Page 273 (Germany/Austria)
    EBCDIC_273,
    /// IBM EBCDIC Code Page 500 (International)
    EBCDIC_500,
    /// IBM EBCDIC Code Page 1047 (Latin-1, Open Systems)
    EBCDIC_1047,
    /// IBM EBCDIC Code Page 1140 (US/Canada with Euro)
    EBCDIC_1140,
}

impl Encoding {
    /// Every supported encoding, Unicode first
    pub fn all() -> &'static [Encoding] {
        &[
            Encoding::UTF8,
            Encoding::UTF16LE,
            Encoding::UTF16BE,
            Encoding::ASCII,
            Encoding::ISO_8859_1,
            Encoding::ISO_8859_15,
            Encoding::WINDOWS_1252,
            Encoding::EBCDIC_037,
            Encoding::EBCDIC_273,
            Encoding::EBCDIC_500,
            Encoding::EBCDIC_1047,
            Encoding::EBCDIC_1140,
        ]
    }

    /// Encoding used for output when none is requested.
    ///
    /// Rust text is UTF-8 on every platform, so that is the platform default.
    pub fn platform_default() -> Self {
        Encoding::UTF8
    }

    /// Get the canonical name of this encoding
    pub fn name(self) -> &'static str {
        match self {
            Encoding::UTF8 => "UTF-8",
            Encoding::UTF16LE => "UTF-16LE",
            Encoding::UTF16BE => "UTF-16BE",
            Encoding::ASCII => "US-ASCII",
            Encoding::ISO_8859_1 => "ISO-8859-1",
            Encoding::ISO_8859_15 => "ISO-8859-15",
            Encoding::WINDOWS_1252 => "Windows-1252",
            Encoding::EBCDIC_037 => "IBM037",
            Encoding::EBCDIC_273 => "IBM273",
            Encoding::EBCDIC_500 => "IBM500",
            Encoding::EBCDIC_1047 => "IBM1047",
            Encoding::EBCDIC_1140 => "IBM1140",
        }
    }

    /// Check if this encoding belongs to the EBCDIC family
    pub fn is_ebcdic(self) -> bool {
        matches!(
            self,
            Encoding::EBCDIC_037
                | Encoding::EBCDIC_273
                | Encoding::EBCDIC_500
                | Encoding::EBCDIC_1047
                | Encoding::EBCDIC_1140
        )
    }

    /// Check if this encoding uses variable-length character representation
    pub fn is_multibyte(self) -> bool {
        matches!(self, Encoding::UTF8 | Encoding::UTF16LE | Encoding::UTF16BE)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let encoding = match s.trim().to_uppercase().as_str() {
            "UTF8" | "UTF-8" => Encoding::UTF8,
            "UTF16LE" | "UTF-16LE" => Encoding::UTF16LE,
            "UTF16BE" | "UTF-16BE" => Encoding::UTF16BE,
            "ASCII" | "US-ASCII" => Encoding::ASCII,

            "ISO88591" | "ISO-8859-1" | "ISO8859_1" | "LATIN1" => Encoding::ISO_8859_1,
            "ISO885915" | "ISO-8859-15" | "ISO8859_15" | "LATIN9" => Encoding::ISO_8859_15,
            "WINDOWS1252" | "WINDOWS-1252" | "WIN1252" | "CP1252" => Encoding::WINDOWS_1252,

            "EBCDIC037" | "IBM037" | "IBM-037" | "CP037" => Encoding::EBCDIC_037,
            "EBCDIC273" | "IBM273" | "IBM-273" | "CP273" => Encoding::EBCDIC_273,
            "EBCDIC500" | "IBM500" | "IBM-500" | "CP500" => Encoding::EBCDIC_500,
            "EBCDIC1047" | "IBM1047" | "IBM-1047" | "CP1047" => Encoding::EBCDIC_1047,
            "EBCDIC1140" | "IBM01140" | "IBM1140" | "IBM-1140" | "CP1140" => {
                Encoding::EBCDIC_1140
            }

            _ => return Err(Error::UnknownEncoding(s.to_string())),
        };

        Ok(encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_properties() {
        assert_eq!(Encoding::UTF8.name(), "UTF-8");
        assert_eq!(Encoding::EBCDIC_1047.name(), "IBM1047");
        assert!(Encoding::EBCDIC_1047.is_ebcdic());
        assert!(!Encoding::ISO_8859_1.is_ebcdic());
        assert!(Encoding::UTF16BE.is_multibyte());
        assert!(!Encoding::EBCDIC_037.is_multibyte());
        assert_eq!(Encoding::platform_default(), Encoding::UTF8);
    }

    #[test]
    fn test_parse_encoding_aliases() {
        assert_eq!("Cp1047".parse::<Encoding>().unwrap(), Encoding::EBCDIC_1047);
        assert_eq!("CP1047".parse::<Encoding>().unwrap(), Encoding::EBCDIC_1047);
        assert_eq!("ibm-1047".parse::<Encoding>().unwrap(), Encoding::EBCDIC_1047);
        assert_eq!("utf-8".parse::<Encoding>().unwrap(), Encoding::UTF8);
        assert_eq!("latin1".parse::<Encoding>().unwrap(), Encoding::ISO_8859_1);
    }

    #[test]
    fn test_canonical_names_parse_back() {
        for &encoding in Encoding::all() {
            assert_eq!(encoding.name().parse::<Encoding>().unwrap(), encoding);
        }
    }

    #[test]
    fn test_unknown_encoding() {
        let err = "KLINGON-8".parse::<Encoding>().unwrap_err();
        assert!(matches!(err, Error::UnknownEncoding(ref name) if name == "KLINGON-8"));
        assert_eq!(err.to_string(), "'KLINGON-8' is an unknown charset");
    }

    #[test]
    fn test_conversion_error_names_the_file() {
        let err = Error::Conversion {
            path: PathBuf::from("src/cobol.txt"),
            source: Box::new(Error::UnencodableOutput {
                character: 'é',
                position: 4,
                encoding: "US-ASCII",
            }),
        };
        assert_eq!(err.to_string(), "Unable to convert file src/cobol.txt");

        let source = std::error::Error::source(&err).unwrap().to_string();
        assert_eq!(
            source,
            "Cannot encode character 'é' at position 4 in US-ASCII"
        );
    }
}
