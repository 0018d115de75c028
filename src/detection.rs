//! Heuristic check that input really is EBCDIC before converting it
//!
//! EBCDIC text keeps its letters and digits above 0x80, so a run of bytes in
//! the ASCII alphanumeric range is a strong hint that the file was already
//! converted, or never was EBCDIC. The check is coarse: it can let through
//! short plain-text files made of blanks and punctuation.

use crate::{Encoding, Error, Result};

/// Values strictly above this count toward a plain-text run
pub const PLAIN_TEXT_LOW: u8 = 48;

/// Values strictly below this count toward a plain-text run
pub const PLAIN_TEXT_HIGH: u8 = 122;

/// Longest plain-text run still accepted as EBCDIC
pub const MAX_PLAIN_TEXT_RUN: usize = 3;

/// A run of consecutive plain-text values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlainTextRun {
    /// Offset of the first value of the run
    pub offset: usize,
    /// Number of values in the run
    pub length: usize,
}

/// Detector for input that does not look like EBCDIC
#[derive(Debug, Clone)]
pub struct EbcdicDetector {
    max_run: usize,
}

impl Default for EbcdicDetector {
    fn default() -> Self {
        Self {
            max_run: MAX_PLAIN_TEXT_RUN,
        }
    }
}

impl EbcdicDetector {
    /// Create a detector with the standard thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a source code point counts toward a plain-text run
    #[inline]
    pub fn is_plain_text(value: u8) -> bool {
        value > PLAIN_TEXT_LOW && value < PLAIN_TEXT_HIGH
    }

    /// Find the first plain-text run longer than the accepted maximum.
    ///
    /// The returned run is extended to its full length.
    pub fn find_suspicious_run(&self, data: &[u8]) -> Option<PlainTextRun> {
        let mut start = 0;
        let mut length = 0;

        for (offset, &value) in data.iter().enumerate() {
            if Self::is_plain_text(value) {
                if length == 0 {
                    start = offset;
                }
                length += 1;
            } else if length > self.max_run {
                break;
            } else {
                length = 0;
            }
        }

        (length > self.max_run).then_some(PlainTextRun {
            offset: start,
            length,
        })
    }

    /// Check if the data could be EBCDIC text
    pub fn looks_like_ebcdic(&self, data: &[u8]) -> bool {
        self.find_suspicious_run(data).is_none()
    }

    /// Fail with [`Error::EncodingMismatch`] if the data does not look like
    /// EBCDIC text in `encoding`.
    pub fn check(&self, data: &[u8], encoding: Encoding) -> Result<()> {
        match self.find_suspicious_run(data) {
            Some(run) => Err(Error::EncodingMismatch {
                encoding: encoding.name(),
                offset: run.offset,
                run: run.length,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_exclusive() {
        assert!(!EbcdicDetector::is_plain_text(48));
        assert!(EbcdicDetector::is_plain_text(49));
        assert!(EbcdicDetector::is_plain_text(121));
        assert!(!EbcdicDetector::is_plain_text(122));
    }

    #[test]
    fn test_ascii_text_is_rejected() {
        let detector = EbcdicDetector::new();
        let ascii = b"Hello, World! This is plain ASCII text.";

        assert!(!detector.looks_like_ebcdic(ascii));
        let err = detector.check(ascii, Encoding::EBCDIC_1047).unwrap_err();
        match err {
            Error::EncodingMismatch {
                encoding,
                offset,
                run,
            } => {
                assert_eq!(encoding, "IBM1047");
                // "Hell" starts at 0; 'H' = 72, 'e' = 101, 'l' = 108, 'o' = 111
                assert_eq!(offset, 0);
                assert_eq!(run, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ebcdic_text_is_accepted() {
        let detector = EbcdicDetector::new();
        // "HELLO WORLD 123" in Cp1047
        let ebcdic = &[
            0xC8, 0xC5, 0xD3, 0xD3, 0xD6, 0x40, 0xE6, 0xD6, 0xD9, 0xD3, 0xC4, 0x40, 0xF1, 0xF2,
            0xF3,
        ];
        assert!(detector.looks_like_ebcdic(ebcdic));
        assert!(detector.check(ebcdic, Encoding::EBCDIC_1047).is_ok());
    }

    #[test]
    fn test_run_of_exactly_three_is_accepted() {
        let detector = EbcdicDetector::new();
        assert!(detector.looks_like_ebcdic(b"abc"));
        assert!(detector.looks_like_ebcdic(b"abc abc-xyz"));
        assert!(!detector.looks_like_ebcdic(b"abcd"));
    }

    #[test]
    fn test_reports_first_long_run() {
        let detector = EbcdicDetector::new();
        // '-' = 45 and ' ' = 32 break runs
        let data = b"ab-cdef ghijklm";
        assert_eq!(
            detector.find_suspicious_run(data),
            Some(PlainTextRun {
                offset: 3,
                length: 4
            })
        );
    }

    #[test]
    fn test_empty_input_looks_like_ebcdic() {
        assert!(EbcdicDetector::new().looks_like_ebcdic(&[]));
    }

    #[test]
    fn test_blank_padding_misfires() {
        // Four EBCDIC blanks (0x40 = 64) form a plain-text run
        assert!(!EbcdicDetector::new().looks_like_ebcdic(&[0xC1, 0x40, 0x40, 0x40, 0x40]));
    }
}
