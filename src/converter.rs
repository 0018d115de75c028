//! Whole-input conversion: decode, transform, encode

use std::fs::{self, Permissions};
use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::charset::Transcoder;
use crate::codec::{self, LineMode};
use crate::detection::EbcdicDetector;
use crate::{Encoding, Error, Result};

/// Settings shared by every conversion a [`Converter`] performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionConfig {
    /// Encoding of the input
    pub source: Encoding,
    /// Encoding of the output
    pub target: Encoding,
    /// Line segmentation policy
    pub line_mode: LineMode,
}

/// Converts EBCDIC text into the target encoding
#[derive(Debug, Clone)]
pub struct Converter {
    config: ConversionConfig,
    transcoder: Transcoder,
}

impl Converter {
    /// Create a converter that splits lines on the "next line" control code
    pub fn new(source: Encoding, target: Encoding) -> Self {
        Self::from_config(ConversionConfig {
            source,
            target,
            line_mode: LineMode::ControlCodeDelimited,
        })
    }

    /// Create a converter from a complete configuration
    pub fn from_config(config: ConversionConfig) -> Self {
        Self {
            transcoder: Transcoder::new(config.source, config.target),
            config,
        }
    }

    /// Same converter, cutting lines every `columns` characters
    #[must_use]
    pub fn with_fixed_width(self, columns: NonZeroUsize) -> Self {
        self.with_line_mode(LineMode::FixedWidth(columns))
    }

    /// Same converter with another line mode
    #[must_use]
    pub fn with_line_mode(mut self, line_mode: LineMode) -> Self {
        self.config.line_mode = line_mode;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Transform already-decoded text, without any encoding step
    pub fn convert_text(&self, input: &str) -> String {
        let chars: Vec<char> = input.chars().collect();
        codec::transform(&chars, self.config.line_mode)
    }

    /// Convert a complete input held in memory
    pub fn convert_bytes(&self, input: &[u8]) -> Result<Vec<u8>> {
        let chars = self.transcoder.decode(input);
        let transformed = codec::transform(&chars, self.config.line_mode);
        let output = self.transcoder.encode(transformed.chars())?;

        debug!(
            from = self.config.source.name(),
            to = self.config.target.name(),
            input_bytes = input.len(),
            output_bytes = output.len(),
            "converted buffer"
        );
        Ok(output)
    }

    /// Run the EBCDIC sanity check on raw input.
    ///
    /// Only EBCDIC sources are checked; other sources always pass.
    pub fn verify_source(&self, input: &[u8]) -> Result<()> {
        if !self.config.source.is_ebcdic() {
            return Ok(());
        }
        EbcdicDetector::new().check(input, self.config.source)
    }

    /// Convert a stream. The reader is consumed to the end before anything is
    /// written.
    pub fn convert<R: Read, W: Write>(&self, mut reader: R, mut writer: W) -> Result<()> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;

        let output = self.convert_bytes(&input)?;
        writer.write_all(&output)?;
        writer.flush()?;
        Ok(())
    }

    /// Convert one file into another. `input` and `output` may be the same
    /// path. The output gets the permissions of the input.
    pub fn convert_file(&self, input: &Path, output: &Path) -> Result<()> {
        let (data, permissions) = read_input(input)?;
        let converted = self.convert_bytes(&data)?;
        write_atomically(output, &converted, permissions)
    }

    /// Like [`Converter::convert_file`], rejecting input that fails the
    /// EBCDIC sanity check.
    pub fn convert_file_checked(&self, input: &Path, output: &Path) -> Result<()> {
        let (data, permissions) = read_input(input)?;
        self.verify_source(&data)?;
        let converted = self.convert_bytes(&data)?;
        write_atomically(output, &converted, permissions)
    }
}

fn read_input(path: &Path) -> Result<(Vec<u8>, Permissions)> {
    let data = fs::read(path).map_err(|e| Error::io(path, e))?;
    let permissions = fs::metadata(path)
        .map_err(|e| Error::io(path, e))?
        .permissions();
    Ok((data, permissions))
}

/// Write through a temporary file in the destination directory, renamed over
/// `path` once complete.
///
/// Temporary files are created owner-only, so `permissions` is applied
/// before the rename.
fn write_atomically(path: &Path, contents: &[u8], permissions: Permissions) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    file.write_all(contents).map_err(|e| Error::io(file.path(), e))?;
    file.as_file()
        .set_permissions(permissions)
        .map_err(|e| Error::io(file.path(), e))?;
    file.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}
