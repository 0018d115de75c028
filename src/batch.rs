//! Converting every file of a directory tree
//!
//! Files are discovered recursively below the source directory, hidden files
//! and directories excluded, and written to the same relative path below the
//! destination directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::{Converter, Error, Result};

/// What to do when one file of a batch fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop at the first failing file
    #[default]
    AbortOnFirst,
    /// Convert every file and report all failures
    CollectAll,
}

/// Options of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Reject files that fail the EBCDIC sanity check. Off by default: blank
    /// padding (0x40) alone is enough to trip the check.
    pub verify_source: bool,
    /// Failure handling
    pub policy: ErrorPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            verify_source: false,
            policy: ErrorPolicy::AbortOnFirst,
        }
    }
}

/// A file that could not be converted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    /// Source file
    pub path: PathBuf,
    /// Description of the failure
    pub message: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Destination files written
    pub converted: Vec<PathBuf>,
    /// Files that failed, only filled with [`ErrorPolicy::CollectAll`]
    pub failed: Vec<FailedFile>,
}

impl BatchReport {
    /// Whether every file was converted
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fail unless `path` is an existing directory
pub fn ensure_directory(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::NotADirectory(path.to_path_buf())),
        Err(_) => Err(Error::DirectoryNotFound(path.to_path_buf())),
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().as_encoded_bytes().starts_with(b".")
}

/// List the files to convert below `root`, as sorted paths relative to it.
pub fn discover_files(root: &Path) -> Result<Vec<PathBuf>> {
    ensure_directory(root)?;

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }

    Ok(files)
}

/// Convert every file below `source` into the same place below `destination`.
///
/// With [`ErrorPolicy::AbortOnFirst`] the first failure is returned as
/// [`Error::Conversion`]; files converted before it stay written.
pub fn convert_tree(
    converter: &Converter,
    source: &Path,
    destination: &Path,
    options: &BatchOptions,
) -> Result<BatchReport> {
    let files = discover_files(source)?;
    let mut report = BatchReport::default();

    for relative in files {
        let source_file = source.join(&relative);
        let dest_file = destination.join(&relative);
        info!(
            "Converting {} into {}",
            source_file.display(),
            dest_file.display()
        );

        match convert_one(converter, &source_file, &dest_file, options) {
            Ok(()) => report.converted.push(dest_file),
            Err(err) => match options.policy {
                ErrorPolicy::AbortOnFirst => {
                    return Err(Error::Conversion {
                        path: source_file,
                        source: Box::new(err),
                    });
                }
                ErrorPolicy::CollectAll => {
                    warn!("Unable to convert file {}: {}", source_file.display(), err);
                    report.failed.push(FailedFile {
                        path: source_file,
                        message: err.to_string(),
                    });
                }
            },
        }
    }

    info!(
        converted = report.converted.len(),
        failed = report.failed.len(),
        "batch finished"
    );
    Ok(report)
}

fn convert_one(
    converter: &Converter,
    source_file: &Path,
    dest_file: &Path,
    options: &BatchOptions,
) -> Result<()> {
    if let Some(parent) = dest_file.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    if options.verify_source {
        converter.convert_file_checked(source_file, dest_file)
    } else {
        converter.convert_file(source_file, dest_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Encoding, LineMode};
    use tempfile::TempDir;

    const EBCDIC_FIXTURE: &[u8] = include_bytes!("../tests/fixtures/EBCDIC.txt");
    const ASCII_FIXTURE: &[u8] = include_bytes!("../tests/fixtures/ASCII.txt");

    fn cobol_converter() -> Converter {
        Converter::new(Encoding::EBCDIC_1047, Encoding::UTF8)
            .with_line_mode(LineMode::from_columns(80))
    }

    fn write(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_fixture_conversion() {
        let output = cobol_converter().convert_bytes(EBCDIC_FIXTURE).unwrap();
        assert_eq!(output, ASCII_FIXTURE);
        assert!(cobol_converter().verify_source(EBCDIC_FIXTURE).is_ok());
    }

    #[test]
    fn test_discover_files_skips_hidden() {
        let root = TempDir::new().unwrap();
        write(&root.path().join("cobol.txt"), b"x");
        write(&root.path().join("sub/cobol.txt"), b"x");
        write(&root.path().join("sub/sub/cobol.txt"), b"x");
        write(&root.path().join("sub/sub/.cobol.txt"), b"x");
        write(&root.path().join(".git/config"), b"x");

        let files = discover_files(root.path()).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("cobol.txt"),
                PathBuf::from("sub/cobol.txt"),
                PathBuf::from("sub/sub/cobol.txt"),
            ]
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_discover_files_skips_hidden_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = TempDir::new().unwrap();
        write(&root.path().join("cobol.txt"), b"x");
        write(&root.path().join(OsStr::from_bytes(b".\xFFcobol")), b"x");
        write(&root.path().join(OsStr::from_bytes(b"\xFFcobol")), b"x");

        let files = discover_files(root.path()).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("cobol.txt"),
                PathBuf::from(OsStr::from_bytes(b"\xFFcobol")),
            ]
        );
    }

    #[test]
    fn test_convert_all_files_in_directory_and_sub_directories() {
        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();
        for relative in ["cobol.txt", "sub/cobol.txt", "sub/sub/cobol.txt"] {
            write(&source.path().join(relative), EBCDIC_FIXTURE);
        }
        write(&source.path().join("sub/sub/.cobol.txt"), EBCDIC_FIXTURE);

        let report = convert_tree(
            &cobol_converter(),
            source.path(),
            destination.path(),
            &BatchOptions::default(),
        )
        .unwrap();

        assert!(report.is_success());
        assert_eq!(report.converted.len(), 3);
        for relative in ["cobol.txt", "sub/cobol.txt", "sub/sub/cobol.txt"] {
            let output = fs::read(destination.path().join(relative)).unwrap();
            assert_eq!(output, ASCII_FIXTURE, "{relative}");
            assert_ne!(output, fs::read(source.path().join(relative)).unwrap());
        }
        assert!(!destination.path().join("sub/sub/.cobol.txt").exists());
        assert_eq!(
            fs::read(source.path().join("sub/sub/.cobol.txt")).unwrap(),
            EBCDIC_FIXTURE
        );
    }

    #[test]
    fn test_convert_tree_in_place() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("cobol.txt"), EBCDIC_FIXTURE);
        write(&dir.path().join("sub/sub/.cobol.txt"), EBCDIC_FIXTURE);

        convert_tree(
            &cobol_converter(),
            dir.path(),
            dir.path(),
            &BatchOptions::default(),
        )
        .unwrap();

        assert_eq!(fs::read(dir.path().join("cobol.txt")).unwrap(), ASCII_FIXTURE);
        assert_eq!(
            fs::read(dir.path().join("sub/sub/.cobol.txt")).unwrap(),
            EBCDIC_FIXTURE
        );
    }

    #[test]
    fn test_directory_does_not_exist() {
        let dir = TempDir::new().unwrap();
        let unknown = dir.path().join("unknown");
        let err = discover_files(&unknown).unwrap_err();
        assert!(matches!(err, Error::DirectoryNotFound(ref p) if *p == unknown));
    }

    #[test]
    fn test_directory_is_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("EBCDIC.txt");
        write(&file, EBCDIC_FIXTURE);

        let err = convert_tree(
            &cobol_converter(),
            &file,
            dir.path(),
            &BatchOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotADirectory(ref p) if *p == file));
    }

    #[test]
    fn test_already_converted_file_aborts_batch() {
        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();
        write(&source.path().join("a.txt"), EBCDIC_FIXTURE);
        write(&source.path().join("b.txt"), ASCII_FIXTURE);
        write(&source.path().join("c.txt"), EBCDIC_FIXTURE);

        let options = BatchOptions {
            verify_source: true,
            ..BatchOptions::default()
        };
        let err = convert_tree(
            &cobol_converter(),
            source.path(),
            destination.path(),
            &options,
        )
        .unwrap_err();

        match err {
            Error::Conversion { path, source: cause } => {
                assert_eq!(path, source.path().join("b.txt"));
                assert!(matches!(*cause, Error::EncodingMismatch { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(destination.path().join("a.txt").exists());
        assert!(!destination.path().join("c.txt").exists());
    }

    #[test]
    fn test_collect_all_continues_after_failure() {
        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();
        write(&source.path().join("a.txt"), EBCDIC_FIXTURE);
        write(&source.path().join("b.txt"), ASCII_FIXTURE);
        write(&source.path().join("c.txt"), EBCDIC_FIXTURE);

        let options = BatchOptions {
            verify_source: true,
            policy: ErrorPolicy::CollectAll,
        };
        let report = convert_tree(
            &cobol_converter(),
            source.path(),
            destination.path(),
            &options,
        )
        .unwrap();

        assert!(!report.is_success());
        assert_eq!(report.converted.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, source.path().join("b.txt"));
        assert!(report.failed[0].message.starts_with("Input does not look like IBM1047"));
    }

    #[test]
    fn test_default_options_do_not_verify() {
        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();
        write(&source.path().join("plain.txt"), b"PLAIN");

        let report = convert_tree(
            &cobol_converter(),
            source.path(),
            destination.path(),
            &BatchOptions::default(),
        )
        .unwrap();

        assert!(report.is_success());
        assert_eq!(report.converted, vec![destination.path().join("plain.txt")]);
    }

    #[test]
    fn test_blank_padded_records_convert_with_default_options() {
        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();

        // "STOP RUN." in Cp1047, padded with EBCDIC blanks to 80 columns
        let mut record = vec![0xE2, 0xE3, 0xD6, 0xD7, 0x40, 0xD9, 0xE4, 0xD5, 0x4B];
        record.resize(80, 0x40);
        let mut data = record.clone();
        data.extend_from_slice(&record);
        write(&source.path().join("stop.cbl"), &data);

        let report = convert_tree(
            &cobol_converter(),
            source.path(),
            destination.path(),
            &BatchOptions::default(),
        )
        .unwrap();

        assert!(report.is_success());
        let line = format!("{:<80}", "STOP RUN.");
        assert_eq!(
            fs::read_to_string(destination.path().join("stop.cbl")).unwrap(),
            format!("{line}\n{line}")
        );
    }

    #[test]
    fn test_report_serializes() {
        let report = BatchReport {
            converted: vec![PathBuf::from("out/cobol.txt")],
            failed: vec![FailedFile {
                path: PathBuf::from("in/bad.txt"),
                message: "boom".to_string(),
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["converted"][0], "out/cobol.txt");
        assert_eq!(json["failed"][0]["message"], "boom");
    }
}
