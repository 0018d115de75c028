//! # ebcdic-convert CLI - Mainframe Text Transcoder
//!
//! Converts every file below a source directory from EBCDIC into a modern
//! encoding, mirroring the directory tree into a destination directory.

#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::process::ExitCode;
#[cfg(feature = "cli")]
use std::time::Instant;

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};
#[cfg(feature = "cli")]
use serde::Serialize;
#[cfg(feature = "cli")]
use tracing::{debug, error};
#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
use ebcdic_convert::batch::{self, BatchOptions, BatchReport, ErrorPolicy};
#[cfg(feature = "cli")]
use ebcdic_convert::{Converter, Encoding, LineMode};

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features disabled. Enable with --features cli");
    std::process::exit(1);
}

#[cfg(feature = "cli")]
const DEFAULT_LINE_LENGTH: usize = 80;

/// ebcdic-convert: convert EBCDIC text files into a modern encoding
#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "ebcdic-convert")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory containing the files to be converted
    #[arg(
        required_unless_present = "list_encodings",
        value_parser = existing_directory
    )]
    source: Option<PathBuf>,

    /// Directory which will contain the result of the conversion
    #[arg(required_unless_present = "list_encodings")]
    destination: Option<PathBuf>,

    /// Encoding of the original text
    #[arg(short = 'f', long = "from", default_value = "CP1047")]
    from: Encoding,

    /// Encoding for output (platform default if not specified)
    #[arg(short = 't', long = "to")]
    to: Option<Encoding>,

    /// Number of characters to split output by lines (0 splits on the
    /// next-line control code instead)
    #[arg(short = 'l', long = "length", default_value_t = DEFAULT_LINE_LENGTH)]
    length: usize,

    /// Keep converting the remaining files after a failure
    #[arg(long)]
    keep_going: bool,

    /// Reject files that do not look like EBCDIC (plain-text runs in the
    /// raw bytes)
    #[arg(long)]
    check: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// List all supported encodings and exit
    #[arg(long)]
    list_encodings: bool,
}

#[cfg(feature = "cli")]
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct ConversionResult<'a> {
    success: bool,
    from: &'static str,
    to: &'static str,
    line_length: Option<usize>,
    converted: &'a [PathBuf],
    failed: &'a [batch::FailedFile],
    error: Option<String>,
    processing_time_ms: u64,
}

#[cfg(feature = "cli")]
fn existing_directory(value: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(value);
    batch::ensure_directory(&path).map_err(|e| e.to_string())?;
    Ok(path)
}

#[cfg(feature = "cli")]
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.list_encodings {
        return match list_command(&cli) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e:#}");
                ExitCode::FAILURE
            }
        };
    }

    let start_time = Instant::now();
    let converter = build_converter(&cli);
    let outcome = convert_command(&cli, &converter);
    let success = matches!(outcome, Ok(ref report) if report.is_success());

    if let Err(ref e) = outcome {
        error!("Unable to convert files: {e:#}");
    }

    match cli.format {
        OutputFormat::Json => {
            let empty = BatchReport::default();
            let report = outcome.as_ref().unwrap_or(&empty);
            let config = converter.config();
            let result = ConversionResult {
                success,
                from: config.source.name(),
                to: config.target.name(),
                line_length: config.line_mode.columns().map(|c| c.get()),
                converted: &report.converted,
                failed: &report.failed,
                error: outcome.as_ref().err().map(|e| format!("{e:#}")),
                processing_time_ms: start_time.elapsed().as_millis() as u64,
            };
            match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{json}"),
                Err(e) => error!("Failed to serialize result: {e}"),
            }
        }
        OutputFormat::Text => println!("{}", if success { "SUCCESS" } else { "FAILURE" }),
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(feature = "cli")]
fn build_converter(cli: &Cli) -> Converter {
    let to = cli.to.unwrap_or_else(Encoding::platform_default);
    Converter::new(cli.from, to).with_line_mode(LineMode::from_columns(cli.length))
}

#[cfg(feature = "cli")]
fn convert_command(cli: &Cli, converter: &Converter) -> Result<BatchReport> {
    let source: &Path = cli.source.as_deref().context("Missing source.")?;
    let destination: &Path = cli.destination.as_deref().context("Missing destination.")?;

    let config = converter.config();
    debug!(
        "Converting from {} to {} ({:?})",
        config.source.name(),
        config.target.name(),
        config.line_mode
    );

    let options = BatchOptions {
        verify_source: cli.check,
        policy: if cli.keep_going {
            ErrorPolicy::CollectAll
        } else {
            ErrorPolicy::AbortOnFirst
        },
    };

    batch::convert_tree(converter, source, destination, &options).with_context(|| {
        format!(
            "Failed to convert {} into {}",
            source.display(),
            destination.display()
        )
    })
}

#[cfg(feature = "cli")]
fn list_command(cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let encodings: Vec<_> = Encoding::all()
                .iter()
                .map(|encoding| {
                    serde_json::json!({
                        "name": encoding.name(),
                        "ebcdic": encoding.is_ebcdic(),
                        "multibyte": encoding.is_multibyte(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&encodings)?);
        }
        OutputFormat::Text => {
            println!("Supported Encodings ({} total):", Encoding::all().len());
            println!();
            for encoding in Encoding::all() {
                let family = if encoding.is_ebcdic() {
                    "[ebcdic]"
                } else if encoding.is_multibyte() {
                    "[unicode]"
                } else {
                    "[ascii]"
                };
                println!("{:15} {}", encoding.name(), family);
            }
        }
    }

    Ok(())
}
