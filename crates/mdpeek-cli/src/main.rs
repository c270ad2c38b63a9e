use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mdpeek_core::{Document, FieldValue, SuperblockError, parse_superblock};

#[derive(Parser, Debug)]
#[command(name = "mdpeek")]
#[command(version)]
#[command(
    about = "Read-only inspector for Linux software-RAID (md) version-1.x superblocks.",
    long_about = None,
    after_help = "Examples:\n  mdpeek examine /dev/sdb1\n  mdpeek examine dump.bin --json --pretty\n  dd if=/dev/sdb1 bs=1M count=9 | mdpeek examine -"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode the superblock of an array member device (or a dump of one).
    #[command(
        after_help = "Examples:\n  mdpeek examine /dev/sdb1\n  mdpeek examine dump.bin --json -o report.json\n  cat dump.bin | mdpeek examine -"
    )]
    Examine {
        /// Member device, image file, or '-' for stdin
        input: PathBuf,

        /// Emit JSON instead of the field listing
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output path (defaults to stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Examine {
            input,
            json,
            pretty,
            output,
            quiet,
        } => cmd_examine(input, json, pretty, output, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(err.to_string(), None)
    }
}

fn cmd_examine(
    input: PathBuf,
    json: bool,
    pretty: bool,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    if pretty && !json {
        return Err(CliError::new(
            "cannot use --pretty without --json",
            Some("add --json, or drop --pretty".to_string()),
        ));
    }

    let document = open_and_decode(&input)?;
    let rendered = if json {
        serialize_document(&document, pretty)?
    } else {
        render_text(&document)
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(&path, rendered)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            if !quiet {
                eprintln!("OK: report written -> {}", path.display());
            }
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn open_and_decode(input: &PathBuf) -> Result<Document, CliError> {
    if input.as_os_str() == "-" {
        return parse_superblock(io::stdin().lock()).map_err(decode_error);
    }
    if !input.exists() {
        return Err(CliError::new(
            format!("input not found: {}", input.display()),
            Some("pass a member device, an image file, or '-' for stdin".to_string()),
        ));
    }
    let file =
        File::open(input).with_context(|| format!("Failed to open input: {}", input.display()))?;
    parse_superblock(BufReader::new(file)).map_err(decode_error)
}

fn decode_error(err: SuperblockError) -> CliError {
    let hint = match &err {
        SuperblockError::FormatMismatch { .. } => Some(
            "version 0.90 and 1.0 superblocks live near the end of the device; \
             only the 1.1 and 1.2 layouts start at the front"
                .to_string(),
        ),
        SuperblockError::UnexpectedEndOfStream { .. } => Some(
            "the dump may be truncated; capture at least the first 8 KiB of the device"
                .to_string(),
        ),
        _ => None,
    };
    CliError::new(format!("superblock decode failed: {err}"), hint)
}

fn serialize_document(document: &Document, pretty: bool) -> Result<String, CliError> {
    let mut json = if pretty {
        serde_json::to_string_pretty(document).context("JSON serialization failed")?
    } else {
        serde_json::to_string(document).context("JSON serialization failed")?
    };
    json.push('\n');
    Ok(json)
}

fn render_text(document: &Document) -> String {
    let mut out = String::new();
    for section in &document.sections {
        out.push_str(&section.name);
        out.push('\n');
        for field in &section.fields {
            out.push_str(&format!(
                "  {:<20} {}\n",
                field.name,
                render_value(&field.value)
            ));
        }
    }
    out
}

fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::U32(value) => format!("{value:#010x}"),
        FieldValue::U64(value) => format!("{value:#018x}"),
        FieldValue::I32(value) => value.to_string(),
        FieldValue::Bits32(value) => format!("{value:#034b}"),
        FieldValue::Bits8(value) => format!("{value:#010b}"),
        FieldValue::Raw(bytes) => {
            let hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
            format!("0x{hex}")
        }
        FieldValue::Text(bytes) => trim_trailing_nuls(bytes).escape_ascii().to_string(),
    }
}

fn trim_trailing_nuls(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&byte| byte != 0)
        .map_or(0, |last| last + 1);
    &bytes[..end]
}
