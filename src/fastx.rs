//! Parsing of FASTA/FASTQ files into raw reads.
//!
//! Records are read with `needletail`, which also handles gzip compressed input. Records whose
//! sequence contains anything other than nucleotides (ACGTU, either case) are skipped, and
//! parsing stops at the first malformed record, keeping the records read before it. A file
//! yielding no records is reported as invalid rather than as an error.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::warn;
use needletail::parse_fastx_reader;

use crate::io_utils::strip_compression_extension;
use crate::worker::Worker;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FastxKind {
    Fasta,
    Fastq,
}

impl FastxKind {
    /// Determine the expected format from the file extension.
    pub fn from_path(path: &Path) -> Option<FastxKind> {
        let file_name = path.file_name()?.to_string_lossy();
        let file_name = strip_compression_extension(&file_name);

        match file_name.rsplit_once('.')?.1 {
            "fasta" | "fa" | "fna" => Some(FastxKind::Fasta),
            "fastq" | "fq" => Some(FastxKind::Fastq),
            _ => None,
        }
    }

    fn header_byte(self) -> u8 {
        match self {
            FastxKind::Fasta => b'>',
            FastxKind::Fastq => b'@',
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FastxRecord {
    pub id: String,
    pub seq: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub is_valid: bool,
    pub records: Vec<FastxRecord>,
}

impl ParseOutcome {
    fn invalid() -> Self {
        ParseOutcome::default()
    }

    pub fn sequences(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.seq.as_str())
    }
}

fn is_nucleotide_seq(seq: &[u8]) -> bool {
    seq.iter().all(|b| b"ACGTUacgtu".contains(b))
}

/// Check that uncompressed content starts with the header of the expected format.
fn matches_kind(bytes: &[u8], kind: FastxKind) -> bool {
    if bytes.starts_with(&GZIP_MAGIC) {
        return true;
    }

    bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == kind.header_byte())
}

/// Parse FASTA or FASTQ content held in memory.
pub fn parse_fastx_bytes(bytes: Vec<u8>) -> ParseOutcome {
    let mut fastx_reader = match parse_fastx_reader(Cursor::new(bytes)) {
        Ok(reader) => reader,
        Err(err) => {
            warn!("Unable to read sequence data: {}", err);
            return ParseOutcome::invalid();
        }
    };

    let mut records = Vec::new();
    while let Some(rec) = fastx_reader.next() {
        let record = match rec {
            Ok(record) => record,
            Err(err) => {
                warn!("Malformed sequence record after {} records: {}", records.len(), err);
                break;
            }
        };

        let seq = record.seq();
        if !is_nucleotide_seq(&seq) {
            continue;
        }

        let header = String::from_utf8_lossy(record.id());
        let id = header.split_whitespace().next().unwrap_or_default().to_string();
        records.push(FastxRecord {
            id,
            seq: String::from_utf8_lossy(&seq).into_owned(),
        });
    }

    ParseOutcome {
        is_valid: !records.is_empty(),
        records,
    }
}

/// Parse a FASTA/FASTQ file. Unsupported extensions and content not matching the extension
/// give an invalid outcome; only failure to read the file is an error.
pub fn parse_fastx_file(path: &Path) -> Result<ParseOutcome> {
    let Some(kind) = FastxKind::from_path(path) else {
        warn!("Unsupported sequence file type: {}", path.display());
        return Ok(ParseOutcome::invalid());
    };

    let bytes = fs::read(path).context(format!("Failed to open {}", path.display()))?;
    if !matches_kind(&bytes, kind) {
        warn!("Contents of {} are not {:?} formatted.", path.display(), kind);
        return Ok(ParseOutcome::invalid());
    }

    Ok(parse_fastx_bytes(bytes))
}

/// Parses sequence files on a background worker. Only the most recently requested file is
/// ever published.
pub struct FastxParser {
    worker: Worker<ParseOutcome>,
}

impl FastxParser {
    pub fn new() -> Result<Self> {
        Ok(FastxParser {
            worker: Worker::new("fastx-parser")?,
        })
    }

    /// Start parsing `path`, cancelling any parse still in flight. `None` or an unsupported
    /// file type clears the state without starting a parse.
    pub fn set_fastx(&self, path: Option<PathBuf>) {
        let Some(path) = path.filter(|p| FastxKind::from_path(p).is_some()) else {
            self.worker.reset();
            return;
        };

        self.worker.submit(move |token| {
            let outcome = match parse_fastx_file(&path) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!("{:#}", err);
                    ParseOutcome::invalid()
                }
            };

            (!token.is_cancelled()).then_some(outcome)
        });
    }

    pub fn cancel_parsing(&self) {
        self.worker.cancel();
    }

    pub fn is_parsing(&self) -> bool {
        self.worker.is_busy()
    }

    pub fn parse_outcome(&self) -> ParseOutcome {
        self.worker.latest()
    }

    pub fn wait(&self) -> ParseOutcome {
        self.worker.wait()
    }
}
