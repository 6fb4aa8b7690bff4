//! This module implements filtering and deduplication of raw SELEX reads.
//!
//! It provides functionality to:
//! - Keep reads whose length lies within a tolerance of the target length and which carry
//!   the expected forward and reverse primers.
//! - Count identical reads and keep those seen at least a minimum number of times.
//! - Optionally strip the primers from the kept reads to obtain their random regions.
//!
//! `process` is pure. `ReadProcessor` runs it on a single background worker where each new
//! request supersedes the previous one.

use std::convert::Infallible;

use anyhow::Result;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::filter_config::FilterConfig;
use crate::worker::{CancelToken, Worker};

/// Number of reads processed between checks of the cancellation token.
const CANCEL_CHECK_INTERVAL: usize = 4096;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub num_total: usize,
    pub num_filtered: usize,
    pub num_unique: usize,
    pub unique_ratio: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReadData {
    pub seqs: Vec<String>,
    pub dups: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_regions: Option<Vec<String>>,
}

/// Outcome of a single filtering request.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProcessResult {
    pub config: FilterConfig,
    pub summary: Summary,
    pub data: ReadData,
}

impl ProcessResult {
    /// Attach the random region of every kept read, i.e. the read without its primers.
    pub fn with_random_regions(mut self) -> Self {
        let fwd_len = self.config.fwd_primer.len();
        let rev_len = self.config.rev_primer.len();

        let regions = self
            .data
            .seqs
            .iter()
            .map(|seq| random_region(seq, fwd_len, rev_len).to_string())
            .collect();

        self.data.random_regions = Some(regions);
        self
    }
}

/// Slice of `seq` left after removing `fwd_len` leading and `rev_len` trailing bytes.
/// Reads too short to hold both primers have an empty random region.
pub fn random_region(seq: &str, fwd_len: usize, rev_len: usize) -> &str {
    let end = seq.len().saturating_sub(rev_len);
    if fwd_len >= end {
        return "";
    }

    seq.get(fwd_len..end).unwrap_or("")
}

/// Convert a DNA sequence to RNA by replacing T with U.
pub fn to_rna(seq: &str) -> String {
    seq.replace('T', "U")
}

/// Filter and deduplicate reads.
pub fn process(reads: &[String], config: &FilterConfig) -> ProcessResult {
    let Ok(result) = filter_reads(reads, config, || Ok::<(), Infallible>(()));
    result
}

/// Filter and deduplicate reads, returning `None` if the token is cancelled before completion.
pub fn process_cancellable(
    reads: &[String],
    config: &FilterConfig,
    token: &CancelToken,
) -> Option<ProcessResult> {
    filter_reads(reads, config, || if token.is_cancelled() { Err(()) } else { Ok(()) }).ok()
}

/// `checkpoint` is called every `CANCEL_CHECK_INTERVAL` reads and aborts processing on error.
fn filter_reads<E>(
    reads: &[String],
    config: &FilterConfig,
    mut checkpoint: impl FnMut() -> Result<(), E>,
) -> Result<ProcessResult, E> {
    let mut filtered: Vec<&str> = Vec::new();
    for (idx, read) in reads.iter().enumerate() {
        if idx % CANCEL_CHECK_INTERVAL == 0 {
            checkpoint()?;
        }

        if config.accepts(read) {
            filtered.push(read);
        }
    }

    // count reads, remembering the order in which each distinct read was first seen
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for (idx, &read) in filtered.iter().enumerate() {
        if idx % CANCEL_CHECK_INTERVAL == 0 {
            checkpoint()?;
        }

        match index.get(read) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                index.insert(read, counts.len());
                counts.push((read, 1));
            }
        }
    }

    let (seqs, dups): (Vec<String>, Vec<usize>) = counts
        .into_iter()
        .filter(|(_, count)| *count >= config.min_count)
        .map(|(read, count)| (read.to_string(), count))
        .unzip();

    let num_total = reads.len();
    let num_filtered = filtered.len();
    let num_unique = seqs.len();

    Ok(ProcessResult {
        config: config.clone(),
        summary: Summary {
            num_total,
            num_filtered,
            num_unique,
            unique_ratio: num_unique as f64 / num_filtered as f64,
        },
        data: ReadData {
            seqs,
            dups,
            random_regions: None,
        },
    })
}

/// Runs `process` off the calling thread. Only the most recent request is ever published.
pub struct ReadProcessor {
    worker: Worker<ProcessResult>,
    random_regions: bool,
}

impl ReadProcessor {
    pub fn new() -> Result<Self> {
        Ok(ReadProcessor {
            worker: Worker::new("read-filter")?,
            random_regions: false,
        })
    }

    /// Attach random regions to every published result.
    pub fn with_random_regions(mut self, enabled: bool) -> Self {
        self.random_regions = enabled;
        self
    }

    /// Start processing `reads`, cancelling any request still in flight.
    pub fn set_raw_reads(&self, reads: Vec<String>, config: FilterConfig) {
        let random_regions = self.random_regions;
        self.worker.submit(move |token| {
            let result = process_cancellable(&reads, &config, token)?;
            Some(if random_regions {
                result.with_random_regions()
            } else {
                result
            })
        });
    }

    pub fn cancel_processing(&self) {
        self.worker.cancel();
    }

    pub fn is_processing(&self) -> bool {
        self.worker.is_busy()
    }

    /// Latest published result, or the default result while a request is pending.
    pub fn process_result(&self) -> ProcessResult {
        self.worker.latest()
    }

    /// Block until the current request finishes and return its result.
    pub fn wait(&self) -> ProcessResult {
        self.worker.wait()
    }
}
