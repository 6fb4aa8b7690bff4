//! Main entry point for the raptgen-reads application.
//!
//! This file handles command-line parsing, logging setup, and orchestrates preprocessing of raw
//! SELEX reads: sequence files are parsed, preprocessing parameters are resolved from the config
//! file, command line and (optionally) estimated from the reads, and the reads are filtered and
//! deduplicated. Results are written to the specified output directory.

use std::env;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use num_format::{Locale, ToFormattedString};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::cli::Cli;
use crate::estimate::{estimate_adapters, estimate_target_length};
use crate::fastx::{parse_fastx_file, ParseOutcome};
use crate::filter_config::{ConfigFile, FilterConfig};
use crate::io_utils::sample_id_from_filename;
use crate::logging::setup_logger;
use crate::progress::{progress_bar, spinner};
use crate::read_filter::{to_rna, ReadProcessor};
use crate::report::{format_ratio, write_reports};

mod cli;
pub mod logging;
pub mod progress;
pub mod estimate;
pub mod fastx;
pub mod filter_config;
pub mod io_utils;
pub mod read_filter;
pub mod report;
pub mod worker;

/// Interval at which background workers are polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const DEFAULT_MIN_COUNT: usize = 1;
const DEFAULT_TOLERANCE: usize = 0;

/// Common initialization required by all commands.
fn init(threads: usize) -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    info!("{} v{}", env!("CARGO_PKG_NAME"), VERSION);
    info!("{}", env::args().collect::<Vec<String>>().join(" "));

    info!("Using {} threads.", threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()?;

    Ok(())
}

/// Parse all sequence files in parallel, returning the reads of every file in input order.
fn read_inputs(inputs: &[PathBuf]) -> Result<Vec<String>> {
    let progress_bar = progress_bar(inputs.len() as u64);

    let outcomes: Vec<ParseOutcome> = inputs
        .par_iter()
        .map(|path| {
            let outcome = parse_fastx_file(path);
            progress_bar.inc(1);
            outcome
        })
        .collect::<Result<_>>()?;

    progress_bar.finish_and_clear();

    let mut reads = Vec::new();
    for (path, outcome) in inputs.iter().zip(outcomes) {
        if !outcome.is_valid {
            bail!("No sequences found in {}", path.display());
        }

        info!(
            " - {}: {} reads",
            sample_id_from_filename(path),
            outcome.records.len().to_formatted_string(&Locale::en)
        );
        reads.extend(outcome.sequences().map(str::to_string));
    }

    Ok(reads)
}

/// Build the filter configuration, estimating missing values from the reads if requested.
fn resolve_config(params: ConfigFile, reads: &[String], estimate: bool, rna: bool) -> Result<FilterConfig> {
    let params = params.validate()?;

    let target_length = match params.target_length {
        Some(target_length) => target_length,
        None if estimate => {
            let target_length = estimate_target_length(reads)
                .context("Unable to estimate target length without reads.")?;
            info!("Estimated target length: {}", target_length);
            target_length
        }
        None => bail!("No target length specified. Use --target-length or --estimate."),
    };

    let (mut fwd_primer, mut rev_primer) = (params.fwd_primer, params.rev_primer);
    if estimate && (fwd_primer.is_none() || rev_primer.is_none()) {
        match estimate_adapters(reads, target_length) {
            Some((fwd, rev)) => {
                info!("Estimated adapters: forward = '{}', reverse = '{}'", fwd, rev);
                fwd_primer = fwd_primer.or(Some(fwd));
                rev_primer = rev_primer.or(Some(rev));
            }
            None => warn!("No reads of length {} to estimate adapters from.", target_length),
        }
    }

    let normalize = |primer: Option<String>| {
        let primer = primer.unwrap_or_default().to_ascii_uppercase();
        if rna { to_rna(&primer) } else { primer }
    };

    Ok(FilterConfig {
        min_count: params.min_count.unwrap_or(DEFAULT_MIN_COUNT),
        tolerance: params.tolerance.unwrap_or(DEFAULT_TOLERANCE),
        target_length,
        fwd_primer: normalize(fwd_primer),
        rev_primer: normalize(rev_primer),
    })
}

fn main() -> Result<()> {
    let start = Instant::now();

    let args = Cli::parse();

    std::fs::create_dir_all(&args.out_dir)
        .context(format!("Failed to create {}", args.out_dir.display()))?;
    setup_logger(&args.out_dir, args.verbose)?;

    init(args.threads)?;

    let params = match &args.config {
        Some(config_path) => {
            info!("Using config file: {}", config_path.display());
            ConfigFile::load(config_path)?
        }
        None => ConfigFile::default(),
    };
    let params = params.merge(args.overrides());

    info!("Reading {} sequence files:", args.input.len());
    let mut reads = read_inputs(&args.input)?;
    if !args.dna {
        reads = reads.iter().map(|read| to_rna(read)).collect();
    }

    let config = resolve_config(params, &reads, args.estimate, !args.dna)?;
    let (min_len, max_len) = config.length_window();
    info!(
        "Keeping reads of length {}-{} with forward adapter '{}' and reverse adapter '{}' seen at least {} time(s).",
        min_len, max_len, config.fwd_primer, config.rev_primer, config.min_count
    );

    // filter reads on the background worker while reporting progress
    let processor = ReadProcessor::new()?.with_random_regions(!args.keep_primers);
    processor.set_raw_reads(reads, config);

    let spinner = spinner("Filtering reads");
    while processor.is_processing() {
        spinner.tick();
        thread::sleep(POLL_INTERVAL);
    }
    spinner.finish_and_clear();

    let result = processor.process_result();
    let summary = &result.summary;
    info!("Total reads: {}", summary.num_total.to_formatted_string(&Locale::en));
    info!("Reads passing length and adapter filter: {}", summary.num_filtered.to_formatted_string(&Locale::en));
    info!("Unique reads kept: {}", summary.num_unique.to_formatted_string(&Locale::en));
    info!("Unique ratio: {}", format_ratio(summary.unique_ratio));

    write_reports(&args.out_dir, &result)?;
    info!("Results written to {}", args.out_dir.display());

    info!("Elapsed time (sec): {:.2}", start.elapsed().as_secs_f32());
    info!("Done.");

    Ok(())
}
