//! Command-line interface definition for the raptgen-reads application.
//!
//! This file defines the `Cli` struct using the `clap` crate to parse and validate command-line arguments.
//! It includes options for specifying input FASTA/FASTQ files, the output directory, an optional TOML
//! parameter file, and the preprocessing parameters which override values from that file. Custom value
//! parsers validate the minimum count and the adapter alphabet. The CLI output is styled using the
//! `anstyle` crate for improved readability.

use std::path::PathBuf;

use clap::Parser;

use crate::filter_config::{validate_adapter, validate_min_count, ConfigFile};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(styles=get_styles())]
#[command(disable_help_subcommand = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// FASTA/FASTQ files with raw reads (optionally gzipped)
    #[arg(short = 'i', long, help_heading = "Inputs", required = true, num_args = 1.., value_parser = clap::value_parser!(PathBuf))]
    pub input: Vec<PathBuf>,

    /// TOML file with preprocessing parameters
    #[arg(short = 'c', long, help_heading = "Inputs", value_parser = clap::value_parser!(PathBuf))]
    pub config: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long, help_heading = "Output", value_parser = clap::value_parser!(PathBuf))]
    pub out_dir: PathBuf,

    /// Keep primers in the output instead of reporting random regions
    #[arg(long, help_heading = "Output", default_value_t = false)]
    pub keep_primers: bool,

    /// Expected read length including both adapters
    #[arg(short = 'l', long, help_heading = "Preprocessing parameters")]
    pub target_length: Option<usize>,

    /// Allowed deviation from the target length [default: 0]
    #[arg(short = 't', long, help_heading = "Preprocessing parameters")]
    pub tolerance: Option<usize>,

    /// Minimum number of occurrences for a read to be kept [default: 1]
    #[arg(short = 'm', long, help_heading = "Preprocessing parameters", value_parser = parse_min_count)]
    pub min_count: Option<usize>,

    /// Forward adapter expected at the start of each read
    #[arg(short = 'f', long, help_heading = "Preprocessing parameters", value_parser = parse_adapter)]
    pub fwd_primer: Option<String>,

    /// Reverse adapter expected at the end of each read
    #[arg(short = 'r', long, help_heading = "Preprocessing parameters", value_parser = parse_adapter)]
    pub rev_primer: Option<String>,

    /// Estimate the target length and adapters from the reads when not given
    #[arg(short = 'e', long, help_heading = "Preprocessing parameters", default_value_t = false)]
    pub estimate: bool,

    /// Keep reads as DNA instead of converting T to U
    #[arg(long, default_value_t = false)]
    pub dna: bool,

    /// Number of threads to use for parsing input files
    #[arg(long, default_value_t = 1, value_parser = validate_threads)]
    pub threads: usize,

    /// Report debug messages
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Preprocessing parameters given on the command line.
    pub fn overrides(&self) -> ConfigFile {
        ConfigFile {
            min_count: self.min_count,
            tolerance: self.tolerance,
            target_length: self.target_length,
            fwd_primer: self.fwd_primer.clone(),
            rev_primer: self.rev_primer.clone(),
        }
    }
}

fn parse_min_count(min_count: &str) -> Result<usize, String> {
    let min_count: usize = min_count
        .parse()
        .map_err(|_| format!("`{min_count}` isn't a valid count"))?;

    validate_min_count(min_count).map_err(|err| err.to_string())
}

fn validate_threads(threads: &str) -> Result<usize, String> {
    let threads: usize = threads
        .parse()
        .map_err(|_| format!("`{threads}` isn't a valid value"))?;

    if !(1..=1024).contains(&threads) {
        return Err("Threads must be in the range [1, 1024]".to_string());
    }

    Ok(threads)
}

fn parse_adapter(adapter: &str) -> Result<String, String> {
    validate_adapter(adapter).map_err(|err| err.to_string())
}

fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .usage(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
        .header(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
        .literal(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .invalid(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .error(
            anstyle::Style::new()
                .bold()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
        )
        .valid(
            anstyle::Style::new()
                .bold()
                .underline()
                .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
        )
        .placeholder(
            anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))),
        )
}

#[test]
fn test_verify_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert()
}

#[test]
fn test_parse_overrides() {
    let cli = Cli::parse_from([
        "raptgen-reads", "-i", "a.fastq", "b.fasta", "-o", "out", "-m", "2", "-f", "aucg",
    ]);

    assert_eq!(cli.input.len(), 2);
    let overrides = cli.overrides();
    assert_eq!(overrides.min_count, Some(2));
    assert_eq!(overrides.fwd_primer.as_deref(), Some("AUCG"));
    assert_eq!(overrides.target_length, None);
}

#[test]
fn test_rejects_invalid_values() {
    assert!(Cli::try_parse_from(["raptgen-reads", "-i", "a.fa", "-o", "out", "-m", "0"]).is_err());
    assert!(Cli::try_parse_from(["raptgen-reads", "-i", "a.fa", "-o", "out", "-f", "ACGN"]).is_err());
    assert!(Cli::try_parse_from(["raptgen-reads", "-i", "a.fa", "-o", "out", "--threads", "0"]).is_err());
}
