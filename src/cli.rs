use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::engine::DEFAULT_THRESHOLD;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Enrich employee rosters with identifiers, resignation dates and org data",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve identifiers for a roster and write the enriched reports
    Enrich(EnrichArgs),
    /// Sort a CSV file by one column, inferring dates and numbers
    Sort(SortArgs),
    /// Show which column each role resolves to in a CSV file
    Roles(RolesArgs),
    /// Score two names against each other under the matching settings
    Compare(CompareArgs),
}

#[derive(Debug, Args)]
pub struct MatchArgs {
    /// Minimum fuzzy score (clamped to 50..=100)
    #[arg(long, default_value_t = DEFAULT_THRESHOLD as i64, allow_negative_numbers = true)]
    pub threshold: i64,
    /// Only accept exact (case-insensitive) name matches
    #[arg(long = "no-fuzzy")]
    pub no_fuzzy: bool,
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct EnrichArgs {
    /// Roster to enrich
    #[arg(short = 'c', long = "current")]
    pub current: PathBuf,
    /// Mapping of system user ids to identifiers
    #[arg(long)]
    pub legacy: Option<PathBuf>,
    /// Roster of active employees
    #[arg(long)]
    pub active: Option<PathBuf>,
    /// Roster of resigned employees
    #[arg(long)]
    pub resigned: Option<PathBuf>,
    /// Directory receiving the report files
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: PathBuf,
    /// Write run statistics as JSON to this path
    #[arg(long)]
    pub summary: Option<PathBuf>,
    #[command(flatten)]
    pub matching: MatchArgs,
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Args)]
pub struct SortArgs {
    /// Input CSV file to sort
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Column label to sort by
    #[arg(short = 'C', long = "column")]
    pub column: String,
    /// Sort direction
    #[arg(long, value_enum, default_value_t = SortDirection::Asc)]
    pub direction: SortDirection,
    /// Shorthand for `--direction desc`
    #[arg(long, conflicts_with = "direction")]
    pub desc: bool,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Render the sorted rows as a table instead of CSV
    #[arg(long = "table", conflicts_with = "output")]
    pub table: bool,
    #[command(flatten)]
    pub input_opts: InputArgs,
}

impl SortArgs {
    pub fn ascending(&self) -> bool {
        !self.desc && self.direction == SortDirection::Asc
    }
}

#[derive(Debug, Args)]
pub struct RolesArgs {
    /// Input CSV file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Also preview the first rows
    #[arg(long, default_value_t = 0)]
    pub preview: usize,
    #[command(flatten)]
    pub input_opts: InputArgs,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// First name
    pub first: String,
    /// Second name
    pub second: String,
    #[command(flatten)]
    pub matching: MatchArgs,
    /// Print the comparison as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
