pub mod cli;
pub mod data;
pub mod engine;
pub mod io_utils;
pub mod pipeline;
pub mod report;
pub mod roles;
pub mod similarity;
pub mod sort;
pub mod table;

use std::{
    env,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use encoding_rs::Encoding;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands},
    data::Table,
    engine::{MatchSettings, MatchingEngine},
    pipeline::{EnrichError, EnrichmentInputs, spawn_enrichment},
    roles::Role,
};

pub const ENRICHED_FILE: &str = "enriched.csv";
pub const UNMATCHED_FILE: &str = "unmatched.csv";
pub const FUZZY_FILE: &str = "fuzzy_matches.csv";
pub const RESIGNED_FILE: &str = "resigned.csv";
pub const CURRENT_FILE: &str = "current.csv";

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("roster_enrich", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Enrich(args) => handle_enrich(&args),
        Commands::Sort(args) => handle_sort(&args),
        Commands::Roles(args) => handle_roles(&args),
        Commands::Compare(args) => handle_compare(&args),
    }
}

fn settings_from(args: &cli::MatchArgs) -> MatchSettings {
    MatchSettings::new(!args.no_fuzzy, args.threshold)
}

fn load_table(
    path: &Path,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Table> {
    let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
    debug!(
        "Loading '{}' with delimiter '{}'",
        path.display(),
        printable_delimiter(delimiter)
    );
    let table = io_utils::read_table(path, delimiter, encoding)?;
    info!(
        "Loaded {} row(s) x {} column(s) from {:?}",
        table.len(),
        table.headers.len(),
        path
    );
    Ok(table)
}

fn load_optional(
    path: Option<&PathBuf>,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Option<Table>> {
    path.map(|p| load_table(p, delimiter, encoding)).transpose()
}

fn handle_enrich(args: &cli::EnrichArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input.input_encoding.as_deref())?;
    let delimiter = args.input.delimiter;
    let mut inputs = EnrichmentInputs::new(load_table(&args.current, delimiter, encoding)?);
    inputs.legacy = load_optional(args.legacy.as_ref(), delimiter, encoding)?;
    inputs.active = load_optional(args.active.as_ref(), delimiter, encoding)?;
    inputs.resigned = load_optional(args.resigned.as_ref(), delimiter, encoding)?;
    if inputs.active.is_none() && inputs.resigned.is_none() {
        warn!("No reference roster supplied; only the legacy mapping can resolve identifiers");
    }

    let settings = settings_from(&args.matching);
    let job = spawn_enrichment(inputs, settings);
    for event in job.progress().iter() {
        info!("[{:>3.0}%] {}", event.fraction * 100.0, event.status);
    }
    let result = job.join().map_err(|err| match err {
        EnrichError::Cancelled => anyhow!("Enrichment was cancelled; no reports written"),
        EnrichError::Failed(reason) => anyhow!("Enrichment failed: {reason}"),
    })?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Creating output directory {:?}", args.output_dir))?;
    let resigned = report::resigned_view(&result.enriched);
    let current = report::current_view(&result.enriched);
    let outputs = [
        (ENRICHED_FILE, &result.enriched),
        (UNMATCHED_FILE, &result.unmatched),
        (FUZZY_FILE, &result.fuzzy_matched),
        (RESIGNED_FILE, &resigned),
        (CURRENT_FILE, &current),
    ];
    for (name, view) in outputs {
        let path = args.output_dir.join(name);
        io_utils::write_table(&path, view, io_utils::DEFAULT_CSV_DELIMITER)?;
        info!("Wrote {} row(s) to {:?}", view.len(), path);
    }

    if let Some(summary) = &args.summary {
        let json = serde_json::to_string_pretty(&result.stats)
            .context("Serializing enrichment statistics")?;
        fs::write(summary, json).with_context(|| format!("Writing summary to {summary:?}"))?;
    }

    let stats = result.stats;
    println!(
        "Total: {}  Matched: {}  Unmatched: {}  Fuzzy: {}",
        stats.total, stats.matched, stats.unmatched, stats.fuzzy_matched
    );
    Ok(())
}

fn handle_sort(args: &cli::SortArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_opts.input_encoding.as_deref())?;
    let input_delimiter = io_utils::resolve_input_delimiter(&args.input, args.input_opts.delimiter);
    let loaded = load_table(&args.input, Some(input_delimiter), encoding)?;
    if loaded.column_index(&args.column).is_none() {
        return Err(anyhow!(
            "Column '{}' not found in {:?}",
            args.column,
            args.input
        ));
    }
    let ascending = args.ascending();
    let sorted = sort::sort_table(&loaded, &args.column, ascending);
    info!("Sorted by {}", sort::direction_indicator(&args.column, ascending));

    if args.table {
        print!("{}", table::render_preview(&sorted, sorted.len()));
        return Ok(());
    }
    match &args.output {
        Some(path) => {
            let delimiter = io_utils::resolve_output_delimiter(path, input_delimiter);
            io_utils::write_table(path, &sorted, delimiter)
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            io_utils::write_table_to(&mut handle, &sorted, input_delimiter)?;
            handle.flush().context("Flushing stdout")
        }
    }
}

fn handle_roles(args: &cli::RolesArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_opts.input_encoding.as_deref())?;
    let loaded = load_table(&args.input, args.input_opts.delimiter, encoding)?;
    let pairs: Vec<(String, String)> = Role::all()
        .into_iter()
        .map(|role| {
            let column = roles::resolve_label(&loaded.headers, role)
                .map(str::to_string)
                .unwrap_or_else(|| "-".to_string());
            (role.to_string(), column)
        })
        .collect();
    print!("{}", table::render_pairs(&pairs));
    if args.preview > 0 {
        println!();
        print!("{}", table::render_preview(&loaded, args.preview));
    }
    Ok(())
}

fn handle_compare(args: &cli::CompareArgs) -> Result<()> {
    let engine = MatchingEngine::new(settings_from(&args.matching));
    let comparison = engine.compare_names(&args.first, &args.second);
    if args.json {
        let json = serde_json::to_string_pretty(&comparison).context("Serializing comparison")?;
        println!("{json}");
        return Ok(());
    }
    let pairs = vec![
        ("exact match".to_string(), comparison.exact_match.to_string()),
        ("ratio".to_string(), format!("{:.0}", comparison.scores.ratio)),
        ("partial ratio".to_string(), format!("{:.0}", comparison.scores.partial)),
        ("name order".to_string(), format!("{:.0}", comparison.scores.name_order)),
        ("final score".to_string(), format!("{:.0}", comparison.final_score)),
        ("threshold".to_string(), comparison.threshold.to_string()),
        ("fuzzy enabled".to_string(), comparison.fuzzy_enabled.to_string()),
        ("would match".to_string(), comparison.would_match.to_string()),
    ];
    print!("{}", table::render_pairs(&pairs));
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
