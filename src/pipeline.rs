//! Enrichment run over the roster being cleaned.
//!
//! Each row goes through the cascade: legacy user-id lookup, then exact and
//! fuzzy name lookup against the current roster and then the resigned
//! roster. Once an identifier is known the full name, resignation value and
//! organizational attributes are filled in. Results are only handed back when
//! every row has been processed; a cancelled or failed run yields no tables.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver},
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use itertools::Itertools;
use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::{
    data::{Table, Value, canonical_identifier, cell_text},
    engine::{MatchSettings, MatchType, MatchingEngine, NameMatch, OrgAttributes, ReferenceTable},
    roles::{OrgAttribute, TableRoles},
};

pub const IDENTIFIER_COLUMN: &str = "PERNR";
pub const FULL_NAME_COLUMN: &str = "Full Name (Reference)";
pub const FULL_NAME_SOURCE_COLUMN: &str = "Full Name Source";
pub const RESIGNATION_COLUMN: &str = "Resignation Date";
pub const MATCH_TYPE_COLUMN: &str = "Match Type";
pub const MATCH_SCORE_COLUMN: &str = "Match Score";

const ROWS_START: f32 = 0.20;
const ROWS_SPAN: f32 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NameSource {
    CurrentRoster,
    ResignedRoster,
}

impl NameSource {
    pub fn label(self) -> &'static str {
        match self {
            NameSource::CurrentRoster => "Current Roster",
            NameSource::ResignedRoster => "Resigned Roster",
        }
    }
}

/// What the cascade found for a single roster row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentRecord {
    pub identifier: Option<String>,
    pub full_name: Option<String>,
    pub full_name_source: Option<NameSource>,
    pub resignation: Option<String>,
    pub organizational: OrgAttributes,
    pub match_type: MatchType,
    pub match_score: f64,
}

impl Default for EnrichmentRecord {
    fn default() -> Self {
        EnrichmentRecord {
            identifier: None,
            full_name: None,
            full_name_source: None,
            resignation: None,
            organizational: OrgAttributes::default(),
            match_type: MatchType::NoMatch,
            match_score: 0.0,
        }
    }
}

/// Tables supplied to a run. Reference tables are never modified.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentInputs {
    pub current: Table,
    pub legacy: Option<Table>,
    pub active: Option<Table>,
    pub resigned: Option<Table>,
}

impl EnrichmentInputs {
    pub fn new(current: Table) -> Self {
        EnrichmentInputs {
            current,
            ..Default::default()
        }
    }

    pub fn with_legacy(mut self, legacy: Table) -> Self {
        self.legacy = Some(legacy);
        self
    }

    pub fn with_active(mut self, active: Table) -> Self {
        self.active = Some(active);
        self
    }

    pub fn with_resigned(mut self, resigned: Table) -> Self {
        self.resigned = Some(resigned);
        self
    }

    fn validate(&self) -> Result<(), EnrichError> {
        if self.current.headers.is_empty() {
            return Err(EnrichError::Failed(
                "current roster has no columns".to_string(),
            ));
        }
        let tables = [
            ("current roster", Some(&self.current)),
            ("legacy mapping", self.legacy.as_ref()),
            ("active roster", self.active.as_ref()),
            ("resigned roster", self.resigned.as_ref()),
        ];
        for (label, table) in tables {
            if let Some(table) = table {
                table
                    .validate(label)
                    .map_err(|err| EnrichError::Failed(format!("{err:#}")))?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentStats {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub fuzzy_matched: usize,
}

impl EnrichmentStats {
    pub fn from_records(records: &[EnrichmentRecord]) -> Self {
        let matched = records.iter().filter(|r| r.identifier.is_some()).count();
        let fuzzy_matched = records
            .iter()
            .filter(|r| r.identifier.is_some() && r.match_type == MatchType::FuzzyNameMatch)
            .count();
        EnrichmentStats {
            total: records.len(),
            matched,
            unmatched: records.len() - matched,
            fuzzy_matched,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentResult {
    pub enriched: Table,
    pub unmatched: Table,
    pub fuzzy_matched: Table,
    pub records: Vec<EnrichmentRecord>,
    pub stats: EnrichmentStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub fraction: f32,
    pub status: String,
}

impl Progress {
    fn new(fraction: f32, status: impl Into<String>) -> Self {
        Progress {
            fraction,
            status: status.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnrichError {
    #[error("enrichment cancelled")]
    Cancelled,
    #[error("enrichment failed: {0}")]
    Failed(String),
}

/// Shared flag polled once per row.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct References<'a> {
    legacy: Option<ReferenceTable<'a>>,
    active: Option<ReferenceTable<'a>>,
    resigned: Option<ReferenceTable<'a>>,
}

pub fn run_enrichment<F>(
    inputs: &EnrichmentInputs,
    settings: MatchSettings,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<EnrichmentResult, EnrichError>
where
    F: FnMut(Progress),
{
    let started = Instant::now();
    on_progress(Progress::new(0.0, "Starting enrichment..."));
    inputs.validate()?;
    on_progress(Progress::new(0.10, "Loading and validating data..."));

    let engine = MatchingEngine::new(settings);
    let current_roles = TableRoles::resolve(&inputs.current.headers);
    let references = References {
        legacy: inputs.legacy.as_ref().filter(|t| !t.is_empty()).map(ReferenceTable::new),
        active: inputs.active.as_ref().map(ReferenceTable::new),
        resigned: inputs.resigned.as_ref().map(ReferenceTable::new),
    };
    if current_roles.display_name.is_none() {
        warn!("Current roster has no name-like column; name matching is disabled for this run");
    }
    let lookup_method = if references.legacy.is_some() {
        "User ID lookup + name fallback"
    } else {
        "name matching only"
    };
    let fuzzy_status = if settings.fuzzy_enabled() {
        format!("fuzzy threshold {}", settings.threshold())
    } else {
        "exact matching only".to_string()
    };
    info!(
        "Enriching {} row(s) using {lookup_method} ({fuzzy_status})",
        inputs.current.len()
    );
    on_progress(Progress::new(
        ROWS_START,
        format!("Looking up identifiers, names, resignations and organizational data ({lookup_method}, {fuzzy_status})..."),
    ));

    let total = inputs.current.len();
    let mut records = Vec::with_capacity(total);
    for row in 0..total {
        if cancel.is_cancelled() {
            info!("Enrichment cancelled after {row} of {total} row(s)");
            on_progress(Progress::new(0.0, "Enrichment cancelled by user"));
            return Err(EnrichError::Cancelled);
        }
        let record = enrich_row(&engine, &inputs.current, row, &current_roles, &references);
        debug!(
            "Row {}: {} (score {:.1}) -> {:?}",
            row + 1,
            record.match_type,
            record.match_score,
            record.identifier
        );
        records.push(record);

        let processed = row + 1;
        let fraction = ROWS_START + (processed as f32 / total as f32) * ROWS_SPAN;
        let per_row = started.elapsed().as_secs_f64() / processed as f64;
        let remaining = per_row * (total - processed) as f64;
        on_progress(Progress::new(
            fraction,
            format!(
                "Processing row {processed} of {total}... (Est. {} remaining)",
                format_eta(remaining)
            ),
        ));
    }

    on_progress(Progress::new(0.95, "Generating clean reports..."));
    let result = finalize(&inputs.current, records);
    info!(
        "Enrichment complete: {} total, {} matched, {} unmatched, {} fuzzy",
        result.stats.total, result.stats.matched, result.stats.unmatched, result.stats.fuzzy_matched
    );
    on_progress(Progress::new(1.0, "Enrichment completed successfully!"));
    Ok(result)
}

fn enrich_row(
    engine: &MatchingEngine,
    current: &Table,
    row: usize,
    roles: &TableRoles,
    references: &References<'_>,
) -> EnrichmentRecord {
    let mut record = EnrichmentRecord::default();

    if let (Some(legacy), Some(column)) = (&references.legacy, roles.legacy_identifier) {
        if let Some(user_id) = current.get(row, column) {
            if let Some(identifier) = engine.resolve_by_identifier(user_id, legacy) {
                record.identifier = Some(identifier);
                record.match_type = MatchType::IdentifierMatch;
                record.match_score = 100.0;
            }
        }
    }

    if record.identifier.is_none() {
        if let Some(name) = roles.display_name.and_then(|c| cell_text(current.get(row, c))) {
            let attempts = [
                (&references.active, NameSource::CurrentRoster),
                (&references.resigned, NameSource::ResignedRoster),
            ];
            for (reference, source) in attempts {
                let Some(reference) = reference else { continue };
                let found = engine.resolve_by_name(&name, reference);
                if found.identifier.is_some() {
                    apply_name_match(&mut record, found, source);
                    break;
                }
            }
        }
    }

    let Some(identifier) = record.identifier.clone() else {
        return record;
    };

    if record.full_name.is_none() {
        let lookups = [
            (&references.active, NameSource::CurrentRoster),
            (&references.resigned, NameSource::ResignedRoster),
        ];
        for (reference, source) in lookups {
            let Some(reference) = reference else { continue };
            if let Some(full_name) = engine.resolve_full_name(&identifier, reference) {
                record.full_name = Some(full_name);
                record.full_name_source = Some(source);
                break;
            }
        }
    }

    if let Some(resigned) = &references.resigned {
        record.resignation = engine.resolve_resignation(&identifier, resigned);
    }
    if let Some(active) = &references.active {
        record.organizational = engine.resolve_organizational_attributes(&identifier, active);
    }
    record
}

fn apply_name_match(record: &mut EnrichmentRecord, found: NameMatch, source: NameSource) {
    record.full_name_source = found.full_name.as_ref().map(|_| source);
    record.identifier = found.identifier;
    record.full_name = found.full_name;
    record.match_type = found.match_type;
    record.match_score = found.score;
}

fn finalize(current: &Table, mut records: Vec<EnrichmentRecord>) -> EnrichmentResult {
    for record in &mut records {
        record.identifier = record.identifier.as_deref().map(canonical_identifier);
    }

    let mut enriched = current.clone();
    let identifier_col = enriched.ensure_column(IDENTIFIER_COLUMN);
    let full_name_col = enriched.ensure_column(FULL_NAME_COLUMN);
    let source_col = enriched.ensure_column(FULL_NAME_SOURCE_COLUMN);
    let resignation_col = enriched.ensure_column(RESIGNATION_COLUMN);
    let org_cols: Vec<(OrgAttribute, usize)> = OrgAttribute::ALL
        .into_iter()
        .map(|attr| (attr, enriched.ensure_column(attr.label())))
        .collect();
    let match_type_col = enriched.ensure_column(MATCH_TYPE_COLUMN);
    let match_score_col = enriched.ensure_column(MATCH_SCORE_COLUMN);

    for (row, record) in records.iter().enumerate() {
        enriched.set(row, identifier_col, record.identifier.clone().map(Value::Text));
        enriched.set(row, full_name_col, record.full_name.clone().map(Value::Text));
        enriched.set(
            row,
            source_col,
            record.full_name_source.map(|s| Value::text(s.label())),
        );
        enriched.set(row, resignation_col, record.resignation.clone().map(Value::Text));
        for (attr, col) in &org_cols {
            enriched.set(
                row,
                *col,
                record.organizational.get(*attr).map(Value::text),
            );
        }
        enriched.set(row, match_type_col, Some(Value::text(record.match_type.as_str())));
        enriched.set(
            row,
            match_score_col,
            Some(Value::Text(format!("{:.1}", record.match_score))),
        );
    }

    let unmatched = enriched.select_rows(records.iter().positions(|r| r.identifier.is_none()));
    let fuzzy_matched = enriched.select_rows(
        records
            .iter()
            .positions(|r| r.identifier.is_some() && r.match_type == MatchType::FuzzyNameMatch),
    );
    let stats = EnrichmentStats::from_records(&records);
    EnrichmentResult {
        enriched,
        unmatched,
        fuzzy_matched,
        records,
        stats,
    }
}

pub fn format_eta(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

/// Handle to an enrichment run executing on a worker thread.
pub struct EnrichmentJob {
    cancel: CancellationToken,
    progress: Receiver<Progress>,
    handle: JoinHandle<Result<EnrichmentResult, EnrichError>>,
}

impl EnrichmentJob {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn progress(&self) -> &Receiver<Progress> {
        &self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the worker and returns its terminal outcome.
    pub fn join(self) -> Result<EnrichmentResult, EnrichError> {
        self.handle.join().unwrap_or_else(|_| {
            Err(EnrichError::Failed(
                "enrichment worker panicked".to_string(),
            ))
        })
    }
}

pub fn spawn_enrichment(inputs: EnrichmentInputs, settings: MatchSettings) -> EnrichmentJob {
    let (tx, rx) = mpsc::channel::<Progress>();
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();
    let handle = thread::spawn(move || {
        run_enrichment(&inputs, settings, &worker_cancel, |progress| {
            let _ = tx.send(progress);
        })
    });
    EnrichmentJob {
        cancel,
        progress: rx,
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_formats_by_magnitude() {
        assert_eq!(format_eta(42.9), "42s");
        assert_eq!(format_eta(125.0), "2m 5s");
        assert_eq!(format_eta(7322.0), "2h 2m");
    }

    #[test]
    fn stats_count_fuzzy_only_when_identified() {
        let records = vec![
            EnrichmentRecord {
                identifier: Some("1".into()),
                match_type: MatchType::FuzzyNameMatch,
                match_score: 85.0,
                ..Default::default()
            },
            EnrichmentRecord::default(),
        ];
        let stats = EnrichmentStats::from_records(&records);
        assert_eq!(
            stats,
            EnrichmentStats {
                total: 2,
                matched: 1,
                unmatched: 1,
                fuzzy_matched: 1
            }
        );
    }

    #[test]
    fn empty_current_roster_fails() {
        let inputs = EnrichmentInputs::new(Table::default());
        let err = run_enrichment(&inputs, MatchSettings::default(), &CancellationToken::new(), |_| {})
            .unwrap_err();
        assert!(matches!(err, EnrichError::Failed(_)));
    }
}
