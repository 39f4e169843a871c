//! Cascading identifier resolution against reference rosters.
//!
//! Lookups here never fail: a missing column, an unparseable identifier, or
//! an absent cell all degrade to "nothing found" so that whatever earlier
//! cascade steps produced is kept.

use std::fmt;

use log::trace;
use serde::Serialize;

use crate::{
    data::{Table, Value, canonical_identifier, cell_text, format_mdy, parse_date},
    roles::{OrgAttribute, TableRoles},
    similarity::{self, NameScores},
};

pub const MIN_THRESHOLD: u8 = 50;
pub const MAX_THRESHOLD: u8 = 100;
pub const DEFAULT_THRESHOLD: u8 = 80;

/// Tokens that mark an identifier cell as deliberately empty.
pub const INVALID_IDENTIFIER_TOKENS: &[&str] = &[
    "cant find",
    "can't find",
    "cannot find",
    "not found",
    "unknown",
    "n/a",
    "na",
    "null",
    "none",
    "empty",
    "missing",
    "error",
    "invalid",
    "invalid pernr",
    "no match",
    "no data",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchSettings {
    fuzzy_enabled: bool,
    threshold: u8,
}

impl MatchSettings {
    pub fn new(fuzzy_enabled: bool, threshold: i64) -> Self {
        let clamped = threshold.clamp(MIN_THRESHOLD as i64, MAX_THRESHOLD as i64) as u8;
        MatchSettings {
            fuzzy_enabled,
            threshold: clamped,
        }
    }

    pub fn fuzzy_enabled(&self) -> bool {
        self.fuzzy_enabled
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        MatchSettings::new(true, DEFAULT_THRESHOLD as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    IdentifierMatch,
    ExactNameMatch,
    FuzzyNameMatch,
    NoMatch,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::IdentifierMatch => "identifier_match",
            MatchType::ExactNameMatch => "exact_name_match",
            MatchType::FuzzyNameMatch => "fuzzy_name_match",
            MatchType::NoMatch => "no_match",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameMatch {
    pub identifier: Option<String>,
    pub full_name: Option<String>,
    pub match_type: MatchType,
    pub score: f64,
}

impl NameMatch {
    pub fn none() -> Self {
        NameMatch {
            identifier: None,
            full_name: None,
            match_type: MatchType::NoMatch,
            score: 0.0,
        }
    }
}

/// A read-only reference table with its column roles resolved up front.
#[derive(Debug, Clone)]
pub struct ReferenceTable<'a> {
    pub table: &'a Table,
    pub roles: TableRoles,
}

impl<'a> ReferenceTable<'a> {
    pub fn new(table: &'a Table) -> Self {
        ReferenceTable {
            table,
            roles: TableRoles::resolve(&table.headers),
        }
    }

    /// First row whose identifier column equals `identifier` numerically.
    pub fn find_by_identifier(&self, identifier: &str) -> Option<usize> {
        let wanted = Value::text(identifier).as_integer()?;
        let column = self.roles.identifier?;
        self.table
            .column_values(column)
            .position(|cell| cell.and_then(Value::as_integer) == Some(wanted))
    }

    /// Rows with both a non-blank name and a usable identifier, in row order.
    fn name_candidates(
        &self,
        name_column: usize,
        identifier_column: usize,
    ) -> impl Iterator<Item = (String, String)> + '_ {
        (0..self.table.len()).filter_map(move |row| {
            let name = self.text_at(row, Some(name_column))?;
            let identifier = reference_identifier(self.table.get(row, identifier_column))?;
            Some((name, identifier))
        })
    }

    fn text_at(&self, row: usize, column: Option<usize>) -> Option<String> {
        cell_text(self.table.get(row, column?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrgAttributes {
    values: [Option<String>; 5],
}

impl OrgAttributes {
    pub fn get(&self, attr: OrgAttribute) -> Option<&str> {
        self.values[attr.index()].as_deref()
    }

    pub fn set(&mut self, attr: OrgAttribute, value: Option<String>) {
        self.values[attr.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (OrgAttribute, Option<&str>)> {
        OrgAttribute::ALL
            .into_iter()
            .map(|attr| (attr, self.get(attr)))
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

/// Result of comparing two names under the current settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameComparison {
    pub exact_match: bool,
    pub scores: NameScores,
    pub final_score: f64,
    pub threshold: u8,
    pub fuzzy_enabled: bool,
    pub would_match: bool,
}

pub fn is_valid_identifier(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    let lowered = trimmed.to_lowercase();
    !INVALID_IDENTIFIER_TOKENS.contains(&lowered.as_str())
}

#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    settings: MatchSettings,
}

impl MatchingEngine {
    pub fn new(settings: MatchSettings) -> Self {
        MatchingEngine { settings }
    }

    pub fn settings(&self) -> MatchSettings {
        self.settings
    }

    pub fn update_settings(&mut self, fuzzy_enabled: bool, threshold: i64) {
        self.settings = MatchSettings::new(fuzzy_enabled, threshold);
    }

    /// Maps a system user id to an identifier through the legacy table. The
    /// identifier is returned trimmed but otherwise verbatim.
    pub fn resolve_by_identifier(
        &self,
        legacy_value: &Value,
        legacy: &ReferenceTable<'_>,
    ) -> Option<String> {
        let key_column = legacy.roles.legacy_identifier?;
        let identifier_column = legacy.roles.identifier?;
        let wanted = legacy_value.as_display();
        let wanted = wanted.trim();
        if wanted.is_empty() {
            return None;
        }
        let row = legacy.table.column_values(key_column).position(|cell| {
            cell.map(|v| v.as_display().trim() == wanted)
                .unwrap_or(false)
        })?;
        let raw = legacy.table.get(row, identifier_column)?.as_display();
        if !is_valid_identifier(&raw) {
            trace!("Legacy row {} for '{wanted}' carries invalid identifier '{raw}'", row + 1);
            return None;
        }
        Some(raw.trim().to_string())
    }

    /// Exact (case-insensitive, trimmed) name lookup, then fuzzy search when
    /// enabled. The first row reaching the best fuzzy score wins ties.
    pub fn resolve_by_name(&self, name: &str, reference: &ReferenceTable<'_>) -> NameMatch {
        let (Some(name_column), Some(identifier_column)) =
            (reference.roles.name, reference.roles.identifier)
        else {
            return NameMatch::none();
        };
        let wanted = similarity::normalize_name(name);
        if wanted.is_empty() {
            return NameMatch::none();
        }

        if let Some((full_name, identifier)) = reference
            .name_candidates(name_column, identifier_column)
            .find(|(candidate, _)| similarity::normalize_name(candidate) == wanted)
        {
            return NameMatch {
                identifier: Some(identifier),
                full_name: Some(full_name),
                match_type: MatchType::ExactNameMatch,
                score: 100.0,
            };
        }

        if !self.settings.fuzzy_enabled {
            return NameMatch::none();
        }

        let threshold = self.settings.threshold as f64;
        let mut best: Option<(f64, String, String)> = None;
        for (candidate, identifier) in reference.name_candidates(name_column, identifier_column) {
            let score = similarity::similarity(&wanted, &candidate);
            let best_score = best.as_ref().map(|(s, _, _)| *s).unwrap_or(0.0);
            if score > best_score && score >= threshold {
                best = Some((score, candidate, identifier));
            }
        }
        match best {
            Some((score, full_name, identifier)) => NameMatch {
                identifier: Some(identifier),
                full_name: Some(full_name),
                match_type: MatchType::FuzzyNameMatch,
                score,
            },
            None => NameMatch::none(),
        }
    }

    pub fn resolve_full_name(&self, identifier: &str, reference: &ReferenceTable<'_>) -> Option<String> {
        let row = reference.find_by_identifier(identifier)?;
        reference.text_at(row, reference.roles.name)
    }

    pub fn resolve_organizational_attributes(
        &self,
        identifier: &str,
        org: &ReferenceTable<'_>,
    ) -> OrgAttributes {
        let mut attributes = OrgAttributes::default();
        let Some(row) = org.find_by_identifier(identifier) else {
            return attributes;
        };
        for attr in OrgAttribute::ALL {
            attributes.set(attr, org.text_at(row, org.roles.organizational(attr)));
        }
        attributes
    }

    /// Resignation date as MM/DD/YYYY, or the verbatim status token when the
    /// cell is not a date.
    pub fn resolve_resignation(&self, identifier: &str, resigned: &ReferenceTable<'_>) -> Option<String> {
        let row = resigned.find_by_identifier(identifier)?;
        let cell = resigned.table.get(row, resigned.roles.resignation?)?;
        if cell.is_blank() {
            return None;
        }
        match cell {
            Value::Date(date) => Some(format_mdy(*date)),
            Value::Text(raw) => {
                let trimmed = raw.trim();
                Some(parse_date(trimmed).map(format_mdy).unwrap_or_else(|| trimmed.to_string()))
            }
            Value::Number(_) => Some(cell.as_display()),
        }
    }

    pub fn compare_names(&self, a: &str, b: &str) -> NameComparison {
        let exact_match = similarity::normalize_name(a) == similarity::normalize_name(b);
        let scores = similarity::score_breakdown(a, b);
        let final_score = scores.best();
        let would_match = exact_match
            || (self.settings.fuzzy_enabled && final_score >= self.settings.threshold as f64);
        NameComparison {
            exact_match,
            scores,
            final_score,
            threshold: self.settings.threshold,
            fuzzy_enabled: self.settings.fuzzy_enabled,
            would_match,
        }
    }
}

fn reference_identifier(cell: Option<&Value>) -> Option<String> {
    let raw = cell_text(cell)?;
    is_valid_identifier(&raw).then(|| canonical_identifier(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_clamp_threshold() {
        assert_eq!(MatchSettings::new(true, 10).threshold(), MIN_THRESHOLD);
        assert_eq!(MatchSettings::new(true, 250).threshold(), MAX_THRESHOLD);
        assert_eq!(MatchSettings::new(false, 75).threshold(), 75);
    }

    #[test]
    fn invalid_identifier_tokens_are_case_insensitive() {
        assert!(!is_valid_identifier("Cant Find"));
        assert!(!is_valid_identifier("  N/A "));
        assert!(!is_valid_identifier("   "));
        assert!(is_valid_identifier("SAMU-  "));
        assert!(is_valid_identifier("generic"));
    }

    #[test]
    fn match_type_renders_snake_case() {
        assert_eq!(MatchType::FuzzyNameMatch.to_string(), "fuzzy_name_match");
        assert_eq!(
            serde_json::to_string(&MatchType::IdentifierMatch).unwrap(),
            "\"identifier_match\""
        );
    }
}
