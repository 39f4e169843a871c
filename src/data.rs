//! In-memory tabular model shared by every stage of the enrichment run.
//!
//! A [`Table`] is an ordered list of rows keyed by header position. Cells are
//! `Option<Value>`: `None` is an absent/null cell, which is how empty CSV
//! fields load. No schema is enforced; column roles are discovered later by
//! [`crate::roles`].

use std::{fmt, sync::OnceLock};

use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Value {
    /// Builds a cell from a raw field, treating an empty field as absent.
    pub fn from_field(raw: &str) -> Option<Value> {
        if raw.is_empty() {
            None
        } else {
            Some(Value::Text(raw.to_string()))
        }
    }

    pub fn text(value: impl Into<String>) -> Value {
        Value::Text(value.into())
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(f) => {
                if f.fract() == 0.0 && f.is_finite() && f.abs() < i64::MAX as f64 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Date(d) => format_mdy(*d),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(f) => f.is_nan(),
            Value::Date(_) => false,
        }
    }

    /// Integer form used when identifiers from different tables are compared.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Number(f) => integral(*f),
            Value::Text(s) => parse_number(s).and_then(integral),
            Value::Date(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Returns the trimmed display text of a cell, or `None` when the cell is
/// absent or blank.
pub fn cell_text(cell: Option<&Value>) -> Option<String> {
    let value = cell?;
    if value.is_blank() {
        return None;
    }
    Some(value.as_display().trim().to_string())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<Value>>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(headers: Vec<String>, rows: Vec<Vec<Option<Value>>>) -> Self {
        Table { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row)?.get(column)?.as_ref()
    }

    pub fn push_row(&mut self, mut row: Vec<Option<Value>>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    pub fn set(&mut self, row: usize, column: usize, value: Option<Value>) {
        if let Some(cells) = self.rows.get_mut(row) {
            if column >= cells.len() {
                cells.resize(column + 1, None);
            }
            cells[column] = value;
        }
    }

    /// Returns the index of `name`, appending an empty column when it does not
    /// exist yet. An existing column is reused and its cells are cleared.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            for row in &mut self.rows {
                if let Some(cell) = row.get_mut(idx) {
                    *cell = None;
                }
            }
            return idx;
        }
        self.headers.push(name.to_string());
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, None);
        }
        width - 1
    }

    /// Copies the given rows, in the given order, into a new table with the
    /// same headers.
    pub fn select_rows<I>(&self, indices: I) -> Table
    where
        I: IntoIterator<Item = usize>,
    {
        let rows = indices
            .into_iter()
            .filter_map(|idx| self.rows.get(idx).cloned())
            .collect();
        Table {
            headers: self.headers.clone(),
            rows,
        }
    }

    pub fn column_values(&self, column: usize) -> impl Iterator<Item = Option<&Value>> {
        self.rows.iter().map(move |row| row.get(column).and_then(|c| c.as_ref()))
    }

    /// Rejects tables whose rows do not line up with the header row.
    pub fn validate(&self, label: &str) -> Result<()> {
        for (idx, row) in self.rows.iter().enumerate() {
            if row.len() != self.headers.len() {
                bail!(
                    "{label} row {} has {} cell(s) but the header has {}",
                    idx + 1,
                    row.len(),
                    self.headers.len()
                );
            }
        }
        Ok(())
    }
}

pub fn parse_number(value: &str) -> Option<f64> {
    let parsed: f64 = value.trim().parse().ok()?;
    parsed.is_finite().then_some(parsed)
}

fn integral(value: f64) -> Option<i64> {
    if !value.is_finite() || value.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(value.trunc() as i64)
}

/// Renders a numeric-looking identifier as a clean integer string and leaves
/// anything else as trimmed text.
pub fn canonical_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    match parse_number(trimmed).and_then(integral) {
        Some(number) => number.to_string(),
        None => trimmed.to_string(),
    }
}

fn four_digit_year() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{4}").expect("valid year regex"))
}

pub fn format_mdy(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// Parses the date shapes found in HR exports. Month-first is preferred for
/// ambiguous slash dates.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &[
        "%m/%d/%Y",
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m-%d-%Y",
        "%d-%b-%Y",
        "%d %b %Y",
        "%d %B %Y",
        "%b %d, %Y",
        "%B %d, %Y",
        "%m/%d/%y",
        "%m-%d-%y",
        "%d-%b-%y",
    ];
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y-%m-%d %H:%M",
    ];
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    // %Y also accepts two digits, so it is only tried when a four-digit year is present.
    let full_year = four_digit_year().is_match(trimmed);
    let allowed = |fmt: &&&str| full_year || !fmt.contains("%Y");
    for fmt in DATE_FORMATS.iter().filter(allowed) {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(parsed);
        }
    }
    DATETIME_FORMATS
        .iter()
        .filter(allowed)
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_display_drops_integral_fraction() {
        assert_eq!(Value::Number(5.0).as_display(), "5");
        assert_eq!(Value::Number(2.5).as_display(), "2.5");
    }

    #[test]
    fn canonical_identifier_cleans_numbers_only() {
        assert_eq!(canonical_identifier(" 0012 "), "12");
        assert_eq!(canonical_identifier("1234.0"), "1234");
        assert_eq!(canonical_identifier("SAMU-  "), "SAMU-");
        assert_eq!(canonical_identifier("generic"), "generic");
    }

    #[test]
    fn parse_date_prefers_month_first() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        assert_eq!(parse_date("06/05/2024"), Some(expected));
        assert_eq!(parse_date("2024-06-05"), Some(expected));
        assert_eq!(parse_date("2024-06-05 08:30:00"), Some(expected));
        assert_eq!(parse_date("ACTIVE"), None);
    }

    #[test]
    fn two_digit_years_land_in_the_current_century() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
        assert_eq!(parse_date("03/15/23"), Some(expected));
        assert_eq!(parse_date("15-Mar-23"), Some(expected));
        assert_eq!(parse_date("03/15/2023"), Some(expected));
    }

    #[test]
    fn huge_integral_numbers_are_not_saturated() {
        assert_eq!(Value::Number(1e20).as_display(), "100000000000000000000");
        assert_eq!(Value::Number(-42.0).as_display(), "-42");
    }

    #[test]
    fn ensure_column_appends_then_reuses() {
        let mut table = Table::new(vec!["Name".into()]);
        table.push_row(vec![Value::from_field("Ana")]);
        let idx = table.ensure_column("PERNR");
        assert_eq!(idx, 1);
        table.set(0, idx, Some(Value::text("7")));
        assert_eq!(table.ensure_column("PERNR"), 1);
        assert_eq!(table.get(0, 1), None);
    }

    #[test]
    fn validate_flags_ragged_rows() {
        let table = Table::with_rows(vec!["a".into(), "b".into()], vec![vec![None]]);
        assert!(table.validate("roster").is_err());
    }
}
