//! Type-inferring, non-destructive column sort used for every report view.
//!
//! The sort mode is picked from the column's non-blank values: mostly
//! `MM/DD/YYYY` dates sort chronologically, mostly numbers sort numerically,
//! anything else sorts case-insensitively. Blank cells, and cells that do not
//! fit the chosen mode, always go last. Equal keys keep their input order.

use std::{cmp::Ordering, sync::OnceLock};

use chrono::{Datelike, NaiveDate};
use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::data::{Table, Value};

/// Share of non-blank values that must be dates for a date sort.
const DATE_SHARE: f64 = 0.5;
/// Share of non-blank values that must be numeric for a numeric sort.
const NUMERIC_SHARE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortKind {
    Date,
    Numeric,
    Text,
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid date regex"))
}

/// Parses a strict `MM/DD/YYYY` value into a comparable `YYYYMMDD` integer.
pub fn strict_mdy_key(value: &str) -> Option<u32> {
    let caps = date_pattern().captures(value.trim())?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date_key(date))
}

fn date_key(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

fn as_date_key(value: &Value) -> Option<u32> {
    match value {
        Value::Date(date) => Some(date_key(*date)),
        Value::Text(text) => strict_mdy_key(text),
        Value::Number(_) => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Text(text) => text.trim().parse().ok(),
        Value::Date(_) => None,
    }
}

pub fn detect_sort_kind<'a, I>(values: I) -> SortKind
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    let mut present = 0usize;
    let mut dates = 0usize;
    let mut numbers = 0usize;
    for value in values.into_iter().flatten() {
        if value.is_blank() {
            continue;
        }
        present += 1;
        if as_date_key(value).is_some() {
            dates += 1;
        } else if as_number(value).is_some() {
            numbers += 1;
        }
    }
    if present == 0 {
        return SortKind::Text;
    }
    let total = present as f64;
    if dates as f64 / total > DATE_SHARE {
        SortKind::Date
    } else if numbers as f64 / total > NUMERIC_SHARE {
        SortKind::Numeric
    } else {
        SortKind::Text
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Date(u32),
    Number(f64),
    Text(String),
}

impl SortKey {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

fn sort_key(value: Option<&Value>, kind: SortKind) -> Option<SortKey> {
    let value = value.filter(|v| !v.is_blank())?;
    match kind {
        SortKind::Date => as_date_key(value).map(SortKey::Date),
        SortKind::Numeric => as_number(value).map(SortKey::Number),
        SortKind::Text => Some(SortKey::Text(value.as_display().trim().to_lowercase())),
    }
}

/// Row order that sorts `values`; keyless entries trail in input order.
pub fn sorted_order<'a, I>(values: I, ascending: bool) -> Vec<usize>
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    let values: Vec<Option<&Value>> = values.into_iter().collect();
    let kind = detect_sort_kind(values.iter().copied());
    let keys: Vec<Option<SortKey>> = values.iter().map(|v| sort_key(*v, kind)).collect();
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| match (&keys[a], &keys[b]) {
        (Some(left), Some(right)) => {
            let ordering = left.compare(right);
            if ascending { ordering } else { ordering.reverse() }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    order
}

/// Returns a sorted copy of `table`. An unknown column leaves the row order
/// unchanged.
pub fn sort_table(table: &Table, column: &str, ascending: bool) -> Table {
    let Some(idx) = table.column_index(column) else {
        debug!("Sort column '{column}' not present; returning rows unchanged");
        return table.clone();
    };
    let order = sorted_order(table.column_values(idx), ascending);
    table.select_rows(order)
}

pub fn sort_values(values: &[Option<Value>], ascending: bool) -> Vec<Option<Value>> {
    sorted_order(values.iter().map(Option::as_ref), ascending)
        .into_iter()
        .map(|idx| values[idx].clone())
        .collect()
}

/// Column caption with a direction arrow, as shown in sorted previews.
pub fn direction_indicator(column: &str, ascending: bool) -> String {
    let arrow = if ascending { '\u{2191}' } else { '\u{2193}' };
    format!("{column} {arrow}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(values: &[&str]) -> Vec<Option<Value>> {
        values.iter().map(|v| Value::from_field(v)).collect()
    }

    fn shown(values: &[Option<Value>]) -> Vec<String> {
        values
            .iter()
            .map(|v| v.as_ref().map(Value::as_display).unwrap_or_default())
            .collect()
    }

    #[test]
    fn strict_dates_reject_impossible_days() {
        assert_eq!(strict_mdy_key("02/29/2024"), Some(20240229));
        assert_eq!(strict_mdy_key("02/30/2024"), None);
        assert_eq!(strict_mdy_key("2024-02-01"), None);
    }

    #[test]
    fn numeric_sort_keeps_blank_last_in_both_directions() {
        let values = texts(&["3", "10", "", "2"]);
        assert_eq!(shown(&sort_values(&values, true)), ["2", "3", "10", ""]);
        assert_eq!(shown(&sort_values(&values, false)), ["10", "3", "2", ""]);
    }

    #[test]
    fn mixed_text_sorts_case_insensitively() {
        let values = texts(&["beta", "Alpha", "", "gamma"]);
        assert_eq!(detect_sort_kind(values.iter().map(Option::as_ref)), SortKind::Text);
        assert_eq!(shown(&sort_values(&values, true)), ["Alpha", "beta", "gamma", ""]);
    }

    #[test]
    fn direction_indicator_uses_arrows() {
        assert_eq!(direction_indicator("PERNR", true), "PERNR \u{2191}");
        assert_eq!(direction_indicator("PERNR", false), "PERNR \u{2193}");
    }
}
