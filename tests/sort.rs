mod common;

use common::{column, table};
use roster_enrich::{
    data::Value,
    report::{current_view, resigned_view},
    sort::{SortKind, detect_sort_kind, sort_table, sort_values},
};

fn values(raw: &[&str]) -> Vec<Option<Value>> {
    raw.iter().map(|v| Value::from_field(v)).collect()
}

fn shown(values: &[Option<Value>]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.as_ref().map(Value::as_display).unwrap_or_default())
        .collect()
}

#[test]
fn dates_sort_chronologically_with_blanks_last() {
    let input = values(&["02/01/2024", "01/01/2023", ""]);
    assert_eq!(detect_sort_kind(input.iter().map(Option::as_ref)), SortKind::Date);
    assert_eq!(shown(&sort_values(&input, true)), ["01/01/2023", "02/01/2024", ""]);
    assert_eq!(shown(&sort_values(&input, false)), ["02/01/2024", "01/01/2023", ""]);
}

#[test]
fn numbers_sort_numerically_not_lexically() {
    let input = values(&["3", "10", "", "2"]);
    assert_eq!(shown(&sort_values(&input, true)), ["2", "3", "10", ""]);
}

#[test]
fn mostly_numeric_column_sends_text_to_the_end() {
    let input = values(&["5", "1", "x", "3", "2"]);
    assert_eq!(detect_sort_kind(input.iter().map(Option::as_ref)), SortKind::Numeric);
    assert_eq!(shown(&sort_values(&input, false)), ["5", "3", "2", "1", "x"]);
}

#[test]
fn date_mode_needs_more_than_half_dates() {
    let input = values(&["01/02/2024", "03/04/2024", "Floating", ""]);
    assert_eq!(detect_sort_kind(input.iter().map(Option::as_ref)), SortKind::Date);
    let input = values(&["01/02/2024", "Floating"]);
    assert_eq!(detect_sort_kind(input.iter().map(Option::as_ref)), SortKind::Text);
}

#[test]
fn equal_keys_keep_input_order() {
    let sorted = sort_table(
        &table(&["Dept", "Name"], &[&["b", "first"], &["A", "second"], &["B", "third"], &["a", "fourth"]]),
        "Dept",
        true,
    );
    assert_eq!(column(&sorted, "Name"), ["second", "fourth", "first", "third"]);
}

#[test]
fn unknown_column_returns_rows_unchanged() {
    let input = table(&["Name"], &[&["b"], &["a"]]);
    assert_eq!(sort_table(&input, "Missing", true), input);
}

#[test]
fn sorting_is_non_destructive() {
    let input = table(&["PERNR"], &[&["9"], &["1"]]);
    let sorted = sort_table(&input, "PERNR", true);
    assert_eq!(column(&sorted, "PERNR"), ["1", "9"]);
    assert_eq!(column(&input, "PERNR"), ["9", "1"]);
}

#[test]
fn report_views_split_on_resignation() {
    let enriched = table(
        &["Name", "PERNR", "Resignation Date"],
        &[
            &["Ana", "30", "01/15/2023"],
            &["Ben", "4", ""],
            &["Cruz", "12", "06/30/2024"],
            &["Eve", "2", "None"],
        ],
    );
    assert_eq!(column(&resigned_view(&enriched), "Name"), ["Cruz", "Ana"]);
    assert_eq!(column(&current_view(&enriched), "Name"), ["Eve", "Ben"]);
}
