use std::fmt::Write as _;

use crate::data::{Table, Value};

/// Renders `table` as aligned columns, showing at most `limit` rows.
pub fn render_preview(table: &Table, limit: usize) -> String {
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .take(limit)
        .map(|row| {
            (0..table.headers.len())
                .map(|idx| {
                    row.get(idx)
                        .and_then(Option::as_ref)
                        .map(Value::as_display)
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();
    let mut output = render_grid(&table.headers, &rows);
    if table.len() > limit {
        let _ = writeln!(output, "... {} more row(s)", table.len() - limit);
    }
    output
}

/// Renders two-column `label  value` lines with the labels aligned.
pub fn render_pairs(pairs: &[(String, String)]) -> String {
    let width = pairs.iter().map(|(label, _)| cell_width(label)).max().unwrap_or(0);
    let mut output = String::new();
    for (label, value) in pairs {
        let padding = width - cell_width(label);
        let _ = writeln!(output, "{label}{}  {}", " ".repeat(padding), flatten(value));
    }
    output
}

pub fn render_grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| cell_width(h).max(3)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", join_padded(headers, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(output, "{}", join_padded(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", join_padded(row, &widths));
    }
    output
}

fn join_padded(cells: &[String], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let text = flatten(cell);
            let padding = width.saturating_sub(cell_width(&text));
            format!("{text}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn cell_width(value: &str) -> usize {
    value.chars().count()
}

fn flatten(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}
