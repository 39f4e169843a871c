use crate::{
    data::Table,
    pipeline::{IDENTIFIER_COLUMN, RESIGNATION_COLUMN},
    sort::sort_table,
};

fn has_resignation(table: &Table, row: usize, column: usize) -> bool {
    table
        .get(row, column)
        .map(|value| {
            let text = value.as_display();
            let text = text.trim();
            !text.is_empty() && text != "None"
        })
        .unwrap_or(false)
}

/// Rows carrying a resignation value, most recent resignation first.
pub fn resigned_view(enriched: &Table) -> Table {
    let Some(column) = enriched.column_index(RESIGNATION_COLUMN) else {
        return Table::new(enriched.headers.clone());
    };
    let rows = enriched.select_rows((0..enriched.len()).filter(|&row| has_resignation(enriched, row, column)));
    sort_table(&rows, RESIGNATION_COLUMN, false)
}

/// Rows without a resignation value, ordered by identifier.
pub fn current_view(enriched: &Table) -> Table {
    let rows = match enriched.column_index(RESIGNATION_COLUMN) {
        Some(column) => enriched
            .select_rows((0..enriched.len()).filter(|&row| !has_resignation(enriched, row, column))),
        None => enriched.clone(),
    };
    sort_table(&rows, IDENTIFIER_COLUMN, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn enriched() -> Table {
        let headers = vec![
            "Name".to_string(),
            IDENTIFIER_COLUMN.to_string(),
            RESIGNATION_COLUMN.to_string(),
        ];
        let rows = [
            ("Ana", "30", "01/15/2023"),
            ("Ben", "4", ""),
            ("Cruz", "12", "06/30/2024"),
            ("Dee", "", "RETRACTED"),
            ("Eve", "2", "None"),
        ]
        .into_iter()
        .map(|(n, id, r)| vec![Value::from_field(n), Value::from_field(id), Value::from_field(r)])
        .collect();
        Table::with_rows(headers, rows)
    }

    fn names(table: &Table) -> Vec<String> {
        table
            .column_values(0)
            .map(|v| v.map(|v| v.as_display()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn resigned_view_puts_latest_date_first_and_status_tokens_last() {
        assert_eq!(names(&resigned_view(&enriched())), ["Cruz", "Ana", "Dee"]);
    }

    #[test]
    fn current_view_orders_by_identifier() {
        assert_eq!(names(&current_view(&enriched())), ["Eve", "Ben"]);
    }
}
