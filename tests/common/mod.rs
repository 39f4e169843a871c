#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use roster_enrich::data::{Table, Value};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Builds a table from string literals; empty strings become absent cells.
pub fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
    Table::with_rows(
        headers.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|row| row.iter().map(|cell| Value::from_field(cell)).collect())
            .collect(),
    )
}

/// Display text of one cell, empty when absent.
pub fn cell(table: &Table, row: usize, column: &str) -> String {
    let idx = table
        .column_index(column)
        .unwrap_or_else(|| panic!("column {column} missing"));
    table
        .get(row, idx)
        .map(Value::as_display)
        .unwrap_or_default()
}

pub fn column(table: &Table, column: &str) -> Vec<String> {
    (0..table.len()).map(|row| cell(table, row, column)).collect()
}
