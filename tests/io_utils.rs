mod common;

use std::fs;
use std::path::Path;

use common::{TestWorkspace, cell, table};
use roster_enrich::io_utils::{
    read_table, resolve_encoding, resolve_input_delimiter, resolve_output_delimiter, write_table,
};

#[test]
fn delimiter_follows_extension_unless_overridden() {
    assert_eq!(resolve_input_delimiter(Path::new("roster.tsv"), None), b'\t');
    assert_eq!(resolve_input_delimiter(Path::new("roster.csv"), None), b',');
    assert_eq!(resolve_input_delimiter(Path::new("roster.tsv"), Some(b';')), b';');
    assert_eq!(resolve_output_delimiter(Path::new("out.TSV"), b','), b'\t');
    assert_eq!(resolve_output_delimiter(Path::new("out.txt"), b'|'), b'|');
}

#[test]
fn unknown_encoding_is_rejected() {
    assert!(resolve_encoding(Some("windows-1252")).is_ok());
    assert!(resolve_encoding(Some("klingon")).is_err());
}

#[test]
fn title_rows_above_full_name_header_are_dropped() {
    let ws = TestWorkspace::new();
    let path = ws.write(
        "active.csv",
        "Employee Masterlist,,\nAs of March,,\nPERNR,Full Name,Position\n5,\"Ranjo, Jared\",Analyst\n",
    );
    let loaded = read_table(&path, b',', resolve_encoding(None).unwrap()).unwrap();
    assert_eq!(loaded.headers, ["PERNR", "Full Name", "Position"]);
    assert_eq!(loaded.len(), 1);
    assert_eq!(cell(&loaded, 0, "Full Name"), "Ranjo, Jared");
}

#[test]
fn first_row_is_header_when_nothing_looks_like_one() {
    let ws = TestWorkspace::new();
    let path = ws.write("odd.csv", "alpha,beta\n1,2\n");
    let loaded = read_table(&path, b',', resolve_encoding(None).unwrap()).unwrap();
    assert_eq!(loaded.headers, ["alpha", "beta"]);
    assert_eq!(loaded.len(), 1);
}

#[test]
fn ragged_rows_are_padded_to_header_width() {
    let ws = TestWorkspace::new();
    let path = ws.write("ragged.tsv", "User ID\tName\tDept\nu1\tAna\nu2\tBen\tOps\n");
    let loaded = read_table(&path, b'\t', resolve_encoding(None).unwrap()).unwrap();
    assert_eq!(loaded.rows[0].len(), 3);
    assert_eq!(cell(&loaded, 0, "Dept"), "");
    assert_eq!(cell(&loaded, 1, "Dept"), "Ops");
    assert!(loaded.validate("ragged").is_ok());
}

#[test]
fn latin1_input_is_decoded() {
    let ws = TestWorkspace::new();
    let path = ws.path().join("latin1.csv");
    let mut bytes = b"PERNR,Full Name\n1,Jos".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b" Pe\xF1a\n");
    fs::write(&path, bytes).unwrap();
    let loaded = read_table(&path, b',', resolve_encoding(Some("latin1")).unwrap()).unwrap();
    assert_eq!(cell(&loaded, 0, "Full Name"), "Jos\u{e9} Pe\u{f1}a");
}

#[test]
fn written_tables_quote_every_field_and_blank_absent_cells() {
    let ws = TestWorkspace::new();
    let path = ws.path().join("out.csv");
    write_table(&path, &table(&["PERNR", "Name"], &[&["5", ""]]), b',').unwrap();
    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "\"PERNR\",\"Name\"\n\"5\",\"\"\n");
}
