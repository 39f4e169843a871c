//! CSV loading and writing for the command-line front end.
//!
//! - **Delimiter resolution**: `.tsv` reads as tab, everything else as comma,
//!   unless overridden.
//! - **Encoding**: inputs are decoded through `encoding_rs` (UTF-8 default).
//! - **Header detection**: exports often carry title rows above the real
//!   header, so the header is searched for within the first rows.
//! - **Writing**: quote-always CSV, absent cells as empty fields.

use std::{
    collections::HashSet,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    data::{Table, Value},
    roles::has_usable_header,
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
/// Rows searched for a header before falling back to the first row.
pub const HEADER_SEARCH_ROWS: usize = 10;
/// A row containing this exact label is taken as the header immediately.
pub const PREFERRED_HEADER_LABEL: &str = "Full Name";

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: &Path, fallback: u8) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        Some(ext) if ext.eq_ignore_ascii_case("csv") => DEFAULT_CSV_DELIMITER,
        _ => fallback,
    }
}

fn open_raw_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Picks the header row among the leading records.
pub fn detect_header_row(records: &[Vec<String>]) -> usize {
    let window = &records[..records.len().min(HEADER_SEARCH_ROWS)];
    if let Some(idx) = window
        .iter()
        .position(|row| row.iter().any(|cell| cell.trim() == PREFERRED_HEADER_LABEL))
    {
        return idx;
    }
    window
        .iter()
        .position(|row| has_usable_header(row))
        .unwrap_or(0)
}

/// Makes header labels unique by suffixing repeats with `_2`, `_3`, ...
pub fn unique_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    raw.iter()
        .enumerate()
        .map(|(idx, label)| {
            let base = match label.trim() {
                "" => format!("column_{}", idx + 1),
                trimmed => trimmed.to_string(),
            };
            let mut candidate = base.clone();
            let mut counter = 2usize;
            while seen.contains(&candidate) {
                candidate = format!("{base}_{counter}");
                counter += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

pub fn read_table_from_reader<R: Read>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Table> {
    let mut csv_reader = open_raw_reader(reader, delimiter);
    let mut records = Vec::new();
    for (idx, record) in csv_reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", idx + 1))?;
        records.push(decode_record(&record, encoding)?);
    }
    if records.is_empty() {
        return Ok(Table::default());
    }
    let header_row = detect_header_row(&records);
    if header_row > 0 {
        debug!("Skipping {header_row} preamble row(s) before header");
    }
    let headers = unique_headers(&records[header_row]);
    let mut table = Table::new(headers);
    for record in &records[header_row + 1..] {
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        table.push_row(record.iter().map(|field| Value::from_field(field)).collect());
    }
    Ok(table)
}

pub fn read_table(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    read_table_from_reader(BufReader::new(file), delimiter, encoding)
        .with_context(|| format!("Reading table from {path:?}"))
}

pub fn write_table_to<W: Write>(writer: W, table: &Table, delimiter: u8) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(writer);
    csv_writer
        .write_record(&table.headers)
        .context("Writing headers")?;
    for row in &table.rows {
        let fields = (0..table.headers.len())
            .map(|idx| {
                row.get(idx)
                    .and_then(|cell| cell.as_ref())
                    .map(Value::as_display)
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();
        csv_writer.write_record(&fields).context("Writing row")?;
    }
    csv_writer.flush().context("Flushing CSV output")?;
    Ok(())
}

pub fn write_table(path: &Path, table: &Table, delimiter: u8) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    write_table_to(BufWriter::new(file), table, delimiter)
        .with_context(|| format!("Writing table to {path:?}"))
}
