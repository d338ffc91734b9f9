use crate::domain::model::{Record, Table};
use crate::utils::error::{EtlError, Result};
use std::path::Path;

/// Tab for `.tsv` paths, comma otherwise.
pub fn delimiter_for(path: &str) -> u8 {
    match Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") => b'\t',
        _ => b',',
    }
}

/// Parse a delimited table with a header row. Short rows are accepted and
/// padded on write; rows wider than the header are rejected.
pub fn read_table(data: &[u8], delimiter: u8) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect::<Vec<_>>();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.len() > headers.len() {
            let line = row.position().map_or(0, |pos| pos.line());
            return Err(EtlError::ValidationError {
                message: format!(
                    "line {} has {} fields but the header has {}",
                    line,
                    row.len(),
                    headers.len()
                ),
            });
        }
        records.push(Record::new(row.iter()));
    }

    tracing::debug!(
        "Parsed table with {} columns and {} rows",
        headers.len(),
        records.len()
    );
    Ok(Table::new(headers, records))
}

/// Serialize `table`, padding short rows to the header width.
pub fn write_table(table: &Table, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(&table.headers)?;
    let width = table.headers.len();
    for record in &table.records {
        let mut values = record.values.clone();
        if values.len() < width {
            values.resize(width, String::new());
        }
        writer.write_record(&values)?;
    }

    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

/// Rows shown by the dry-run preview.
pub const PREVIEW_ROWS: usize = 5;
const PREVIEW_CELL_WIDTH: usize = 24;

/// Column-aligned text view of the header and the first `rows` records.
/// Long cells are cut to a fixed width and end with `…`.
pub fn format_preview(table: &Table, rows: usize) -> String {
    let clip = |cell: &str| -> String {
        if cell.chars().count() > PREVIEW_CELL_WIDTH {
            let mut clipped: String = cell.chars().take(PREVIEW_CELL_WIDTH - 1).collect();
            clipped.push('…');
            clipped
        } else {
            cell.to_string()
        }
    };

    let width = table.headers.len();
    let mut lines: Vec<Vec<String>> = vec![table.headers.iter().map(|h| clip(h)).collect()];
    for record in table.records.iter().take(rows) {
        lines.push(
            (0..width)
                .map(|idx| clip(record.values.get(idx).map_or("", String::as_str)))
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..width)
        .map(|idx| {
            lines
                .iter()
                .map(|line| line[idx].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    lines
        .iter()
        .map(|line| {
            line.iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
