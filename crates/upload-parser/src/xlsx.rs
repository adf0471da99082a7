//! XLSX Upload Reader

use crate::error::ParseError;
use crate::upload::{parse_value, ParsedUpload};
use calamine::{open_workbook_from_rs, Data, DataType, Range, Reader, Xlsx};
use std::io::Cursor;
use tracing::debug;

/// Rendering used for spreadsheet date cells
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Extract rows from every worksheet of an XLSX workbook
///
/// The first row of each sheet is a header. Column A holds the timestamp,
/// column B the value.
pub fn parse_xlsx(bytes: &[u8]) -> Result<ParsedUpload, ParseError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;

    let mut upload = ParsedUpload::default();
    for (name, range) in workbook.worksheets() {
        debug!(sheet = %name, rows = range.height(), "reading worksheet");
        collect_rows(&range, &mut upload);
    }

    Ok(upload)
}

/// Read the first column of the first worksheet, skipping the header and blanks
pub fn first_column_values(bytes: &[u8]) -> Result<Vec<String>, ParseError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ParseError::Workbook("workbook has no worksheets".to_string()))??;

    Ok(first_column(&range))
}

pub(crate) fn first_column(range: &Range<Data>) -> Vec<String> {
    range
        .rows()
        .skip(1)
        .filter_map(|row| row.first())
        .map(cell_text)
        .filter(|text| !text.is_empty())
        .collect()
}

pub(crate) fn collect_rows(range: &Range<Data>, upload: &mut ParsedUpload) {
    for row in range.rows().skip(1) {
        let date_time = row.first().map(cell_text).unwrap_or_default();
        let value = row.get(1).and_then(cell_value);
        upload.push(date_time, value);
    }
}

/// Render a cell as timestamp text
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

/// Interpret a cell as a numeric reading
fn cell_value(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f).filter(|v| v.is_finite()),
        Data::Int(i) => Some(*i as f64),
        Data::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Data::String(s) => parse_value(s),
        _ => None,
    }
}
