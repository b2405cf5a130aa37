// 📂 Snapshot Loader - CSV and spreadsheet files into Datasets
// First row is the header. No schema inference: CSV cells stay text,
// spreadsheet cells keep the type the workbook stored.

use crate::dataset::{Dataset, Value};
use crate::error::ParseError;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use chrono::NaiveTime;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

// ============================================================================
// INPUT FORMAT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    /// xlsx, xlsm, xls, xlsb, ods
    Spreadsheet,
}

impl InputFormat {
    pub fn name(&self) -> &str {
        match self {
            InputFormat::Csv => "CSV",
            InputFormat::Spreadsheet => "Spreadsheet",
        }
    }
}

/// Pick the loader from a file name's extension
pub fn detect_format<P: AsRef<Path>>(path: P) -> Result<InputFormat, ParseError> {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => Ok(InputFormat::Csv),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(InputFormat::Spreadsheet),
        _ => Err(ParseError::UnsupportedFormat(ext)),
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset, ParseError> {
    let path = path.as_ref();
    let format = detect_format(path)?;

    let dataset = match format {
        InputFormat::Csv => read_csv(csv::Reader::from_path(path)?)?,
        InputFormat::Spreadsheet => {
            let workbook = open_workbook_auto(path)
                .map_err(|e| ParseError::Spreadsheet(e.to_string()))?;
            read_workbook(workbook)?
        }
    };

    tracing::debug!(
        path = %path.display(),
        format = format.name(),
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "loaded dataset"
    );

    Ok(dataset)
}

/// Load an uploaded file held in memory
pub fn load_dataset_from_bytes(bytes: Vec<u8>, format: InputFormat) -> Result<Dataset, ParseError> {
    match format {
        InputFormat::Csv => read_csv(csv::Reader::from_reader(Cursor::new(bytes))),
        InputFormat::Spreadsheet => {
            let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
                .map_err(|e| ParseError::Spreadsheet(e.to_string()))?;
            read_workbook(workbook)
        }
    }
}

// ============================================================================
// CSV
// ============================================================================

fn read_csv<R: Read>(mut rdr: csv::Reader<R>) -> Result<Dataset, ParseError> {
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(ParseError::MissingHeader);
    }

    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| header_name(i, h))
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|cell| match cell {
                    "" => Value::Empty,
                    text => Value::Text(text.to_string()),
                })
                .collect(),
        );
    }

    Ok(Dataset::new(columns, rows)?)
}

// ============================================================================
// SPREADSHEETS
// ============================================================================

fn read_workbook<RS: Read + Seek>(mut workbook: Sheets<RS>) -> Result<Dataset, ParseError> {
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ParseError::EmptyWorkbook)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ParseError::Spreadsheet(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut sheet_rows = range.rows();
    let header = sheet_rows.next().ok_or(ParseError::MissingHeader)?;

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| header_name(i, &cell_value(cell).to_string()))
        .collect();

    let mut rows: Vec<Vec<Value>> = sheet_rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    // Formatting can stretch the used range past the last data row
    while rows
        .last()
        .is_some_and(|row| row.iter().all(Value::is_empty))
    {
        rows.pop();
    }

    Ok(Dataset::new(columns, rows)?)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) if s.is_empty() => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => Value::from(*n),
        Data::Int(n) => Value::from(*n),
        Data::Bool(b) => Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Value::Text(format!("#{e:?}")),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if Some(ndt.time()) == NaiveTime::from_hms_opt(0, 0, 0) => Value::Date(ndt.date()),
            Some(ndt) => Value::DateTime(ndt),
            None => Value::from(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

/// Blank headers get a positional name so the schema stays unique
fn header_name(index: usize, raw: &str) -> String {
    if raw.is_empty() {
        format!("Unnamed: {index}")
    } else {
        raw.to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use std::io::Write;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("old.csv").unwrap(), InputFormat::Csv);
        assert_eq!(detect_format("Report.XLSX").unwrap(), InputFormat::Spreadsheet);
        assert_eq!(detect_format("report.ods").unwrap(), InputFormat::Spreadsheet);
        assert!(matches!(
            detect_format("notes.txt"),
            Err(ParseError::UnsupportedFormat(ext)) if ext == "txt"
        ));
        assert!(detect_format("no_extension").is_err());
    }

    #[test]
    fn test_csv_from_bytes() {
        let csv = "Request ID,Delivery Date,Reason\nR-1,2024-01-01,\nR-2,2024-01-02,late\n";
        let ds = load_dataset_from_bytes(csv.as_bytes().to_vec(), InputFormat::Csv).unwrap();

        assert_eq!(ds.columns(), &["Request ID", "Delivery Date", "Reason"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0][2], Value::Empty);
        assert_eq!(ds.rows()[1][2], Value::from("late"));
    }

    #[test]
    fn test_csv_keeps_text_untouched() {
        // Quoted field keeps the comma and the leading space
        let csv = "id,Nupco PO No\n7,\" 12,345\"\n";
        let ds = load_dataset_from_bytes(csv.as_bytes().to_vec(), InputFormat::Csv).unwrap();
        assert_eq!(ds.rows()[0][0], Value::from("7"));
        assert_eq!(ds.rows()[0][1], Value::from(" 12,345"));
    }

    #[test]
    fn test_csv_blank_header_named_by_position() {
        let csv = "id,,Status\n1,x,open\n";
        let ds = load_dataset_from_bytes(csv.as_bytes().to_vec(), InputFormat::Csv).unwrap();
        assert_eq!(ds.columns(), &["id", "Unnamed: 1", "Status"]);
    }

    #[test]
    fn test_csv_duplicate_header_rejected() {
        let csv = "id,Status,Status\n1,a,b\n";
        let err = load_dataset_from_bytes(csv.as_bytes().to_vec(), InputFormat::Csv).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Schema(SchemaError::DuplicateColumn(c)) if c == "Status"
        ));
    }

    #[test]
    fn test_csv_ragged_row_rejected() {
        let csv = "id,Status\n1,a\n2\n";
        let err = load_dataset_from_bytes(csv.as_bytes().to_vec(), InputFormat::Csv).unwrap_err();
        assert!(matches!(err, ParseError::Csv(_)));
    }

    #[test]
    fn test_load_csv_from_path() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Request ID,Request Status").unwrap();
        writeln!(file, "1,open").unwrap();
        file.flush().unwrap();

        let ds = load_dataset(file.path()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.rows()[0][1], Value::from("open"));
    }

    #[test]
    fn test_invalid_spreadsheet_bytes() {
        let err = load_dataset_from_bytes(b"not a workbook".to_vec(), InputFormat::Spreadsheet)
            .unwrap_err();
        assert!(matches!(err, ParseError::Spreadsheet(_)));
    }

    #[test]
    fn test_cell_value_mapping() {
        assert_eq!(cell_value(&Data::Float(12345.0)), Value::from(12345.0));
        assert_eq!(cell_value(&Data::Int(7)), Value::from(7));
        assert_eq!(cell_value(&Data::String(String::new())), Value::Empty);
        assert_eq!(cell_value(&Data::Bool(true)), Value::from("TRUE"));
    }
}
