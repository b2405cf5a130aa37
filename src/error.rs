// Error taxonomy for the diff engine and its loaders

use std::fmt;

// ============================================================================
// SCHEMA ERRORS
// ============================================================================

/// Which snapshot a schema problem was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Old,
    New,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Old => write!(f, "old"),
            Side::New => write!(f, "new"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A required column (key or tracked field) is absent.
    /// `side` is `None` when the dataset is not part of a pair (dedupe).
    MissingColumn { side: Option<Side>, column: String },
    /// A comparison was requested with no tracked fields.
    NoTrackedFields,
    /// The same header appears twice in one dataset.
    DuplicateColumn(String),
    /// A row does not have one value per column.
    RaggedRow { row: usize, expected: usize, found: usize },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::MissingColumn { side: Some(side), column } => {
                write!(f, "{side} dataset: missing column '{column}'")
            }
            SchemaError::MissingColumn { side: None, column } => {
                write!(f, "missing column '{column}'")
            }
            SchemaError::NoTrackedFields => write!(f, "at least one tracked field is required"),
            SchemaError::DuplicateColumn(column) => write!(f, "duplicate column '{column}'"),
            SchemaError::RaggedRow { row, expected, found } => {
                write!(f, "row {row}: expected {expected} values, found {found}")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

// ============================================================================
// PARSE ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ParseError {
    /// File extension not recognised as CSV or spreadsheet.
    UnsupportedFormat(String),
    /// Workbook opened but holds no worksheets.
    EmptyWorkbook,
    /// Input has no header row.
    MissingHeader,
    Csv(csv::Error),
    Spreadsheet(String),
    Io(std::io::Error),
    /// Parsed fine but produced a non-rectangular or duplicate-header table.
    Schema(SchemaError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnsupportedFormat(ext) => write!(f, "unsupported file format: '{ext}'"),
            ParseError::EmptyWorkbook => write!(f, "workbook contains no sheets"),
            ParseError::MissingHeader => write!(f, "input has no header row"),
            ParseError::Csv(e) => write!(f, "CSV error: {e}"),
            ParseError::Spreadsheet(msg) => write!(f, "spreadsheet error: {msg}"),
            ParseError::Io(e) => write!(f, "IO error: {e}"),
            ParseError::Schema(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Csv(e) => Some(e),
            ParseError::Io(e) => Some(e),
            ParseError::Schema(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for ParseError {
    fn from(e: csv::Error) -> Self {
        ParseError::Csv(e)
    }
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::Io(e)
    }
}

impl From<SchemaError> for ParseError {
    fn from(e: SchemaError) -> Self {
        ParseError::Schema(e)
    }
}

// ============================================================================
// CONFIG ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// TOML parse / deserialization error.
    Parse(String),
    /// Parsed config is not usable (empty key column, duplicate names, ...).
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
            ConfigError::Validation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_message_names_side() {
        let err = SchemaError::MissingColumn {
            side: Some(Side::New),
            column: "Delivery Date".to_string(),
        };
        assert_eq!(err.to_string(), "new dataset: missing column 'Delivery Date'");

        let err = SchemaError::MissingColumn {
            side: None,
            column: "Request ID".to_string(),
        };
        assert_eq!(err.to_string(), "missing column 'Request ID'");
    }

    #[test]
    fn test_parse_error_wraps_schema_error() {
        let err: ParseError = SchemaError::DuplicateColumn("id".to_string()).into();
        assert_eq!(err.to_string(), "duplicate column 'id'");
        assert!(std::error::Error::source(&err).is_some());
    }
}
