// 📋 Dataset - In-memory rectangular table of scalar values
// Both snapshots of a comparison job are loaded into this shape

use crate::error::{SchemaError, Side};
use chrono::{NaiveDate, NaiveDateTime};
use ordered_float::OrderedFloat;
use serde::{Serialize, Serializer};
use std::fmt;

// ============================================================================
// VALUE
// ============================================================================

/// A single cell.
///
/// Equality is exact and type-sensitive: `Text("1")` never equals
/// `Number(1.0)` and text is compared without trimming. Numbers are wrapped in
/// `OrderedFloat` so values can be hashed and used as join keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(OrderedFloat<f64>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n.into_inner()),
            _ => None,
        }
    }
}

/// Integers without decimals, in text and JSON alike
fn whole_number(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() < 1e15).then_some(n as i64)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(s) => write!(f, "{s}"),
            Value::Number(n) => match whole_number(n.into_inner()) {
                Some(i) => write!(f, "{i}"),
                None => write!(f, "{n}"),
            },
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Empty => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Number(n) => match whole_number(n.into_inner()) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(n.into_inner()),
            },
            Value::Date(_) | Value::DateTime(_) => serializer.collect_str(self),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(OrderedFloat(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(OrderedFloat(n as f64))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(OrderedFloat(n as f64))
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Empty)
    }
}

// ============================================================================
// DATASET
// ============================================================================

/// Ordered rows sharing one schema. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset, checking that headers are unique and every row has
    /// exactly one value per header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, SchemaError> {
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(SchemaError::DuplicateColumn(column.clone()));
            }
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SchemaError::RaggedRow {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }

        Ok(Dataset { columns, rows })
    }

    /// Convenience constructor for literal tables
    pub fn from_rows<C: AsRef<str>>(
        columns: &[C],
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, SchemaError> {
        Dataset::new(
            columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows,
        )
    }

    /// Rows are trusted to match `columns`; only for callers that derive
    /// rows from an existing dataset.
    pub(crate) fn with_rows(&self, rows: Vec<Vec<Value>>) -> Self {
        Dataset {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Column position, or `SchemaError::MissingColumn` tagged with `side`
    pub fn require_column(&self, name: &str, side: Option<Side>) -> Result<usize, SchemaError> {
        self.column_index(name).ok_or_else(|| SchemaError::MissingColumn {
            side,
            column: name.to_string(),
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |values| Record {
            columns: &self.columns,
            values,
        })
    }
}

/// Borrowed view of one row with lookup by field name
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == field)
            .map(|i| &self.values[i])
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let result = Dataset::from_rows(&["id", "Status", "id"], vec![]);
        assert_eq!(result, Err(SchemaError::DuplicateColumn("id".to_string())));
    }

    #[test]
    fn test_new_rejects_ragged_rows() {
        let result = Dataset::from_rows(
            &["id", "Status"],
            vec![vec![1.into(), "open".into()], vec![2.into()]],
        );
        assert_eq!(
            result,
            Err(SchemaError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_record_lookup_by_name() {
        let ds = Dataset::from_rows(
            &["id", "Status"],
            vec![vec![7.into(), "shipped".into()]],
        )
        .unwrap();

        let record = ds.records().next().unwrap();
        assert_eq!(record.get("Status"), Some(&Value::from("shipped")));
        assert_eq!(record.get("Missing"), None);
        assert_eq!(ds.require_column("id", None), Ok(0));
        assert!(ds.require_column("Reason", Some(Side::New)).is_err());
    }

    #[test]
    fn test_value_equality_is_exact() {
        assert_ne!(Value::from("1"), Value::from(1));
        assert_ne!(Value::from("late "), Value::from("late"));
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_eq!(Value::Empty, Value::Empty);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::from(12345.0).to_string(), "12345");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::Empty.to_string(), "");
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(Value::from(date).to_string(), "2024-02-01");
    }

    #[test]
    fn test_value_serializes_as_plain_json() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let json = serde_json::to_string(&vec![
            Value::from("x"),
            Value::from(3),
            Value::from(date),
            Value::Empty,
        ])
        .unwrap();
        assert_eq!(json, r#"["x",3,"2024-01-01",null]"#);
    }

    #[test]
    fn test_whole_numbers_serialize_like_display() {
        let cases = [
            (Value::from(12345.0), "12345"),
            (Value::from(-7), "-7"),
            (Value::from(2.5), "2.5"),
            (Value::from(1e16), "1e16"),
        ];
        for (value, expected) in cases {
            assert_eq!(serde_json::to_string(&value).unwrap(), expected, "{value:?}");
        }
        assert_eq!(Value::from(12345.0).to_string(), "12345");
    }
}
