// ⚖️ Reconciliation Engine - Key-aligned diff of two snapshots
//
// For every key present in both the old and the new snapshot, compare each
// tracked field. A key is reported once if at least one tracked field
// changed. Keys present on only one side are dropped.

use crate::dataset::{Dataset, Value};
use crate::error::{SchemaError, Side};
use crate::rules::{FieldRules, DEFAULT_ANNOTATION_FIELD};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};

/// Output label of the key column
pub const DEFAULT_KEY_LABEL: &str = "ASN";

// ============================================================================
// CHANGE RECORD
// ============================================================================

/// One changed key. `old`/`new` are aligned with the result's tracked
/// fields, `passthrough` with its passthrough fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub key: Value,
    pub passthrough: Vec<Value>,
    pub old: Vec<Value>,
    pub new: Vec<Value>,
    pub reason: Option<String>,
}

impl ChangeRecord {
    /// Indices of tracked fields whose value differs
    pub fn changed_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.old
            .iter()
            .zip(&self.new)
            .enumerate()
            .filter(|(_, (o, n))| o != n)
            .map(|(i, _)| i)
    }
}

// ============================================================================
// COMPARISON RESULT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub old_rows: usize,
    pub new_rows: usize,
    /// Keys present in both snapshots
    pub matched: usize,
    pub old_only: usize,
    pub new_only: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonResult {
    key_label: String,
    annotation_label: String,
    tracked_fields: Vec<String>,
    passthrough_fields: Vec<String>,
    records: Vec<ChangeRecord>,
    stats: JoinStats,
}

impl ComparisonResult {
    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> &JoinStats {
        &self.stats
    }

    pub fn tracked_fields(&self) -> &[String] {
        &self.tracked_fields
    }

    /// Passthrough fields that made it into the output (present in both
    /// snapshots, annotation excluded), in declared order
    pub fn passthrough_fields(&self) -> &[String] {
        &self.passthrough_fields
    }

    /// Header row: key, passthrough, all "Old", all "New", annotation
    pub fn columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(2 + self.passthrough_fields.len() + 2 * self.tracked_fields.len());
        columns.push(self.key_label.clone());
        columns.extend(self.passthrough_fields.iter().cloned());
        columns.extend(self.tracked_fields.iter().map(|f| format!("Old {f}")));
        columns.extend(self.tracked_fields.iter().map(|f| format!("New {f}")));
        columns.push(self.annotation_label.clone());
        columns
    }

    fn row(&self, record: &ChangeRecord) -> Vec<Value> {
        let mut row = Vec::with_capacity(self.columns_len());
        row.push(record.key.clone());
        row.extend(record.passthrough.iter().cloned());
        row.extend(record.old.iter().cloned());
        row.extend(record.new.iter().cloned());
        row.push(record.reason.clone().into());
        row
    }

    fn columns_len(&self) -> usize {
        2 + self.passthrough_fields.len() + 2 * self.tracked_fields.len()
    }

    /// Records laid out in `columns()` order
    pub fn rows(&self) -> Vec<Vec<Value>> {
        self.records.iter().map(|r| self.row(r)).collect()
    }

    /// Single cell by row index and output column name
    pub fn cell(&self, row: usize, column: &str) -> Option<Value> {
        let idx = self.columns().iter().position(|c| c == column)?;
        let record = self.records.get(row)?;
        self.row(record).into_iter().nth(idx)
    }

    /// Row of the record with the given key
    pub fn find(&self, key: &Value) -> Option<&ChangeRecord> {
        self.records.iter().find(|r| &r.key == key)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} changed of {} matched keys ({} old rows, {} new rows, {} old-only, {} new-only)",
            self.records.len(),
            self.stats.matched,
            self.stats.old_rows,
            self.stats.new_rows,
            self.stats.old_only,
            self.stats.new_only,
        )
    }
}

impl Serialize for ComparisonResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ComparisonResult", 3)?;
        s.serialize_field("columns", &self.columns())?;
        s.serialize_field("rows", &self.rows())?;
        s.serialize_field("stats", &self.stats)?;
        s.end()
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    /// Output label for the key column (default: "ASN")
    pub key_label: String,

    /// Passthrough transforms and the annotation column
    pub rules: FieldRules,
}

impl ReconciliationEngine {
    /// Engine with the default label and rules
    pub fn new() -> Self {
        ReconciliationEngine {
            key_label: DEFAULT_KEY_LABEL.to_string(),
            rules: FieldRules::default(),
        }
    }

    pub fn with_rules(rules: FieldRules) -> Self {
        ReconciliationEngine {
            key_label: DEFAULT_KEY_LABEL.to_string(),
            rules,
        }
    }

    pub fn with_key_label(mut self, label: impl Into<String>) -> Self {
        self.key_label = label.into();
        self
    }

    /// Diff `old` against `new` on `key_column`.
    ///
    /// Both datasets are expected to be deduplicated on the key already; if
    /// they are not, the first row per key wins on each side. The key column
    /// and every tracked field must exist in both datasets; this is checked
    /// before any row is read.
    pub fn reconcile<T, P>(
        &self,
        old: &Dataset,
        new: &Dataset,
        key_column: &str,
        tracked_fields: &[T],
        passthrough_fields: &[P],
    ) -> Result<ComparisonResult, SchemaError>
    where
        T: AsRef<str>,
        P: AsRef<str>,
    {
        if tracked_fields.is_empty() {
            return Err(SchemaError::NoTrackedFields);
        }

        let old_key = old.require_column(key_column, Some(Side::Old))?;
        let new_key = new.require_column(key_column, Some(Side::New))?;

        // Repeated tracked fields are compared and projected once
        let mut tracked_names: Vec<&str> = Vec::with_capacity(tracked_fields.len());
        let mut tracked: Vec<(usize, usize)> = Vec::with_capacity(tracked_fields.len());
        for field in tracked_fields {
            let field = field.as_ref();
            if tracked_names.contains(&field) {
                continue;
            }
            tracked.push((
                old.require_column(field, Some(Side::Old))?,
                new.require_column(field, Some(Side::New))?,
            ));
            tracked_names.push(field);
        }

        // Passthrough columns come from the new side, and only when both
        // snapshots carry them
        let mut passthrough: Vec<(&str, usize)> = Vec::new();
        for field in passthrough_fields {
            let field = field.as_ref();
            if self.rules.is_annotation(field) || passthrough.iter().any(|(f, _)| *f == field) {
                continue;
            }
            if let (true, Some(idx)) = (old.has_column(field), new.column_index(field)) {
                passthrough.push((field, idx));
            }
        }

        let annotation_idx = self.rules.annotation().and_then(|f| new.column_index(f));

        // Key -> row in the new snapshot; doubles as the annotation lookup
        let mut new_index: HashMap<&Value, &Vec<Value>> = HashMap::with_capacity(new.len());
        for row in new.rows() {
            new_index.entry(&row[new_key]).or_insert(row);
        }

        let mut stats = JoinStats {
            old_rows: old.len(),
            new_rows: new.len(),
            ..JoinStats::default()
        };

        let mut matched: HashSet<&Value> = HashSet::new();
        let mut emitted: HashSet<&Value> = HashSet::new();
        let mut records = Vec::new();

        for old_row in old.rows() {
            let key = &old_row[old_key];
            let Some(new_row) = new_index.get(key) else {
                stats.old_only += 1;
                continue;
            };
            matched.insert(key);

            let changed = tracked.iter().any(|&(o, n)| old_row[o] != new_row[n]);
            if !changed || !emitted.insert(key) {
                continue;
            }

            records.push(ChangeRecord {
                key: key.clone(),
                passthrough: passthrough
                    .iter()
                    .map(|&(field, idx)| self.rules.render(field, &new_row[idx]))
                    .collect(),
                old: tracked.iter().map(|&(o, _)| old_row[o].clone()).collect(),
                new: tracked.iter().map(|&(_, n)| new_row[n].clone()).collect(),
                reason: annotation_idx
                    .map(|idx| new_row[idx].to_string())
                    .filter(|s| !s.is_empty()),
            });
        }

        stats.matched = matched.len();
        stats.new_only = new_index.len() - matched.len();

        tracing::info!(
            key = key_column,
            matched = stats.matched,
            changed = records.len(),
            "reconciled snapshots"
        );

        Ok(ComparisonResult {
            key_label: self.key_label.clone(),
            annotation_label: self
                .rules
                .annotation()
                .unwrap_or(DEFAULT_ANNOTATION_FIELD)
                .to_string(),
            tracked_fields: tracked_names.iter().map(|f| f.to_string()).collect(),
            passthrough_fields: passthrough.iter().map(|(f, _)| f.to_string()).collect(),
            records,
            stats,
        })
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
