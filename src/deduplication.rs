// 🔍 Deduplication - Collapse repeated keys to one record
// First occurrence wins; retained rows keep their input order

use crate::dataset::{Dataset, Value};
use crate::error::SchemaError;
use std::collections::{HashMap, HashSet};

/// Keep the first record for each distinct value of `key_column`.
///
/// Returns a new dataset; the input is left untouched. Fails with
/// `SchemaError::MissingColumn` when the key column is not in the schema.
pub fn dedupe(dataset: &Dataset, key_column: &str) -> Result<Dataset, SchemaError> {
    let key_idx = dataset.require_column(key_column, None)?;

    let mut seen: HashSet<&Value> = HashSet::with_capacity(dataset.len());
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(dataset.len());

    for row in dataset.rows() {
        if seen.insert(&row[key_idx]) {
            rows.push(row.clone());
        }
    }

    tracing::debug!(
        key = key_column,
        input = dataset.len(),
        retained = rows.len(),
        "deduplicated dataset"
    );

    Ok(dataset.with_rows(rows))
}

/// Every key value seen more than once, with its occurrence count,
/// in first-occurrence order
pub fn duplicate_keys(
    dataset: &Dataset,
    key_column: &str,
) -> Result<Vec<(Value, usize)>, SchemaError> {
    let key_idx = dataset.require_column(key_column, None)?;

    let mut counts: HashMap<&Value, usize> = HashMap::new();
    let mut order: Vec<&Value> = Vec::new();

    for row in dataset.rows() {
        let key = &row[key_idx];
        let count = counts.entry(key).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    Ok(order
        .into_iter()
        .filter_map(|key| match counts[key] {
            n if n > 1 => Some((key.clone(), n)),
            _ => None,
        })
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================
