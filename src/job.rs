// 🧾 Comparison Job - Dedupe both snapshots once, then run each comparison

use crate::config::{ComparisonConfig, JobConfig};
use crate::dataset::Dataset;
use crate::deduplication::{dedupe, duplicate_keys};
use crate::error::{SchemaError, Side};
use crate::reconciliation::ComparisonResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub name: String,
    pub title: String,
    /// Shown instead of a table when `result` is empty
    pub empty_message: String,
    pub result: ComparisonResult,
}

impl ComparisonReport {
    pub fn summary(&self) -> String {
        format!("{}: {}", self.title, self.result.summary())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: Uuid,
    pub run_at: DateTime<Utc>,
    pub key_column: String,
    pub comparisons: Vec<ComparisonReport>,
}

impl JobReport {
    pub fn get(&self, name: &str) -> Option<&ComparisonReport> {
        self.comparisons.iter().find(|c| c.name == name)
    }

    pub fn total_changes(&self) -> usize {
        self.comparisons.iter().map(|c| c.result.len()).sum()
    }

    pub fn summary(&self) -> String {
        let lines: Vec<String> = self.comparisons.iter().map(|c| c.summary()).collect();
        format!(
            "Job {} ({} comparisons, {} changed rows)\n{}",
            self.job_id,
            self.comparisons.len(),
            self.total_changes(),
            lines.join("\n")
        )
    }
}

/// Run every configured comparison over one snapshot pair.
///
/// Both snapshots are deduplicated on the key column first; duplicate keys
/// are logged, not rejected. Comparisons are independent and never merged.
pub fn run_job(config: &JobConfig, old: &Dataset, new: &Dataset) -> Result<JobReport, SchemaError> {
    let key = config.key_column.as_str();

    let old = dedupe_side(old, key, Side::Old)?;
    let new = dedupe_side(new, key, Side::New)?;

    let engine = config.engine();
    let mut comparisons = Vec::with_capacity(config.comparisons.len());

    for comparison in &config.comparisons {
        let _span = tracing::info_span!("comparison", name = %comparison.name).entered();
        let result = engine.reconcile(
            &old,
            &new,
            key,
            comparison.tracked.as_slice(),
            comparison.passthrough.as_slice(),
        )?;
        comparisons.push(report(comparison, result));
    }

    Ok(JobReport {
        job_id: Uuid::new_v4(),
        run_at: Utc::now(),
        key_column: config.key_column.clone(),
        comparisons,
    })
}

fn dedupe_side(dataset: &Dataset, key: &str, side: Side) -> Result<Dataset, SchemaError> {
    let tag = |e: SchemaError| match e {
        SchemaError::MissingColumn { column, .. } => SchemaError::MissingColumn {
            side: Some(side),
            column,
        },
        other => other,
    };

    let duplicates = duplicate_keys(dataset, key).map_err(tag)?;
    if !duplicates.is_empty() {
        let collapsed: usize = duplicates.iter().map(|(_, n)| n - 1).sum();
        tracing::warn!(
            side = %side,
            keys = duplicates.len(),
            collapsed,
            "duplicate keys collapsed to first occurrence"
        );
    }

    dedupe(dataset, key).map_err(tag)
}

fn report(config: &ComparisonConfig, result: ComparisonResult) -> ComparisonReport {
    ComparisonReport {
        name: config.name.clone(),
        title: config.title().to_string(),
        empty_message: config.empty_message(),
        result,
    }
}

// ============================================================================
// TESTS
// ============================================================================
