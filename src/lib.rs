// Snapshot Diff - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod dataset;
pub mod error;
pub mod parser;
pub mod rules;          // Field transforms + annotation rule
pub mod deduplication;  // Key dedupe, first occurrence wins
pub mod reconciliation; // Key-aligned join + per-field diff
pub mod config;         // TOML job configuration
pub mod job;            // Orchestrator: one snapshot pair, N comparisons
pub mod export;

// Re-export commonly used types
pub use dataset::{Dataset, Record, Value};
pub use error::{ConfigError, ParseError, SchemaError, Side};
pub use parser::{detect_format, load_dataset, load_dataset_from_bytes, InputFormat};
pub use rules::{FieldRules, FieldTransform, DEFAULT_ANNOTATION_FIELD, DEFAULT_PO_FIELD};
pub use deduplication::{dedupe, duplicate_keys};
pub use reconciliation::{
    ChangeRecord, ComparisonResult, JoinStats, ReconciliationEngine, DEFAULT_KEY_LABEL,
};
pub use config::{ComparisonConfig, JobConfig};
pub use job::{run_job, ComparisonReport, JobReport};
pub use export::{render_text_table, write_csv, write_json, write_report_csvs};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
