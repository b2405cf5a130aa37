// ⚙️ Job Configuration - Which comparisons to run over a snapshot pair
// Loaded from TOML; the built-in default mirrors the delivery/status report

use crate::error::ConfigError;
use crate::reconciliation::{ReconciliationEngine, DEFAULT_KEY_LABEL};
use crate::rules::{FieldRules, FieldTransform, DEFAULT_ANNOTATION_FIELD, DEFAULT_PO_FIELD};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

// ============================================================================
// TOP-LEVEL CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Column identifying a record in both snapshots
    pub key_column: String,

    /// Output label for the key column
    #[serde(default = "default_key_label")]
    pub key_label: String,

    /// Column of the new snapshot attached to every changed row.
    /// Empty string disables the lookup.
    #[serde(default = "default_annotation_field")]
    pub annotation_field: String,

    /// Passthrough field -> transform. Omitting the table keeps the default
    /// separator strip on "Nupco PO No"; map a field to "identity" to turn
    /// a transform off.
    #[serde(default = "default_transforms")]
    pub transforms: BTreeMap<String, FieldTransform>,

    #[serde(rename = "comparison")]
    pub comparisons: Vec<ComparisonConfig>,
}

fn default_key_label() -> String {
    DEFAULT_KEY_LABEL.to_string()
}

fn default_annotation_field() -> String {
    DEFAULT_ANNOTATION_FIELD.to_string()
}

fn default_transforms() -> BTreeMap<String, FieldTransform> {
    BTreeMap::from([(
        DEFAULT_PO_FIELD.to_string(),
        FieldTransform::StripThousandsSeparator,
    )])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Machine name, also used for export file names
    pub name: String,

    /// Heading shown above the report
    #[serde(default)]
    pub title: Option<String>,

    pub tracked: Vec<String>,

    #[serde(default)]
    pub passthrough: Vec<String>,
}

impl ComparisonConfig {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    /// Fallback line for an empty report
    pub fn empty_message(&self) -> String {
        let subject = self.title().strip_prefix("Changes in ").unwrap_or(self.title());
        format!("No changes in {subject} found.")
    }
}

impl JobConfig {
    /// Parse and validate a TOML config
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: JobConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::Parse(format!("failed to read {:?}: {e}", path.as_ref()))
        })?;
        JobConfig::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_column.trim().is_empty() {
            return Err(ConfigError::Validation("key_column must not be empty".into()));
        }

        if self.comparisons.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [[comparison]] is required".into(),
            ));
        }

        let mut names = HashSet::new();
        for comparison in &self.comparisons {
            if comparison.name.trim().is_empty() {
                return Err(ConfigError::Validation("comparison name must not be empty".into()));
            }
            if !names.insert(comparison.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate comparison name '{}'",
                    comparison.name
                )));
            }
            if comparison.tracked.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "comparison '{}': at least one tracked field is required",
                    comparison.name
                )));
            }
            let mut tracked = HashSet::new();
            if let Some(field) = comparison.tracked.iter().find(|f| !tracked.insert(f.as_str())) {
                return Err(ConfigError::Validation(format!(
                    "comparison '{}': tracked field '{field}' listed twice",
                    comparison.name
                )));
            }
        }

        Ok(())
    }

    pub fn rules(&self) -> FieldRules {
        let mut rules = FieldRules::empty();
        for (field, transform) in &self.transforms {
            rules = rules.with_transform(field.clone(), *transform);
        }
        if !self.annotation_field.is_empty() {
            rules = rules.with_annotation(self.annotation_field.clone());
        }
        rules
    }

    pub fn engine(&self) -> ReconciliationEngine {
        ReconciliationEngine::with_rules(self.rules()).with_key_label(self.key_label.clone())
    }
}

impl Default for JobConfig {
    /// Delivery-date and request-status comparisons keyed by "Request ID"
    fn default() -> Self {
        JobConfig {
            key_column: "Request ID".to_string(),
            key_label: default_key_label(),
            annotation_field: default_annotation_field(),
            transforms: default_transforms(),
            comparisons: vec![
                ComparisonConfig {
                    name: "delivery_dates".to_string(),
                    title: Some("Changes in Delivery Dates".to_string()),
                    tracked: vec!["Delivery Date".to_string()],
                    passthrough: vec![
                        DEFAULT_PO_FIELD.to_string(),
                        "Shipped to Location".to_string(),
                    ],
                },
                ComparisonConfig {
                    name: "request_status".to_string(),
                    title: Some("Changes in Request Status".to_string()),
                    tracked: vec!["Request Status".to_string()],
                    passthrough: vec![
                        DEFAULT_PO_FIELD.to_string(),
                        "Shipped to Location".to_string(),
                        DEFAULT_ANNOTATION_FIELD.to_string(),
                    ],
                },
            ],
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
