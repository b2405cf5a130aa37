// 🏷️ Field Rules - Per-field transforms and annotations as data
// Replaces name checks in the reconcile loop with a lookup table

use crate::dataset::Value;
use serde::{Deserialize, Serialize};

/// Default annotation column read from the new snapshot
pub const DEFAULT_ANNOTATION_FIELD: &str = "Reason";

/// Passthrough column rendered without thousands separators by default
pub const DEFAULT_PO_FIELD: &str = "Nupco PO No";

// ============================================================================
// TRANSFORMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTransform {
    /// Render as text and remove every `,` ("12,345" → "12345")
    StripThousandsSeparator,
    /// Render as text, unchanged otherwise
    Text,
    /// Keep the value as stored; turns off a default transform
    #[serde(alias = "none")]
    Identity,
}

impl FieldTransform {
    pub fn apply(&self, value: &Value) -> Value {
        match self {
            FieldTransform::StripThousandsSeparator => {
                Value::Text(value.to_string().replace(',', ""))
            }
            FieldTransform::Text => Value::Text(value.to_string()),
            FieldTransform::Identity => value.clone(),
        }
    }
}

// ============================================================================
// RULE SET
// ============================================================================

/// Transforms applied to passthrough columns, plus the optional annotation
/// column looked up by key in the new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRules {
    transforms: Vec<(String, FieldTransform)>,
    annotation: Option<String>,
}

impl FieldRules {
    /// No transforms, no annotation
    pub fn empty() -> Self {
        FieldRules {
            transforms: Vec::new(),
            annotation: None,
        }
    }

    pub fn with_transform(mut self, field: impl Into<String>, transform: FieldTransform) -> Self {
        let field = field.into();
        self.transforms.retain(|(f, _)| *f != field);
        self.transforms.push((field, transform));
        self
    }

    pub fn with_annotation(mut self, field: impl Into<String>) -> Self {
        self.annotation = Some(field.into());
        self
    }

    pub fn without_annotation(mut self) -> Self {
        self.annotation = None;
        self
    }

    pub fn transform_for(&self, field: &str) -> Option<FieldTransform> {
        self.transforms
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, t)| *t)
    }

    /// Apply the field's transform, if any
    pub fn render(&self, field: &str, value: &Value) -> Value {
        match self.transform_for(field) {
            Some(transform) => transform.apply(value),
            None => value.clone(),
        }
    }

    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    pub fn is_annotation(&self, field: &str) -> bool {
        self.annotation.as_deref() == Some(field)
    }

    pub fn transforms(&self) -> &[(String, FieldTransform)] {
        &self.transforms
    }
}

impl Default for FieldRules {
    fn default() -> Self {
        FieldRules::empty()
            .with_transform(DEFAULT_PO_FIELD, FieldTransform::StripThousandsSeparator)
            .with_annotation(DEFAULT_ANNOTATION_FIELD)
    }
}

// ============================================================================
// TESTS
// ============================================================================
