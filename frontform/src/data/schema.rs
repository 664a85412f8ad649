use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{AtPath, Result, SchemaError},
    storage::Storage,
};

/// Where a `select` field takes its options from when none are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionSource {
    /// Names of the flattened template index.
    Templates,
}

/// Declaration of one field, as written in a schema file.
///
/// ```yaml
/// - key: sections
///   kind: sections_array
///   label: Sections
///   position_key: weight
///   fields:
///     - key: heading
///       kind: text
///       required: true
///     - key: weight
///       kind: number
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field name, unique among siblings.
    pub key: String,
    /// Kind string; resolved against the registry at synthesis time.
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_from: Option<OptionSource>,
    /// Overrides the kind's zero value for leaves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Sections arrays only: number leaf rewritten with the 1-based position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_key: Option<String>,
    /// Object members, or the element fields of an array.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSchema>,
}

impl FieldSchema {
    pub fn new(key: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: kind.into(),
            label: None,
            placeholder: None,
            required: false,
            options: None,
            options_from: None,
            default: None,
            position_key: None,
            fields: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldSchema>) -> Self {
        self.fields = fields;
        self
    }
}

/// A complete form declaration: the front-matter of one document type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl FormSchema {
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        Self {
            title: None,
            fields,
        }
    }

    /// Build a schema from already decoded data.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| SchemaError::schema(format!("Invalid schema declaration: {e}")))
    }

    /// Parse a YAML (or JSON, which is valid YAML) schema document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| SchemaError::schema(format!("Invalid schema declaration: {e}")))
    }

    /// Load a schema file through the storage collaborator.
    pub async fn load(storage: &dyn Storage, path: &Path) -> Result<Self> {
        let value = storage.read_structured(path).await.at_path(path)?;
        debug!("Loaded schema from {}", path.display());
        Self::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_schema() {
        let schema = FormSchema::from_yaml(
            r#"
title: Page
fields:
  - key: title
    kind: text
    required: true
  - key: layout
    type: select
    options_from: templates
  - key: sections
    kind: sections_array
    position_key: weight
    fields:
      - key: heading
        kind: text
      - key: weight
        kind: number
"#,
        )
        .unwrap();

        assert_eq!(schema.title.as_deref(), Some("Page"));
        assert_eq!(schema.fields.len(), 3);
        assert!(schema.fields[0].required);
        assert_eq!(schema.fields[1].kind, "select");
        assert_eq!(schema.fields[1].options_from, Some(OptionSource::Templates));
        assert_eq!(schema.fields[2].position_key.as_deref(), Some("weight"));
        assert_eq!(schema.fields[2].fields.len(), 2);
    }

    #[test]
    fn test_missing_key_is_schema_error() {
        let err = FormSchema::from_yaml("fields:\n  - kind: text\n").unwrap_err();
        assert_eq!(err.error_type(), crate::error::ErrorType::Schema);
    }
}
