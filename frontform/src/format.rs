//! Structured encodings of canonical data.
//!
//! YAML is the canonical format: it stays diffable and hand-editable.
//! JSON and TOML files are supported for section objects kept in those formats.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::StorageError;

/// Encoding of a structured data file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Yaml,
    Json,
    Toml,
}

impl DataFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(DataFormat::Yaml),
            "json" => Some(DataFormat::Json),
            "toml" | "tml" => Some(DataFormat::Toml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, StorageError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        Self::from_extension(ext).ok_or_else(|| StorageError::UnsupportedFormat(ext.to_string()))
    }

    /// Decode text; blank text decodes to an empty mapping.
    pub fn decode(&self, text: &str) -> Result<Value, StorageError> {
        if text.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        let value = match self {
            DataFormat::Yaml => serde_yaml::from_str(text)?,
            DataFormat::Json => serde_json::from_str(text)?,
            DataFormat::Toml => toml_to_json(toml::from_str(text)?),
        };
        Ok(value)
    }

    pub fn encode(&self, value: &Value) -> Result<String, StorageError> {
        let s = match self {
            DataFormat::Yaml => serde_yaml::to_string(value)?,
            DataFormat::Json => {
                let mut s = serde_json::to_string_pretty(value)?;
                s.push('\n');
                s
            }
            DataFormat::Toml => toml::to_string_pretty(value)?,
        };
        Ok(s)
    }
}

/// Convert a TOML value to canonical data.
///
/// Datetimes become their RFC 3339 text, the same string a YAML file holds
/// for a date. They are written back as quoted strings.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_by_extension() {
        assert_eq!(
            DataFormat::from_path(Path::new("s/hero.yml")).unwrap(),
            DataFormat::Yaml
        );
        assert_eq!(
            DataFormat::from_path(Path::new("s/hero.JSON")).unwrap(),
            DataFormat::Json
        );
        assert!(matches!(
            DataFormat::from_path(Path::new("s/hero.txt")),
            Err(StorageError::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }

    #[test]
    fn test_yaml_keeps_key_order() {
        let value = json!({"title": "Hello", "date": "2024-01-01", "tags": ["a"]});
        let text = DataFormat::Yaml.encode(&value).unwrap();
        assert!(text.starts_with("title: Hello\n"));
        assert_eq!(DataFormat::Yaml.decode(&text).unwrap(), value);
    }

    #[test]
    fn test_toml_decodes_to_json_value() {
        let value = DataFormat::Toml
            .decode("title = \"x\"\n[author]\nname = \"y\"\n")
            .unwrap();
        assert_eq!(value, json!({"title": "x", "author": {"name": "y"}}));
    }

    #[test]
    fn test_toml_datetimes_decode_to_strings() {
        let text = r#"
date = 2024-05-01
published = 2024-05-01T10:00:00Z

[[events]]
at = 09:30:00
"#;
        let value = DataFormat::Toml.decode(text).unwrap();
        assert_eq!(
            value,
            json!({
                "date": "2024-05-01",
                "published": "2024-05-01T10:00:00Z",
                "events": [{"at": "09:30:00"}]
            })
        );

        let written = DataFormat::Toml.encode(&value).unwrap();
        assert!(written.contains("date = \"2024-05-01\""));
        assert!(!written.contains("toml_private"));
        assert_eq!(DataFormat::Toml.decode(&written).unwrap(), value);
    }

    #[test]
    fn test_blank_text_is_empty_mapping() {
        assert_eq!(DataFormat::Yaml.decode("  \n").unwrap(), json!({}));
    }
}
