//! Workspace configuration.
//!
//! Configuration is read from `.mdform.toml` in the workspace directory:
//!
//! ```toml
//! [schema]
//! default = "${workspaceFolder}/schemas/page.yaml"
//!
//! [templates]
//! dir = "layouts"
//!
//! [persist]
//! create_backup = true
//! backup_suffix = "bak"
//! ```
//!
//! Every section is optional. Paths may use `${workspaceFolder}`; relative
//! paths are resolved against the workspace directory.

use std::path::Path;

use anyhow::{Context, Result};
use frontform::PersistOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".mdform.toml";

/// Root configuration structure.
#[derive(Default, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Schema lookup.
    pub schema: SchemaSettings,
    /// Template index used by `select` fields with `options_from: templates`.
    pub templates: TemplateSettings,
    /// Backup behaviour when committing documents.
    pub persist: PersistOptions,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct SchemaSettings {
    /// Schema used when neither `--schema` is given nor a `<name>-schema.yaml`
    /// file sits next to the document.
    pub default: Option<String>,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct TemplateSettings {
    /// Directory scanned for templates.
    pub dir: Option<String>,
}

impl EditorConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load the configuration file, falling back to defaults when it is absent.
    pub async fn load(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// JSON Schema of the configuration file.
    pub fn json_schema() -> Result<serde_json::Value> {
        Ok(serde_json::to_value(schemars::schema_for!(EditorConfig))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EditorConfig::from_toml("").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert!(config.persist.create_backup);
        assert_eq!(config.persist.backup_suffix, "bak");
    }

    #[test]
    fn test_partial_config() {
        let config = EditorConfig::from_toml(
            "[templates]\ndir = \"layouts\"\n\n[persist]\ncreate_backup = false\n",
        )
        .unwrap();
        assert_eq!(config.templates.dir.as_deref(), Some("layouts"));
        assert_eq!(config.schema.default, None);
        assert!(!config.persist.create_backup);
        assert_eq!(config.persist.backup_suffix, "bak");
    }

    #[test]
    fn test_wrong_value_type_is_rejected() {
        assert!(EditorConfig::from_toml("[persist]\ncreate_backup = \"yes\"\n").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig::load(&dir.path().join(CONFIG_FILE)).await.unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_json_schema_lists_sections() {
        let schema = EditorConfig::json_schema().unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("schema"));
        assert!(properties.contains_key("templates"));
        assert!(properties.contains_key("persist"));
    }
}
