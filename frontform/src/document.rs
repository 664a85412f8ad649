//! Markdown documents with a YAML front-matter header.
//!
//! ```text
//! ---
//! title: About
//! ---
//! Prose body, passed through unchanged.
//! ```

use std::path::Path;

use serde_json::{Map, Value};

use crate::{error::StorageError, format::DataFormat};

/// A document split into its front-matter data and its prose body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Always a mapping.
    pub front_matter: Value,
    pub body: String,
}

impl Document {
    pub fn new(front_matter: Value, body: impl Into<String>) -> Self {
        Self {
            front_matter,
            body: body.into(),
        }
    }

    fn without_front_matter(text: &str) -> Self {
        Self::new(Value::Object(Map::new()), text)
    }

    /// Split `text` into front-matter and body.
    ///
    /// Text without an opening `---` line, or without a closing `---`/`...`
    /// line, has an empty front-matter and is kept whole as the body.
    pub fn parse(text: &str) -> Result<Self, StorageError> {
        let Some(rest) = text
            .strip_prefix("---\n")
            .or_else(|| text.strip_prefix("---\r\n"))
        else {
            return Ok(Self::without_front_matter(text));
        };

        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            let trimmed = line.trim_end();
            if trimmed == "---" || trimmed == "..." {
                let front_matter = DataFormat::Yaml.decode(&rest[..offset])?;
                if !front_matter.is_object() {
                    return Err(StorageError::Malformed(
                        "front-matter must be a mapping".to_string(),
                    ));
                }
                return Ok(Self::new(front_matter, &rest[offset + line.len()..]));
            }
            offset += line.len();
        }

        warn!("Front-matter opened but never closed, treating the whole text as body");
        Ok(Self::without_front_matter(text))
    }

    /// Join front-matter and body back into document text.
    pub fn render(&self) -> Result<String, StorageError> {
        let yaml = DataFormat::Yaml.encode(&self.front_matter)?;
        Ok(format!("---\n{yaml}---\n{}", self.body))
    }
}

/// Whether `path` names a markdown document.
pub fn is_markdown(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .as_deref(),
        Some("md" | "markdown")
    )
}
