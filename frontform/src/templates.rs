//! Template index flattening.
//!
//! A template index is a nested structure describing a directory of
//! templates: sequences hold the entries of one directory, mappings name
//! files or deeper trees. [`flatten`] turns it into a flat, order-preserving
//! list of `{name: path}` entries for presentation.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use walkdir::WalkDir;

/// One template file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateEntry {
    /// Final path segment of the file.
    pub name: String,
    pub path: String,
}

impl TemplateEntry {
    /// Single-key mapping `{name: path}`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.name.clone(), Value::String(self.path.clone()));
        Value::Object(map)
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Flatten a nested template index into its files, in order.
pub fn flatten(index: &Value) -> Vec<TemplateEntry> {
    let mut out = Vec::new();
    collect(None, index, &mut out);
    out
}

/// [`flatten`], rendered as a sequence of single-key mappings.
pub fn flatten_to_value(index: &Value) -> Value {
    Value::Array(flatten(index).iter().map(TemplateEntry::to_value).collect())
}

fn collect(key: Option<&str>, value: &Value, out: &mut Vec<TemplateEntry>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                collect(Some(k), v, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect(None, v, out);
            }
        }
        Value::String(path) => {
            if path.is_empty() {
                return;
            }
            let name = match base_name(path) {
                "" => key.unwrap_or(path.as_str()),
                name => name,
            };
            out.push(TemplateEntry {
                name: name.to_string(),
                path: path.clone(),
            });
        }
        Value::Number(_) | Value::Bool(_) => {
            let path = value.to_string();
            out.push(TemplateEntry {
                name: key.unwrap_or(path.as_str()).to_string(),
                path,
            });
        }
        Value::Null => {}
    }
}

/// Build a nested template index from a directory tree.
///
/// Each directory becomes a sequence of single-key mappings; files map to
/// their `/`-joined path relative to `root`, subdirectories to their own
/// sequence. Entries are sorted by name and dot-files are skipped.
pub fn scan_dir(root: &Path) -> std::io::Result<Value> {
    scan_level(root, root)
}

fn scan_level(root: &Path, dir: &Path) -> std::io::Result<Value> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::other)?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }

        let value = if entry.file_type().is_dir() {
            scan_level(root, entry.path())?
        } else {
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let joined = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Value::String(joined)
        };

        let mut map = Map::new();
        map.insert(name, value);
        entries.push(Value::Object(map));
    }
    Ok(Value::Array(entries))
}
