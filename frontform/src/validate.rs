//! Pre-commit validation.
//!
//! Walks every leaf depth-first in declaration order and collects all
//! violations before reporting, so the user sees every offending field at once.
//! Validation never mutates the tree.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::{
    data::{NodeBody, SchemaNode},
    error::{FieldIssue, Result, SchemaError},
    registry::FieldKind,
};

/// Validate the tree rooted at `root`.
///
/// # Errors
///
/// Returns a `VALIDATION_ERROR` listing every offending field.
pub fn validate(root: &SchemaNode) -> Result<()> {
    let issues = collect_issues(root);
    if issues.is_empty() {
        return Ok(());
    }
    let message = if issues.len() == 1 {
        format!("Invalid field {}", issues[0])
    } else {
        format!("{} fields are invalid", issues.len())
    };
    Err(SchemaError::validation_issues(message, issues))
}

/// Every violation found under `root`, in traversal order.
pub fn collect_issues(root: &SchemaNode) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    visit(root, "", &mut issues);
    issues
}

fn visit(node: &SchemaNode, path: &str, issues: &mut Vec<FieldIssue>) {
    match &node.body {
        NodeBody::Leaf { value } => check_leaf(node, value, path, issues),
        NodeBody::Object { children, .. } => {
            for child in children {
                let child_path = if path.is_empty() {
                    child.key.clone()
                } else {
                    format!("{path}.{}", child.key)
                };
                visit(child, &child_path, issues);
            }
        }
        NodeBody::Array(array) => {
            if node.required && array.is_empty() {
                issues.push(FieldIssue::new(path, "at least one item is required"));
            }
            for item in &array.items {
                visit(&item.node, &format!("{path}[{}]", item.position), issues);
            }
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn is_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
}

fn check_leaf(node: &SchemaNode, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) {
    let kind = node.kind();

    if is_blank(value) {
        if node.required {
            issues.push(FieldIssue::new(path, "is required"));
        }
        let wrong_type = match value {
            Value::String(_) => !kind.is_string_typed(),
            Value::Array(_) => kind != FieldKind::List,
            _ => false,
        };
        if wrong_type {
            issues.push(FieldIssue::new(path, format!("expected a {kind} value")));
        }
        return;
    }

    let problem = match kind {
        k if k.is_string_typed() && !value.is_string() => Some("expected a string".to_string()),
        FieldKind::Number if !value.is_number() => Some("expected a number".to_string()),
        FieldKind::Checkbox if !value.is_boolean() => Some("expected true or false".to_string()),
        FieldKind::List => match value {
            Value::Array(items) if items.iter().all(|i| !i.is_array() && !i.is_object()) => None,
            Value::Array(_) => Some("list entries must be plain values".to_string()),
            _ => Some("expected a list".to_string()),
        },
        FieldKind::Date => {
            let s = value.as_str().unwrap_or_default();
            (!is_date(s)).then(|| format!("{s:?} is not a date"))
        }
        FieldKind::Select => {
            let s = value.as_str().unwrap_or_default();
            (!node.options.iter().any(|o| o == s))
                .then(|| format!("{s:?} is not one of {:?}", node.options))
        }
        FieldKind::Url => {
            let s = value.as_str().unwrap_or_default();
            s.contains(char::is_whitespace)
                .then(|| "URLs cannot contain whitespace".to_string())
        }
        _ => None,
    };

    if let Some(reason) = problem {
        issues.push(FieldIssue::new(path, reason));
    }
}
