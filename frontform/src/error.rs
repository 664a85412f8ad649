//! Error taxonomy shared by every stage of the engine.
//!
//! All failures raised by this crate are [`SchemaError`] values. The three
//! variants mirror the three failure domains:
//!
//! - [`SchemaError::Schema`] - a malformed or unrecognized schema declaration
//! - [`SchemaError::Validation`] - user data that breaks a field constraint
//! - [`SchemaError::File`] - a failure at the storage boundary

use std::{
    fmt,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Discriminant tag of a [`SchemaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Malformed or unrecognized schema declaration.
    Schema,
    /// User-supplied data fails a constraint.
    Validation,
    /// Storage boundary failure.
    File,
}

impl ErrorType {
    /// Wire tag of the error type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Schema => "SCHEMA_ERROR",
            ErrorType::Validation => "VALIDATION_ERROR",
            ErrorType::File => "FILE_ERROR",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One offending field found by validation or synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Display path of the field (`title`, `author.name`, `sections[1].heading`).
    pub field: String,
    /// Human readable reason.
    pub reason: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// What happened to the destination after a failed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No backup existed, the destination was left as the failed write left it.
    NotAttempted,
    /// The destination was rewritten from the backup.
    Restored { backup: PathBuf },
    /// A backup existed but rewriting the destination from it failed too.
    Failed { backup: PathBuf, reason: String },
}

impl RestoreOutcome {
    pub fn was_attempted(&self) -> bool {
        !matches!(self, RestoreOutcome::NotAttempted)
    }
}

/// Error raised by the schema engine.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("{message}")]
    Schema { message: String },

    #[error("{message}")]
    Validation {
        message: String,
        issues: Vec<FieldIssue>,
    },

    #[error("{message}: {}", path.display())]
    File {
        message: String,
        path: PathBuf,
        restore: RestoreOutcome,
    },
}

impl SchemaError {
    /// Malformed schema declaration.
    pub fn schema(message: impl Into<String>) -> Self {
        SchemaError::Schema {
            message: message.into(),
        }
    }

    /// Constraint violation on a single field.
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        let message = message.into();
        SchemaError::Validation {
            issues: vec![FieldIssue::new(field, message.clone())],
            message,
        }
    }

    /// Constraint violations on several fields at once.
    pub fn validation_issues(message: impl Into<String>, issues: Vec<FieldIssue>) -> Self {
        SchemaError::Validation {
            message: message.into(),
            issues,
        }
    }

    /// Storage failure at `path`.
    pub fn file(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        SchemaError::File {
            message: message.into(),
            path: path.into(),
            restore: RestoreOutcome::NotAttempted,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            SchemaError::Schema { .. } => ErrorType::Schema,
            SchemaError::Validation { .. } => ErrorType::Validation,
            SchemaError::File { .. } => ErrorType::File,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            SchemaError::Schema { message }
            | SchemaError::Validation { message, .. }
            | SchemaError::File { message, .. } => message,
        }
    }

    /// Offending field names, empty unless this is a validation error.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            SchemaError::Validation { issues, .. } => {
                issues.iter().map(|i| i.field.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Storage path, present only for file errors.
    pub fn path(&self) -> Option<&Path> {
        match self {
            SchemaError::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Every error built by this crate carries the schema marker.
    pub fn is_schema_error(&self) -> bool {
        true
    }
}

/// Returns true when `err`, or any error in its source chain, came from this crate.
pub fn is_schema_error(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<SchemaError>().is_some() {
            return true;
        }
        current = e.source();
    }
    false
}

/// Failure reported by a storage collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("Unsupported file extension: {0:?}")]
    UnsupportedFormat(String),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

/// Attaches a path to a storage failure, turning it into a `FILE_ERROR`.
pub trait AtPath<T> {
    fn at_path(self, path: &Path) -> Result<T>;
}

impl<T> AtPath<T> for std::result::Result<T, StorageError> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|e| SchemaError::file(e.to_string(), path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_tag_their_type() {
        assert_eq!(SchemaError::schema("bad").error_type(), ErrorType::Schema);
        assert_eq!(
            SchemaError::validation("blank", "title").error_type(),
            ErrorType::Validation
        );
        assert_eq!(
            SchemaError::file("denied", "/tmp/a.md").error_type(),
            ErrorType::File
        );
        assert_eq!(ErrorType::Validation.to_string(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_payloads() {
        let err = SchemaError::validation("title is required", "title");
        assert_eq!(err.fields(), vec!["title"]);
        assert!(err.path().is_none());

        let err = SchemaError::file("disk full", "/srv/site/about.md");
        assert_eq!(err.path(), Some(Path::new("/srv/site/about.md")));
        assert!(err.fields().is_empty());
        assert_eq!(err.to_string(), "disk full: /srv/site/about.md");
    }

    #[test]
    fn test_marker_survives_wrapping() {
        #[derive(Debug, Error)]
        #[error("outer")]
        struct Outer(#[source] SchemaError);

        let wrapped = Outer(SchemaError::schema("bogus"));
        assert!(is_schema_error(&wrapped));

        let io = std::io::Error::other("unrelated");
        assert!(!is_schema_error(&io));
    }

    #[test]
    fn test_at_path() {
        let res: std::result::Result<(), StorageError> =
            Err(StorageError::Malformed("no closing delimiter".into()));
        let err = res.at_path(Path::new("post.md")).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::File);
        assert_eq!(err.path(), Some(Path::new("post.md")));
    }
}
