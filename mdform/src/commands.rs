//! Subcommand handlers.
//!
//! Each handler opens the document through [`AppContext`], applies at most one
//! edit, and commits it. Failures raised by the engine are printed by
//! [`present_error`]: validation errors field by field, file errors with the
//! destination and what happened to the backup.

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use frontform::{
    EditSession, FieldPath, ItemId, RestoreOutcome, SchemaError, Value, render::EditEvent,
    templates::TemplateEntry, validate::collect_issues,
};

use crate::{config::EditorConfig, ctx::AppContext, outline::OutlinePresenter};

/// Document and schema shared by every document subcommand.
#[derive(Debug, Clone)]
pub struct Target {
    pub document: PathBuf,
    pub schema: Option<PathBuf>,
}

/// Handler for document operations.
pub struct DocumentHandler;

impl DocumentHandler {
    async fn open(ctx: &AppContext, target: &Target) -> Result<EditSession> {
        ctx.open(&target.document, target.schema.as_deref()).await
    }

    async fn commit(ctx: &AppContext, session: &mut EditSession) -> Result<()> {
        if session.save(&ctx.coordinator()).await? {
            println!("{}", format!("Saved {}", session.path.display()).green());
        }
        Ok(())
    }

    /// Print the form of a document.
    pub async fn show(ctx: &AppContext, target: &Target) -> Result<()> {
        let session = Self::open(ctx, target).await?;
        if let Some(title) = &session.form.title {
            println!("{}", title.bold());
        }
        print!("{}", OutlinePresenter::render(&session.form));
        Ok(())
    }

    /// Validate a document without changing it.
    pub async fn check(ctx: &AppContext, target: &Target) -> Result<()> {
        let session = Self::open(ctx, target).await?;
        let issues = collect_issues(session.form.root());
        if issues.is_empty() {
            println!("{}", format!("{} is valid", session.path.display()).green());
            return Ok(());
        }
        for issue in &issues {
            println!("  {} {}", issue.field.red().bold(), issue.reason);
        }
        bail!("{} has {} invalid fields", session.path.display(), issues.len())
    }

    /// Set one leaf value.
    ///
    /// `raw` is read as YAML, so `true`, `3` and `[a, b]` keep their types;
    /// with `as_string` it is stored verbatim.
    pub async fn set(
        ctx: &AppContext,
        target: &Target,
        field: &str,
        raw: &str,
        as_string: bool,
    ) -> Result<()> {
        let mut session = Self::open(ctx, target).await?;
        let path: FieldPath = field.parse()?;
        let value = parse_value(raw, as_string);
        debug!("Setting {path} to {value}");
        session.apply(&EditEvent::SetValue { path, value })?;
        Self::commit(ctx, &mut session).await
    }

    /// Append a default item to an array field.
    pub async fn add(ctx: &AppContext, target: &Target, field: &str) -> Result<()> {
        let mut session = Self::open(ctx, target).await?;
        let path: FieldPath = field.parse()?;
        let identity = session
            .apply(&EditEvent::AddItem { path: path.clone() })?
            .ok_or_else(|| anyhow!("no item was added to {path}"))?;
        Self::commit(ctx, &mut session).await?;
        println!("Added {}", path.item(identity));
        Ok(())
    }

    pub async fn remove(ctx: &AppContext, target: &Target, field: &str, item: &str) -> Result<()> {
        let mut session = Self::open(ctx, target).await?;
        let path: FieldPath = field.parse()?;
        let identity: ItemId = item.parse()?;
        session.apply(&EditEvent::RemoveItem { path, identity })?;
        Self::commit(ctx, &mut session).await
    }

    /// Move an array item to the 1-based position `to`.
    pub async fn move_item(
        ctx: &AppContext,
        target: &Target,
        field: &str,
        item: &str,
        to: usize,
    ) -> Result<()> {
        if to == 0 {
            bail!("positions start at 1");
        }
        let mut session = Self::open(ctx, target).await?;
        let path: FieldPath = field.parse()?;
        let identity: ItemId = item.parse()?;
        session.apply(&EditEvent::MoveItem {
            path,
            identity,
            to: to - 1,
        })?;
        Self::commit(ctx, &mut session).await
    }

    /// List the templates offered to `select` fields.
    pub fn templates(ctx: &AppContext, dir: Option<&Path>) -> Result<()> {
        let entries: Vec<TemplateEntry> = match dir {
            Some(dir) => ctx.scan_templates(&ctx.resolve_path(dir))?,
            None => ctx.templates()?,
        };
        if entries.is_empty() {
            println!("{}", "No templates found".yellow());
        }
        for entry in entries {
            println!("{} {}", entry.name.bold(), entry.path.dimmed());
        }
        Ok(())
    }

    /// Print the JSON Schema of `.mdform.toml`.
    pub fn config_schema() -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(&EditorConfig::json_schema()?)?
        );
        Ok(())
    }
}

/// Read a command-line value.
pub fn parse_value(raw: &str, as_string: bool) -> Value {
    if as_string || raw.trim().is_empty() {
        return Value::String(raw.to_string());
    }
    match serde_yaml::from_str::<Value>(raw) {
        Ok(Value::Null) | Err(_) => Value::String(raw.to_string()),
        Ok(v) => v,
    }
}

/// Print an error for the terminal.
pub fn present_error(err: &anyhow::Error) {
    let Some(schema_err) = err.downcast_ref::<SchemaError>() else {
        eprintln!("{} {err:#}", "error:".red().bold());
        return;
    };

    eprintln!(
        "{} {}",
        format!("{}:", schema_err.error_type()).red().bold(),
        schema_err.message()
    );
    match schema_err {
        SchemaError::Validation { issues, .. } => {
            for issue in issues {
                eprintln!("  {} {}", issue.field.red(), issue.reason);
            }
        }
        SchemaError::File { path, restore, .. } => {
            eprintln!("  file: {}", path.display());
            match restore {
                RestoreOutcome::NotAttempted => {}
                RestoreOutcome::Restored { backup } => eprintln!(
                    "  {}",
                    format!("restored from {}", backup.display()).yellow()
                ),
                RestoreOutcome::Failed { backup, reason } => eprintln!(
                    "  {}",
                    format!("restore from {} failed: {reason}", backup.display()).red()
                ),
            }
        }
        SchemaError::Schema { .. } => {}
    }
}
