//! Application context and state management.
//!
//! [`AppContext`] holds the workspace paths, the loaded configuration and the
//! storage collaborator, and knows how to find the schema of a document.

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use frontform::{
    EditSession, FormSchema, FsStorage, PersistCoordinator, Storage, Synthesizer,
    default_schema_path,
    templates::{self, TemplateEntry},
};

use crate::config::{CONFIG_FILE, EditorConfig};

/// Path configuration grouping all path-related fields.
#[derive(Default, Debug, Clone)]
pub struct PathConfig {
    /// Workspace root directory.
    pub workspace: PathBuf,
    /// Configuration file.
    pub config: PathBuf,
}

/// The main application context holding all state.
#[derive(Clone)]
pub struct AppContext {
    pub paths: PathConfig,
    pub config: EditorConfig,
    storage: Arc<FsStorage>,
}

impl AppContext {
    /// Build a context for `workspace`, loading `config` or `<workspace>/.mdform.toml`.
    pub async fn new(workspace: PathBuf, config: Option<PathBuf>) -> Result<Self> {
        let config_path = config.unwrap_or_else(|| workspace.join(CONFIG_FILE));
        let config = EditorConfig::load(&config_path).await?;
        Ok(Self::with_config(
            PathConfig {
                workspace,
                config: config_path,
            },
            config,
        ))
    }

    pub fn with_config(paths: PathConfig, config: EditorConfig) -> Self {
        Self {
            paths,
            config,
            storage: Arc::new(FsStorage::new()),
        }
    }

    /// Replaces variable placeholders in a string.
    ///
    /// Currently supports `${workspaceFolder}` which is replaced with the
    /// workspace directory path.
    pub fn value_replace_with_var<S>(&self, value: S) -> String
    where
        S: AsRef<OsStr>,
    {
        let raw = value.as_ref().to_string_lossy();
        raw.replace(
            "${workspaceFolder}",
            format!("{}", self.paths.workspace.display()).as_ref(),
        )
    }

    /// Expand variables and anchor relative paths at the workspace.
    pub fn resolve_path<S>(&self, value: S) -> PathBuf
    where
        S: AsRef<OsStr>,
    {
        let path = PathBuf::from(self.value_replace_with_var(value));
        if path.is_absolute() {
            path
        } else {
            self.paths.workspace.join(path)
        }
    }

    /// Schema file of `document`.
    ///
    /// An explicit path wins, then `<name>-schema.yaml` next to the document,
    /// then the configured default.
    pub async fn schema_path(&self, document: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(self.resolve_path(path));
        }
        let sibling = default_schema_path(document);
        if self.storage.exists(&sibling).await {
            return Ok(sibling);
        }
        match &self.config.schema.default {
            Some(default) => Ok(self.resolve_path(default)),
            None => bail!(
                "No schema for {}: pass --schema, create {} or set schema.default in {}",
                document.display(),
                sibling.display(),
                self.paths.config.display()
            ),
        }
    }

    pub async fn load_schema(
        &self,
        document: &Path,
        explicit: Option<&Path>,
    ) -> Result<FormSchema> {
        let path = self.schema_path(document, explicit).await?;
        info!("Using schema {}", path.display());
        Ok(FormSchema::load(&*self.storage, &path).await?)
    }

    /// Template entries from the configured template directory.
    pub fn templates(&self) -> Result<Vec<TemplateEntry>> {
        let Some(dir) = &self.config.templates.dir else {
            return Ok(Vec::new());
        };
        self.scan_templates(&self.resolve_path(dir))
    }

    pub fn scan_templates(&self, dir: &Path) -> Result<Vec<TemplateEntry>> {
        let index = templates::scan_dir(dir)
            .with_context(|| format!("failed to scan templates in {}", dir.display()))?;
        Ok(templates::flatten(&index))
    }

    pub fn synthesizer(&self) -> Result<Synthesizer> {
        Ok(Synthesizer::new().with_templates(self.templates()?))
    }

    pub fn coordinator(&self) -> PersistCoordinator {
        PersistCoordinator::new(self.storage.clone()).with_options(self.config.persist.clone())
    }

    /// Open `document` with its schema for editing.
    pub async fn open(&self, document: &Path, schema: Option<&Path>) -> Result<EditSession> {
        let document = self.resolve_path(document);
        let schema = self.load_schema(&document, schema).await?;
        let synth = self.synthesizer()?;
        Ok(EditSession::open(&*self.storage, &document, &schema, &synth).await?)
    }
}
