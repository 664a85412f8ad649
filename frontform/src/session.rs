use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::{
    data::{FormSchema, ItemId},
    document::{Document, is_markdown},
    error::{AtPath, Result},
    format::DataFormat,
    persist::PersistCoordinator,
    render::EditEvent,
    storage::Storage,
    synth::{Form, Synthesizer},
};

/// How a document stores its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Markdown with a front-matter header; the body is kept as-is.
    Markdown,
    /// A structured section file.
    Data(DataFormat),
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        if is_markdown(path) {
            return Ok(DocumentKind::Markdown);
        }
        DataFormat::from_path(path).map(DocumentKind::Data).at_path(path)
    }
}

/// Derive the schema path of a document: `docs/about.md` -> `docs/about-schema.yaml`.
pub fn default_schema_path(document: &Path) -> PathBuf {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = format!("{stem}-schema.yaml");
    match document.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// One document opened for editing.
#[derive(Debug, Clone)]
pub struct EditSession {
    pub form: Form,
    /// Document the form is committed to.
    pub path: PathBuf,
    pub kind: DocumentKind,
    /// Markdown body, empty for data files.
    pub body: String,
    /// Whether the form has edits that were not committed yet.
    pub needs_save: bool,
    temp_artifacts: Vec<PathBuf>,
}

impl EditSession {
    /// Load `path` through `storage` and synthesize its form.
    ///
    /// A document that does not exist yet opens as an empty form.
    pub async fn open(
        storage: &dyn Storage,
        path: impl AsRef<Path>,
        schema: &FormSchema,
        synth: &Synthesizer,
    ) -> Result<Self> {
        let path = path.as_ref();
        let kind = DocumentKind::from_path(path)?;

        if !storage.exists(path).await {
            info!("{} does not exist yet, starting from an empty form", path.display());
            return Self::build(path, kind, &Value::Null, String::new(), schema, synth);
        }

        match kind {
            DocumentKind::Markdown => {
                let text = storage.read_text(path).await.at_path(path)?;
                let doc = Document::parse(&text).at_path(path)?;
                Self::build(path, kind, &doc.front_matter, doc.body, schema, synth)
            }
            DocumentKind::Data(_) => {
                let data = storage.read_structured(path).await.at_path(path)?;
                Self::build(path, kind, &data, String::new(), schema, synth)
            }
        }
    }

    /// Build a session from document text already in memory.
    pub fn from_text(
        text: &str,
        path: impl AsRef<Path>,
        schema: &FormSchema,
        synth: &Synthesizer,
    ) -> Result<Self> {
        let path = path.as_ref();
        let kind = DocumentKind::from_path(path)?;
        match kind {
            DocumentKind::Markdown => {
                let doc = Document::parse(text).at_path(path)?;
                Self::build(path, kind, &doc.front_matter, doc.body, schema, synth)
            }
            DocumentKind::Data(format) => {
                let data = format.decode(text).at_path(path)?;
                Self::build(path, kind, &data, String::new(), schema, synth)
            }
        }
    }

    fn build(
        path: &Path,
        kind: DocumentKind,
        data: &Value,
        body: String,
        schema: &FormSchema,
        synth: &Synthesizer,
    ) -> Result<Self> {
        Ok(EditSession {
            form: synth.synthesize(schema, data)?,
            path: path.to_path_buf(),
            kind,
            body,
            needs_save: false,
            temp_artifacts: Vec::new(),
        })
    }

    /// Apply an edit from the presentation layer.
    pub fn apply(&mut self, event: &EditEvent) -> Result<Option<ItemId>> {
        let minted = self.form.apply(event)?;
        self.needs_save = true;
        Ok(minted)
    }

    /// Remember a staging file to remove on the next successful save.
    ///
    /// Paths that cannot be removed stay tracked and are retried by the
    /// following save.
    pub fn track_temp_artifact(&mut self, path: impl Into<PathBuf>) {
        self.temp_artifacts.push(path.into());
    }

    pub fn temp_artifacts(&self) -> &[PathBuf] {
        &self.temp_artifacts
    }

    /// Commit pending edits, then remove tracked temp artifacts. Returns false
    /// when there was nothing to commit.
    ///
    /// On failure the session keeps its edits and `needs_save` stays set, so
    /// the save can be retried.
    pub async fn save(&mut self, coordinator: &PersistCoordinator) -> Result<bool> {
        if !self.needs_save {
            debug!("No changes to save for {}", self.path.display());
            self.cleanup(coordinator).await;
            return Ok(false);
        }

        match self.kind {
            DocumentKind::Markdown => {
                coordinator
                    .commit_document(&self.form, &self.body, &self.path)
                    .await?;
            }
            DocumentKind::Data(_) => {
                coordinator.commit(&self.form, &self.path).await?;
            }
        }
        self.needs_save = false;
        self.cleanup(coordinator).await;
        Ok(true)
    }

    async fn cleanup(&mut self, coordinator: &PersistCoordinator) {
        if self.temp_artifacts.is_empty() {
            return;
        }
        let Err(e) = coordinator.cleanup_temp_files(&self.temp_artifacts).await else {
            self.temp_artifacts.clear();
            return;
        };
        warn!("Temp file cleanup after saving {} failed: {e}", self.path.display());

        let mut left = Vec::new();
        for path in std::mem::take(&mut self.temp_artifacts) {
            if coordinator.storage().exists(&path).await {
                left.push(path);
            }
        }
        self.temp_artifacts = left;
    }
}
