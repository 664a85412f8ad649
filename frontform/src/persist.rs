//! Persistence coordinator.
//!
//! Commits a validated form through a [`Storage`] collaborator:
//!
//! 1. validate and serialize the form in memory,
//! 2. copy the current destination to its backup path (when enabled),
//! 3. write the destination,
//! 4. on write failure, restore the destination from the backup if one exists,
//!    then raise `FILE_ERROR` for the destination.
//!
//! Each step is awaited before the next one starts, and commits to the same
//! destination are serialized by a per-path lock. Paths are compared after
//! lexical normalization, so `a.md` and `./a.md` share one lock.

use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
    sync::{Arc, Mutex},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    document::Document,
    error::{AtPath, RestoreOutcome, Result, SchemaError},
    storage::Storage,
    synth::Form,
};

/// Backup behaviour of the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct PersistOptions {
    /// Copy the current destination to the backup path before each write.
    pub create_backup: bool,
    /// Extension appended to the destination file name to form the backup path.
    pub backup_suffix: String,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            create_backup: true,
            backup_suffix: "bak".to_string(),
        }
    }
}

impl PersistOptions {
    /// Known backup path of `dest`: `about.md` -> `about.md.bak`.
    pub fn backup_path(&self, dest: &Path) -> PathBuf {
        let mut name = dest
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".");
        name.push(&self.backup_suffix);
        dest.with_file_name(name)
    }
}

enum Payload<'a> {
    Structured(&'a Value),
    Text(&'a str),
}

/// Writes forms to storage with backup-then-restore semantics.
pub struct PersistCoordinator {
    storage: Arc<dyn Storage>,
    options: PersistOptions,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl PersistCoordinator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            options: PersistOptions::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_options(mut self, options: PersistOptions) -> Self {
        self.options = options;
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn options(&self) -> &PersistOptions {
        &self.options
    }

    /// Validate `form` and write its canonical data to the structured file `dest`.
    ///
    /// Returns the data that was written.
    pub async fn commit(&self, form: &Form, dest: &Path) -> Result<Value> {
        form.validate()?;
        let data = form.to_data();
        self.persist(dest, Payload::Structured(&data)).await?;
        info!("Committed {}", dest.display());
        Ok(data)
    }

    /// Validate `form` and write it as the front-matter of the markdown document
    /// `dest`, with `body` passed through unchanged.
    ///
    /// Returns the document text that was written.
    pub async fn commit_document(&self, form: &Form, body: &str, dest: &Path) -> Result<String> {
        form.validate()?;
        let text = Document::new(form.to_data(), body)
            .render()
            .at_path(dest)?;
        self.persist(dest, Payload::Text(&text)).await?;
        info!("Committed {}", dest.display());
        Ok(text)
    }

    fn lock_for(&self, key: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(key.to_path_buf()).or_default().clone()
    }

    /// Drop the lock of `key` once no commit holds or waits for it.
    fn release(&self, key: &Path) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
    }

    async fn persist(&self, dest: &Path, payload: Payload<'_>) -> Result<()> {
        let key = lock_key(dest);
        let lock = self.lock_for(&key);
        let result = {
            let _guard = lock.lock().await;
            self.write_with_backup(dest, payload).await
        };
        drop(lock);
        self.release(&key);
        result
    }

    async fn write_with_backup(&self, dest: &Path, payload: Payload<'_>) -> Result<()> {
        let backup = self.options.backup_path(dest);
        if self.options.create_backup && self.storage.exists(dest).await {
            let current = self.storage.read_text(dest).await.at_path(dest)?;
            self.storage
                .write_text(&current, &backup)
                .await
                .at_path(&backup)?;
            debug!("Backed up {} to {}", dest.display(), backup.display());
        }

        let written = match payload {
            Payload::Structured(data) => self.storage.write_structured(data, dest).await,
            Payload::Text(text) => self.storage.write_text(text, dest).await,
        };

        let Err(err) = written else {
            return Ok(());
        };
        error!("Writing {} failed: {err}", dest.display());

        let restore = if self.storage.exists(&backup).await {
            self.restore(dest, &backup).await
        } else {
            warn!("No backup at {}, nothing to restore", backup.display());
            RestoreOutcome::NotAttempted
        };

        Err(SchemaError::File {
            message: format!("Failed to write document: {err}"),
            path: dest.to_path_buf(),
            restore,
        })
    }

    async fn restore(&self, dest: &Path, backup: &Path) -> RestoreOutcome {
        let restored = match self.storage.read_text(backup).await {
            Ok(text) => self.storage.write_text(&text, dest).await,
            Err(e) => Err(e),
        };
        match restored {
            Ok(()) => {
                info!("Restored {} from {}", dest.display(), backup.display());
                RestoreOutcome::Restored {
                    backup: backup.to_path_buf(),
                }
            }
            Err(e) => {
                error!("Restoring {} from {} failed: {e}", dest.display(), backup.display());
                RestoreOutcome::Failed {
                    backup: backup.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Remove temporary artifacts, skipping the ones already gone.
    ///
    /// Returns the paths that were removed. Every path is attempted; the first
    /// removal failure is returned as a `FILE_ERROR` afterwards.
    pub async fn cleanup_temp_files(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        let mut failure = None;
        for path in paths {
            if !self.storage.exists(path).await {
                debug!("Temp file {} already gone", path.display());
                continue;
            }
            match self.storage.remove(path).await {
                Ok(()) => removed.push(path.clone()),
                Err(e) => {
                    warn!("Failed to remove temp file {}: {e}", path.display());
                    if failure.is_none() {
                        failure = Some(SchemaError::file(
                            format!("Failed to remove temp file: {e}"),
                            path,
                        ));
                    }
                }
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(removed),
        }
    }
}

/// Absolute, lexically cleaned form of `dest`, used to key the commit locks.
fn lock_key(dest: &Path) -> PathBuf {
    let absolute = std::path::absolute(dest).unwrap_or_else(|_| dest.to_path_buf());
    let mut key = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                key.pop();
            }
            other => key.push(other),
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::{FieldSchema, FormSchema},
        error::ErrorType,
        format::DataFormat,
        storage::MemoryStorage,
        synth::Synthesizer,
    };
    use serde_json::json;

    fn form(data: Value) -> Form {
        let schema = FormSchema::new(vec![
            FieldSchema::new("title", "text").required(),
            FieldSchema::new("draft", "checkbox"),
        ]);
        Synthesizer::new().synthesize(&schema, &data).unwrap()
    }

    fn coordinator(storage: &Arc<MemoryStorage>, create_backup: bool) -> PersistCoordinator {
        PersistCoordinator::new(storage.clone()).with_options(PersistOptions {
            create_backup,
            ..Default::default()
        })
    }

    #[test]
    fn test_backup_path() {
        let options = PersistOptions::default();
        assert_eq!(
            options.backup_path(Path::new("content/about.md")),
            PathBuf::from("content/about.md.bak")
        );
    }

    #[tokio::test]
    async fn test_commit_writes_yaml_and_backup() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert("hero.yaml", "title: Old\n");
        let coordinator = coordinator(&storage, true);

        let data = coordinator
            .commit(&form(json!({"title": "New"})), Path::new("hero.yaml"))
            .await
            .unwrap();

        assert_eq!(data, json!({"title": "New", "draft": false}));
        assert_eq!(storage.get("hero.yaml").unwrap(), "title: New\ndraft: false\n");
        assert_eq!(storage.get("hero.yaml.bak").unwrap(), "title: Old\n");
    }

    #[tokio::test]
    async fn test_commit_refuses_invalid_form() {
        let storage = Arc::new(MemoryStorage::new());
        let coordinator = coordinator(&storage, true);

        let err = coordinator
            .commit(&form(json!({"title": " "})), Path::new("hero.yaml"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        assert!(storage.paths().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_restores_existing_backup() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert("page.yaml.bak", "title: From backup\n");
        storage.insert("page.yaml", "title: Current\n");
        storage.fail_next_write("page.yaml");
        let coordinator = coordinator(&storage, false);

        let err = coordinator
            .commit(&form(json!({"title": "New"})), Path::new("page.yaml"))
            .await
            .unwrap_err();

        assert_eq!(err.error_type(), ErrorType::File);
        assert_eq!(err.path(), Some(Path::new("page.yaml")));
        assert!(matches!(
            err,
            SchemaError::File { restore: RestoreOutcome::Restored { .. }, .. }
        ));
        assert_eq!(storage.get("page.yaml").unwrap(), "title: From backup\n");
    }

    #[tokio::test]
    async fn test_failed_restore_is_reported_with_write_error() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert("page.yaml.bak", "title: From backup\n");
        storage.insert("page.yaml", "title: Current\n");
        storage.fail_next_write("page.yaml");
        storage.fail_next_read("page.yaml.bak");
        let coordinator = coordinator(&storage, false);

        let err = coordinator
            .commit(&form(json!({"title": "New"})), Path::new("page.yaml"))
            .await
            .unwrap_err();

        assert_eq!(err.error_type(), ErrorType::File);
        assert!(err.message().contains("injected write failure for page.yaml"));
        match &err {
            SchemaError::File { path, restore, .. } => {
                assert_eq!(path, Path::new("page.yaml"));
                assert!(restore.was_attempted());
                assert!(matches!(
                    restore,
                    RestoreOutcome::Failed { backup, reason }
                        if backup == Path::new("page.yaml.bak")
                            && reason.contains("injected read failure")
                ));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(storage.get("page.yaml.bak").unwrap(), "title: From backup\n");
    }

    #[tokio::test]
    async fn test_write_failure_with_fresh_backup_keeps_previous_version() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert("about.md", "---\ntitle: Old\n---\nBody\n");
        storage.fail_next_write("about.md");
        let coordinator = coordinator(&storage, true);

        let err = coordinator
            .commit_document(&form(json!({"title": "New"})), "Body\n", Path::new("about.md"))
            .await
            .unwrap_err();

        assert_eq!(err.error_type(), ErrorType::File);
        assert_eq!(storage.get("about.md").unwrap(), "---\ntitle: Old\n---\nBody\n");
    }

    #[tokio::test]
    async fn test_write_failure_without_backup_still_raises() {
        let storage = Arc::new(MemoryStorage::new());
        storage.fail_next_write("new.yaml");
        let coordinator = coordinator(&storage, true);

        let err = coordinator
            .commit(&form(json!({"title": "New"})), Path::new("new.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::File { restore: RestoreOutcome::NotAttempted, .. }
        ));
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let storage = Arc::new(MemoryStorage::new());
        storage.insert("tmp/a.png", "a");
        storage.insert("tmp/c.png", "c");
        storage.insert("keep.md", "k");
        let coordinator = coordinator(&storage, true);
        let paths = vec![
            PathBuf::from("tmp/a.png"),
            PathBuf::from("tmp/b.png"),
            PathBuf::from("tmp/c.png"),
        ];

        let removed = coordinator.cleanup_temp_files(&paths).await.unwrap();
        assert_eq!(removed, vec![PathBuf::from("tmp/a.png"), PathBuf::from("tmp/c.png")]);
        assert_eq!(storage.paths(), vec![PathBuf::from("keep.md")]);

        assert!(coordinator.cleanup_temp_files(&paths).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commits_to_one_path_are_serialized() {
        let storage = Arc::new(MemoryStorage::new());
        let coordinator = Arc::new(coordinator(&storage, true));

        let mut handles = Vec::new();
        for i in 0..8 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                let f = form(json!({"title": format!("v{i}")}));
                coordinator.commit(&f, Path::new("race.yaml")).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let last = DataFormat::Yaml
            .decode(&storage.get("race.yaml").unwrap())
            .unwrap();
        let backup = DataFormat::Yaml
            .decode(&storage.get("race.yaml.bak").unwrap())
            .unwrap();
        assert!(last["title"].as_str().unwrap().starts_with('v'));
        assert!(backup["title"].as_str().unwrap().starts_with('v'));
        assert!(coordinator.locks.lock().unwrap().is_empty());
    }

    #[test]
    fn test_lock_key_is_normalized() {
        assert_eq!(lock_key(Path::new("a.md")), lock_key(Path::new("./a.md")));
        assert_eq!(
            lock_key(Path::new("content/../content/./about.md")),
            lock_key(Path::new("content/about.md"))
        );
        assert!(lock_key(Path::new("a.md")).is_absolute());
        assert_ne!(lock_key(Path::new("a.md")), lock_key(Path::new("b.md")));
    }

    #[tokio::test]
    async fn test_locks_are_released_after_commit() {
        let storage = Arc::new(MemoryStorage::new());
        let coordinator = coordinator(&storage, true);
        for dest in ["one.yaml", "./one.yaml", "two.yaml"] {
            coordinator
                .commit(&form(json!({"title": "x"})), Path::new(dest))
                .await
                .unwrap();
        }
        storage.fail_next_write("two.yaml");
        let failed = coordinator
            .commit(&form(json!({"title": "y"})), Path::new("two.yaml"))
            .await;
        assert!(failed.is_err());
        assert!(coordinator.locks.lock().unwrap().is_empty());
    }
}
