//! Storage collaborator.
//!
//! The persistence coordinator only talks to storage through [`Storage`], so
//! the file system can be swapped for [`MemoryStorage`] in tests or for any
//! other backend by the host application.

use std::{
    collections::{BTreeMap, HashSet},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use crate::{error::StorageError, format::DataFormat};

/// Durable storage used to load and commit documents.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    /// Read and decode a structured data file.
    async fn read_structured(&self, path: &Path) -> Result<Value, StorageError>;

    /// Encode and write a structured data file.
    async fn write_structured(&self, data: &Value, path: &Path) -> Result<(), StorageError>;

    async fn read_text(&self, path: &Path) -> Result<String, StorageError>;

    async fn write_text(&self, text: &str, path: &Path) -> Result<(), StorageError>;

    async fn remove(&self, path: &Path) -> Result<(), StorageError>;
}

/// Storage backed by the local file system.
#[derive(Debug, Clone, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read_structured(&self, path: &Path) -> Result<Value, StorageError> {
        let format = DataFormat::from_path(path)?;
        let text = fs::read_to_string(path).await?;
        format.decode(&text)
    }

    async fn write_structured(&self, data: &Value, path: &Path) -> Result<(), StorageError> {
        let text = DataFormat::from_path(path)?.encode(data)?;
        self.write_text(&text, path).await
    }

    async fn read_text(&self, path: &Path) -> Result<String, StorageError> {
        Ok(fs::read_to_string(path).await?)
    }

    async fn write_text(&self, text: &str, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, text).await?;
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<(), StorageError> {
        fs::remove_file(path).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Read,
    Write,
    Remove,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Op::Read => "read",
            Op::Write => "write",
            Op::Remove => "remove",
        }
    }
}

/// In-memory storage with failure injection.
///
/// A failing write leaves the first half of the new content behind before
/// returning the error, the way an interrupted write would.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<PathBuf, String>>,
    fail_next: Mutex<HashSet<(Op, PathBuf)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file.
    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.lock_files().insert(path.into(), text.into());
    }

    /// Current content of a file.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock_files().get(path.as_ref()).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock_files().keys().cloned().collect()
    }

    /// Make the next write to `path` fail.
    pub fn fail_next_write(&self, path: impl Into<PathBuf>) {
        self.inject(Op::Write, path.into());
    }

    /// Make the next read of `path` fail.
    pub fn fail_next_read(&self, path: impl Into<PathBuf>) {
        self.inject(Op::Read, path.into());
    }

    /// Make the next removal of `path` fail and leave the file in place.
    pub fn fail_next_remove(&self, path: impl Into<PathBuf>) {
        self.inject(Op::Remove, path.into());
    }

    fn inject(&self, op: Op, path: PathBuf) {
        self.fail_next
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((op, path));
    }

    /// Consume an injected failure of `op` on `path`.
    fn take_failure(&self, op: Op, path: &Path) -> Option<StorageError> {
        let armed = self
            .fail_next
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(op, path.to_path_buf()));
        armed.then(|| {
            StorageError::Io(io::Error::other(format!(
                "injected {} failure for {}",
                op.as_str(),
                path.display()
            )))
        })
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn not_found(path: &Path) -> StorageError {
        StorageError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        ))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, path: &Path) -> bool {
        self.lock_files().contains_key(path)
    }

    async fn read_structured(&self, path: &Path) -> Result<Value, StorageError> {
        let format = DataFormat::from_path(path)?;
        let text = self.read_text(path).await?;
        format.decode(&text)
    }

    async fn write_structured(&self, data: &Value, path: &Path) -> Result<(), StorageError> {
        let text = DataFormat::from_path(path)?.encode(data)?;
        self.write_text(&text, path).await
    }

    async fn read_text(&self, path: &Path) -> Result<String, StorageError> {
        if let Some(err) = self.take_failure(Op::Read, path) {
            return Err(err);
        }
        self.get(path).ok_or_else(|| Self::not_found(path))
    }

    async fn write_text(&self, text: &str, path: &Path) -> Result<(), StorageError> {
        if let Some(err) = self.take_failure(Op::Write, path) {
            let mut cut = text.len() / 2;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            self.insert(path, &text[..cut]);
            return Err(err);
        }
        self.insert(path, text);
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(err) = self.take_failure(Op::Remove, path) {
            return Err(err);
        }
        self.lock_files()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(path))
    }
}
