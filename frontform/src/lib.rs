//! # frontform
//!
//! Schema-driven front-matter form engine.
//!
//! A field schema (YAML, JSON or TOML) describes the front-matter of a markdown
//! document or the contents of a structured section file. `frontform` turns the
//! schema plus the document's current data into an editable tree, validates the
//! user's edits, serializes the tree back into canonical data and commits it to
//! storage with a backup that is restored if the write fails.
//!
//! ## Features
//!
//! - Twelve field kinds: text, textarea, number, checkbox, date, select, url,
//!   image, list, array, sections_array, object
//! - Stable item identities across add, remove and reorder
//! - Collect-all validation with per-field display paths
//! - Markdown front-matter documents with the body kept byte-for-byte
//! - YAML (canonical), JSON and TOML data files
//! - Injected async storage, with an in-memory fake for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::{path::Path, sync::Arc};
//!
//! use frontform::{
//!     EditSession, FieldPath, FormSchema, FsStorage, PersistCoordinator, Synthesizer,
//!     render::EditEvent,
//! };
//!
//! # async fn run() -> frontform::Result<()> {
//! let storage = Arc::new(FsStorage::new());
//! let schema =
//!     FormSchema::load(&*storage, Path::new("content/about-schema.yaml")).await?;
//! let mut session =
//!     EditSession::open(&*storage, "content/about.md", &schema, &Synthesizer::new())
//!         .await?;
//!
//! session.apply(&EditEvent::SetValue {
//!     path: FieldPath::root().key("title"),
//!     value: "About us".into(),
//! })?;
//! session.save(&PersistCoordinator::new(storage)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`registry`] - field kinds and their descriptors
//! - [`data`] - schema declarations and the editable node tree
//! - [`synth`] - form synthesis and edit operations
//! - [`validate`] - field constraints
//! - [`persist`] - backup, write and restore
//! - [`session`] - one document opened for editing

#[macro_use]
extern crate log;

pub mod data;
pub mod document;
pub mod error;
pub mod format;
pub mod persist;
pub mod registry;
pub mod render;
pub mod serialize;
pub mod session;
pub mod storage;
pub mod synth;
pub mod templates;
pub mod validate;

pub use data::{FieldPath, FieldSchema, FormSchema, ItemId, SchemaNode};
pub use error::{ErrorType, FieldIssue, RestoreOutcome, Result, SchemaError, is_schema_error};
pub use persist::{PersistCoordinator, PersistOptions};
pub use serde_json::Value;
pub use session::{DocumentKind, EditSession, default_schema_path};
pub use storage::{FsStorage, MemoryStorage, Storage};
pub use synth::{Form, Synthesizer};
