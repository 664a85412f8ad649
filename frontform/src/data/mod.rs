//! Schema declarations and the editable node tree.
//!
//! - [`schema`] - serde model of schema files ([`FormSchema`], [`FieldSchema`])
//! - [`node`] - the in-memory tree built from a schema plus data ([`SchemaNode`])

/// Schema declaration model.
pub mod schema;

/// Editable node tree.
pub mod node;

pub use node::{ArrayNode, EditableItem, FieldPath, ItemId, NodeBody, PathSegment, SchemaNode};
pub use schema::{FieldSchema, FormSchema, OptionSource};
