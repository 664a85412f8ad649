//! Tree to canonical data.
//!
//! The inverse of synthesis: objects become mappings (declared keys first, in
//! declaration order, then undeclared keys carried through), arrays become
//! sequences in their current order, leaves become their value.

use serde_json::{Map, Value};

use crate::data::{NodeBody, SchemaNode};

impl SchemaNode {
    /// Canonical data of this subtree.
    pub fn as_data(&self) -> Value {
        match &self.body {
            NodeBody::Leaf { value } => value.clone(),
            NodeBody::Object { children, extra } => {
                let mut map = Map::with_capacity(children.len() + extra.len());
                for child in children {
                    map.insert(child.key.clone(), child.as_data());
                }
                for (k, v) in extra {
                    map.insert(k.clone(), v.clone());
                }
                Value::Object(map)
            }
            NodeBody::Array(array) => {
                Value::Array(array.items.iter().map(|i| i.node.as_data()).collect())
            }
        }
    }
}

/// Canonical data of a whole tree.
pub fn to_data(root: &SchemaNode) -> Value {
    root.as_data()
}
