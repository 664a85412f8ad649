use std::{fmt, str::FromStr};

use serde_json::{Map, Value};

use crate::{
    error::{Result, SchemaError},
    registry::{FieldKind, FieldTypeDescriptor},
};

/// Stable identity of an array element within one editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) u64);

impl ItemId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix('#')
            .unwrap_or(s)
            .parse::<u64>()
            .map(ItemId)
            .map_err(|_| SchemaError::schema(format!("Invalid item identity: {s:?}")))
    }
}

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Member of an object.
    Key(String),
    /// Element of an array, addressed by identity.
    Item(ItemId),
}

/// Address of a node inside a form.
///
/// Written dot-separated, with `#<n>` addressing array elements by identity:
/// `author.name`, `sections.#3.heading`. The empty string is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(PathSegment::Key(key.into()));
        self
    }

    pub fn item(mut self, id: ItemId) -> Self {
        self.0.push(PathSegment::Item(id));
        self
    }
}

impl FromStr for FieldPath {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(FieldPath::root());
        }
        s.split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(SchemaError::schema(format!("Empty segment in path {s:?}")))
                } else if seg.starts_with('#') {
                    seg.parse().map(PathSegment::Item)
                } else {
                    Ok(PathSegment::Key(seg.to_string()))
                }
            })
            .collect::<Result<Vec<_>>>()
            .map(FieldPath)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match seg {
                PathSegment::Key(k) => f.write_str(k)?,
                PathSegment::Item(id) => write!(f, "{id}")?,
            }
        }
        Ok(())
    }
}

/// One node of the editable tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Field name, unique among siblings. Empty for the root and array elements.
    pub key: String,
    pub descriptor: &'static FieldTypeDescriptor,
    /// Present only when the kind supports labels.
    pub label: Option<String>,
    /// Present only when the kind supports placeholders.
    pub placeholder: Option<String>,
    pub required: bool,
    /// Allowed values of a `select`.
    pub options: Vec<String>,
    pub body: NodeBody,
}

/// Kind-specific content of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeBody {
    /// Leaf kinds carry their current value.
    Leaf { value: Value },
    /// Objects own their members in declaration order.
    Object {
        children: Vec<SchemaNode>,
        /// Data keys the schema does not declare, carried through untouched.
        extra: Map<String, Value>,
    },
    /// Arrays and sections arrays.
    Array(ArrayNode),
}

/// Content of an `array` or `sections_array` node.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
    pub items: Vec<EditableItem>,
    /// Element synthesized from empty data; new items are cloned from it.
    pub prototype: Box<SchemaNode>,
    /// Number leaf inside each element that mirrors the element position.
    pub position_key: Option<String>,
}

/// One element of an array container.
#[derive(Debug, Clone, PartialEq)]
pub struct EditableItem {
    pub identity: ItemId,
    /// Zero-based position, re-derived after every add, remove and move.
    pub position: usize,
    pub node: SchemaNode,
}

impl SchemaNode {
    pub fn kind(&self) -> FieldKind {
        self.descriptor.kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.body, NodeBody::Leaf { .. })
    }

    /// Display name: the label when present, else the key.
    pub fn title(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    /// Value of a leaf; `None` for containers.
    pub fn current_value(&self) -> Option<&Value> {
        match &self.body {
            NodeBody::Leaf { value } => Some(value),
            _ => None,
        }
    }

    /// Direct child nodes: object members, or array element nodes.
    pub fn children(&self) -> Vec<&SchemaNode> {
        match &self.body {
            NodeBody::Leaf { .. } => Vec::new(),
            NodeBody::Object { children, .. } => children.iter().collect(),
            NodeBody::Array(array) => array.items.iter().map(|i| &i.node).collect(),
        }
    }

    /// Object member by key.
    pub fn child(&self, key: &str) -> Option<&SchemaNode> {
        match &self.body {
            NodeBody::Object { children, .. } => children.iter().find(|c| c.key == key),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayNode> {
        match &self.body {
            NodeBody::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayNode> {
        match &mut self.body {
            NodeBody::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Find the node at `path`, relative to this node.
    pub fn resolve(&self, path: &FieldPath) -> Option<&SchemaNode> {
        let mut node = self;
        for seg in path.segments() {
            node = match (seg, &node.body) {
                (PathSegment::Key(key), NodeBody::Object { children, .. }) => {
                    children.iter().find(|c| &c.key == key)?
                }
                (PathSegment::Item(id), NodeBody::Array(array)) => &array.item(*id)?.node,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Mutable variant of [`SchemaNode::resolve`].
    pub fn resolve_mut(&mut self, path: &FieldPath) -> Option<&mut SchemaNode> {
        let mut node = self;
        for seg in path.segments() {
            node = match (seg, &mut node.body) {
                (PathSegment::Key(key), NodeBody::Object { children, .. }) => {
                    children.iter_mut().find(|c| &c.key == key)?
                }
                (PathSegment::Item(id), NodeBody::Array(array)) => &mut array.item_mut(*id)?.node,
                _ => return None,
            };
        }
        Some(node)
    }
}

impl ArrayNode {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, id: ItemId) -> Option<&EditableItem> {
        self.items.iter().find(|i| i.identity == id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut EditableItem> {
        self.items.iter_mut().find(|i| i.identity == id)
    }

    pub fn position_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|i| i.identity == id)
    }

    /// Identities in current order.
    pub fn identities(&self) -> Vec<ItemId> {
        self.items.iter().map(|i| i.identity).collect()
    }

    /// Append a node under a freshly minted identity.
    pub(crate) fn push(&mut self, identity: ItemId, node: SchemaNode) {
        let position = self.items.len();
        self.items.push(EditableItem {
            identity,
            position,
            node,
        });
    }

    pub(crate) fn remove(&mut self, id: ItemId) -> Option<EditableItem> {
        let idx = self.position_of(id)?;
        Some(self.items.remove(idx))
    }

    /// Move `id` to index `to`; a pure permutation of sibling order.
    pub(crate) fn move_to(&mut self, id: ItemId, to: usize) -> Result<()> {
        let from = self
            .position_of(id)
            .ok_or_else(|| SchemaError::schema(format!("No item {id} in array")))?;
        if to >= self.items.len() {
            return Err(SchemaError::schema(format!(
                "Move target {to} out of range for {} items",
                self.items.len()
            )));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    /// Re-derive position-dependent attributes after a structural change.
    pub(crate) fn renumber(&mut self) {
        for (idx, item) in self.items.iter_mut().enumerate() {
            item.position = idx;
            let Some(key) = &self.position_key else {
                continue;
            };
            if let NodeBody::Object { children, .. } = &mut item.node.body {
                if let Some(NodeBody::Leaf { value }) =
                    children.iter_mut().find(|c| &c.key == key).map(|c| &mut c.body)
                {
                    *value = Value::from(idx as u64 + 1);
                }
            }
        }
    }
}
