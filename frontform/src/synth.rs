//! Form synthesis.
//!
//! [`Synthesizer::synthesize`] turns a [`FormSchema`] plus the current data
//! into a [`Form`]: a tree of [`SchemaNode`]s whose leaves hold values and
//! whose arrays hold [`EditableItem`]s with stable identities. The form then
//! takes the user's edits (set, add, remove, move) until it is serialized.
//!
//! Synthesis is a pure, synchronous recursive descent; it never touches storage.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::{
    data::{
        ArrayNode, EditableItem, FieldPath, FieldSchema, FormSchema, ItemId, NodeBody,
        OptionSource, SchemaNode,
    },
    error::{Result, SchemaError},
    registry::{self, FieldKind, FieldTypeDescriptor},
    render::EditEvent,
    templates::TemplateEntry,
};

/// Mints item identities. Identities are never handed out twice.
#[derive(Debug, Clone, Default)]
pub struct IdentityAllocator {
    last: u64,
}

impl IdentityAllocator {
    pub fn mint(&mut self) -> ItemId {
        self.last += 1;
        ItemId(self.last)
    }
}

/// Builds editable forms from schemas.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    templates: Vec<TemplateEntry>,
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

fn object_node(body: NodeBody) -> SchemaNode {
    SchemaNode {
        key: String::new(),
        descriptor: registry::descriptor(FieldKind::Object),
        label: None,
        placeholder: None,
        required: false,
        options: Vec::new(),
        body,
    }
}

impl Synthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Template entries offered to `select` fields declared with `options_from: templates`.
    pub fn with_templates(mut self, templates: Vec<TemplateEntry>) -> Self {
        self.templates = templates;
        self
    }

    pub fn templates(&self) -> &[TemplateEntry] {
        &self.templates
    }

    /// Build the editable tree for `schema` filled from `data`.
    ///
    /// `null` reads as absent wherever it appears: a null field gets its
    /// default and a null array element becomes a default item. Such keys are
    /// written back with their defaults, not as `null`.
    ///
    /// # Errors
    ///
    /// - `SCHEMA_ERROR` for unknown kinds, duplicate sibling keys, nested fields
    ///   on leaf kinds, arrays without element fields or a bad `position_key`.
    /// - `VALIDATION_ERROR` for a `select` without options, or data whose shape
    ///   does not fit a container (a scalar where a mapping is declared, ...).
    pub fn synthesize(&self, schema: &FormSchema, data: &Value) -> Result<Form> {
        let mut ids = IdentityAllocator::default();
        let data = Some(data).filter(|v| !v.is_null());
        let body = self.object_body(&schema.fields, data, &mut ids, "")?;
        debug!(
            "Synthesized form {:?} with {} top-level fields",
            schema.title.as_deref().unwrap_or(""),
            schema.fields.len()
        );
        Ok(Form {
            title: schema.title.clone(),
            root: object_node(body),
            ids,
        })
    }

    fn object_body(
        &self,
        fields: &[FieldSchema],
        data: Option<&Value>,
        ids: &mut IdentityAllocator,
        path: &str,
    ) -> Result<NodeBody> {
        let map = match data {
            None => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                let field = if path.is_empty() { "(root)" } else { path };
                return Err(SchemaError::validation(
                    format!("Expected a mapping, found a {}", type_name(other)),
                    field,
                ));
            }
        };

        let mut seen = HashSet::new();
        let mut children = Vec::with_capacity(fields.len());
        for field in fields {
            if !seen.insert(field.key.as_str()) {
                return Err(SchemaError::schema(format!(
                    "Duplicate field key {:?} in {}",
                    field.key,
                    if path.is_empty() { "(root)" } else { path }
                )));
            }
            let value = map
                .and_then(|m| m.get(&field.key))
                .filter(|v| !v.is_null());
            children.push(self.field(field, value, ids, &join(path, &field.key))?);
        }

        let extra: Map<String, Value> = map
            .map(|m| {
                m.iter()
                    .filter(|(k, _)| !seen.contains(k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        if !extra.is_empty() {
            debug!("Carrying {} undeclared keys through {path:?}", extra.len());
        }

        Ok(NodeBody::Object { children, extra })
    }

    fn field(
        &self,
        field: &FieldSchema,
        data: Option<&Value>,
        ids: &mut IdentityAllocator,
        path: &str,
    ) -> Result<SchemaNode> {
        let descriptor = registry::lookup(&field.kind).map_err(|_| {
            SchemaError::schema(format!(
                "Unknown field kind {:?} for field {path}",
                field.kind
            ))
        })?;
        let kind = descriptor.kind;

        if !kind.is_container() && !field.fields.is_empty() {
            return Err(SchemaError::schema(format!(
                "Field {path} of kind {kind} cannot declare nested fields"
            )));
        }
        if field.position_key.is_some() && kind != FieldKind::SectionsArray {
            return Err(SchemaError::schema(format!(
                "Field {path}: position_key is only allowed on sections arrays"
            )));
        }

        let label = if descriptor.supports_label {
            field.label.clone()
        } else {
            None
        };
        let placeholder = if descriptor.supports_placeholder {
            field.placeholder.clone()
        } else {
            None
        };
        let options = self.options_for(field, descriptor, path)?;

        let body = match kind {
            FieldKind::Object => self.object_body(&field.fields, data, ids, path)?,
            FieldKind::Array | FieldKind::SectionsArray => {
                NodeBody::Array(self.array(field, data, ids, path)?)
            }
            _ => NodeBody::Leaf {
                value: data
                    .cloned()
                    .or_else(|| field.default.clone())
                    .unwrap_or_else(|| descriptor.default_value.to_value()),
            },
        };

        Ok(SchemaNode {
            key: field.key.clone(),
            descriptor,
            label,
            placeholder,
            required: field.required,
            options,
            body,
        })
    }

    fn options_for(
        &self,
        field: &FieldSchema,
        descriptor: &FieldTypeDescriptor,
        path: &str,
    ) -> Result<Vec<String>> {
        let mut options = field.options.clone().unwrap_or_default();
        if options.is_empty() && field.options_from == Some(OptionSource::Templates) {
            options = self.templates.iter().map(|t| t.name.clone()).collect();
        }
        if descriptor.requires_options && options.is_empty() {
            return Err(SchemaError::validation(
                format!("Select field {path} has no options"),
                path,
            ));
        }
        Ok(options)
    }

    fn array(
        &self,
        field: &FieldSchema,
        data: Option<&Value>,
        ids: &mut IdentityAllocator,
        path: &str,
    ) -> Result<ArrayNode> {
        if field.fields.is_empty() {
            return Err(SchemaError::schema(format!(
                "Array field {path} declares no element fields"
            )));
        }
        if let Some(key) = &field.position_key {
            let numeric = field.fields.iter().any(|f| {
                &f.key == key && matches!(f.kind.parse::<FieldKind>(), Ok(FieldKind::Number))
            });
            if !numeric {
                return Err(SchemaError::schema(format!(
                    "Field {path}: position_key {key:?} must name a number field of the element"
                )));
            }
        }

        let prototype = self.element(&field.fields, None, ids, &format!("{path}[]"))?;
        let mut array = ArrayNode {
            items: Vec::new(),
            prototype: Box::new(prototype),
            position_key: field.position_key.clone(),
        };

        match data {
            None => {}
            Some(Value::Array(elements)) => {
                for (idx, element) in elements.iter().enumerate() {
                    let identity = ids.mint();
                    // a null element is an empty mapping, like a null field is absent
                    let element = Some(element).filter(|v| !v.is_null());
                    let node =
                        self.element(&field.fields, element, ids, &format!("{path}[{idx}]"))?;
                    array.push(identity, node);
                }
            }
            Some(other) => {
                return Err(SchemaError::validation(
                    format!("Expected a sequence, found a {}", type_name(other)),
                    path,
                ));
            }
        }
        Ok(array)
    }

    fn element(
        &self,
        fields: &[FieldSchema],
        data: Option<&Value>,
        ids: &mut IdentityAllocator,
        path: &str,
    ) -> Result<SchemaNode> {
        Ok(object_node(self.object_body(fields, data, ids, path)?))
    }
}

/// An editable form: the root node plus the identity allocator of its session.
#[derive(Debug, Clone)]
pub struct Form {
    pub title: Option<String>,
    root: SchemaNode,
    ids: IdentityAllocator,
}

impl Form {
    /// Root object; its children are the top-level fields.
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    pub fn get(&self, path: &FieldPath) -> Option<&SchemaNode> {
        self.root.resolve(path)
    }

    /// Current value of the leaf at `path`.
    pub fn value(&self, path: &FieldPath) -> Option<&Value> {
        self.get(path).and_then(SchemaNode::current_value)
    }

    fn array_mut(&mut self, path: &FieldPath) -> Result<&mut ArrayNode> {
        let node = self
            .root
            .resolve_mut(path)
            .ok_or_else(|| SchemaError::schema(format!("No field at {path}")))?;
        let kind = node.kind();
        node.as_array_mut()
            .ok_or_else(|| SchemaError::schema(format!("Field {path} is a {kind}, not an array")))
    }

    /// Replace the value of the leaf at `path`.
    pub fn set_value(&mut self, path: &FieldPath, value: Value) -> Result<()> {
        let node = self
            .root
            .resolve_mut(path)
            .ok_or_else(|| SchemaError::schema(format!("No field at {path}")))?;
        let kind = node.kind();
        match &mut node.body {
            NodeBody::Leaf { value: current } => {
                *current = value;
                Ok(())
            }
            _ => Err(SchemaError::schema(format!(
                "Field {path} is a {kind} container, not a leaf"
            ))),
        }
    }

    /// Append a default element to the array at `path`.
    pub fn add_item(&mut self, path: &FieldPath) -> Result<ItemId> {
        self.array_mut(path)?;
        let identity = self.ids.mint();
        let array = self.array_mut(path)?;
        let node = (*array.prototype).clone();
        array.push(identity, node);
        array.renumber();
        debug!("Added item {identity} to {path}");
        Ok(identity)
    }

    /// Remove the element `identity` from the array at `path`.
    pub fn remove_item(&mut self, path: &FieldPath, identity: ItemId) -> Result<EditableItem> {
        let array = self.array_mut(path)?;
        let item = array
            .remove(identity)
            .ok_or_else(|| SchemaError::schema(format!("No item {identity} in {path}")))?;
        array.renumber();
        debug!("Removed item {identity} from {path}");
        Ok(item)
    }

    /// Move the element `identity` of the array at `path` to index `to`.
    pub fn move_item(&mut self, path: &FieldPath, identity: ItemId, to: usize) -> Result<()> {
        let array = self.array_mut(path)?;
        array.move_to(identity, to)?;
        array.renumber();
        debug!("Moved item {identity} of {path} to {to}");
        Ok(())
    }

    /// Apply a presentation event. Returns the identity minted by `AddItem`.
    pub fn apply(&mut self, event: &EditEvent) -> Result<Option<ItemId>> {
        match event {
            EditEvent::SetValue { path, value } => {
                self.set_value(path, value.clone())?;
                Ok(None)
            }
            EditEvent::AddItem { path } => self.add_item(path).map(Some),
            EditEvent::RemoveItem { path, identity } => {
                self.remove_item(path, *identity)?;
                Ok(None)
            }
            EditEvent::MoveItem { path, identity, to } => {
                self.move_item(path, *identity, *to)?;
                Ok(None)
            }
        }
    }

    /// Check every leaf; see [`crate::validate`].
    pub fn validate(&self) -> Result<()> {
        crate::validate::validate(&self.root)
    }

    /// Canonical data of the whole form; see [`crate::serialize`].
    pub fn to_data(&self) -> Value {
        self.root.as_data()
    }
}
