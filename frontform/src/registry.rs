//! Field type registry.
//!
//! A process-wide, immutable table with exactly one [`FieldTypeDescriptor`]
//! per [`FieldKind`]. The table is a `static`, so it can be shared by any
//! number of editing sessions without synchronization.

use std::{fmt, str::FromStr};

use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};

/// Supported field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Checkbox,
    Date,
    Select,
    Url,
    Image,
    List,
    Array,
    SectionsArray,
    Object,
}

impl FieldKind {
    /// Every kind, in registry order.
    pub const ALL: [FieldKind; 12] = [
        FieldKind::Text,
        FieldKind::Textarea,
        FieldKind::Number,
        FieldKind::Checkbox,
        FieldKind::Date,
        FieldKind::Select,
        FieldKind::Url,
        FieldKind::Image,
        FieldKind::List,
        FieldKind::Array,
        FieldKind::SectionsArray,
        FieldKind::Object,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Number => "number",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Date => "date",
            FieldKind::Select => "select",
            FieldKind::Url => "url",
            FieldKind::Image => "image",
            FieldKind::List => "list",
            FieldKind::Array => "array",
            FieldKind::SectionsArray => "sections_array",
            FieldKind::Object => "object",
        }
    }

    /// Containers own child nodes instead of a value.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            FieldKind::Array | FieldKind::SectionsArray | FieldKind::Object
        )
    }

    /// Leaf kinds whose value is edited as a string.
    pub fn is_string_typed(&self) -> bool {
        matches!(
            self,
            FieldKind::Text
                | FieldKind::Textarea
                | FieldKind::Date
                | FieldKind::Select
                | FieldKind::Url
                | FieldKind::Image
        )
    }

    /// Kinds whose value is a sequence.
    pub fn is_sequence(&self) -> bool {
        matches!(
            self,
            FieldKind::List | FieldKind::Array | FieldKind::SectionsArray
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "sections" {
            return Ok(FieldKind::SectionsArray);
        }
        FieldKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| SchemaError::schema(format!("Unknown field kind: {s:?}")))
    }
}

/// Type-appropriate zero value of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    EmptyString,
    Zero,
    False,
    EmptySequence,
    EmptyMapping,
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            DefaultValue::EmptyString => Value::String(String::new()),
            DefaultValue::Zero => Value::from(0),
            DefaultValue::False => Value::Bool(false),
            DefaultValue::EmptySequence => Value::Array(Vec::new()),
            DefaultValue::EmptyMapping => Value::Object(Map::new()),
        }
    }
}

/// Static description of a field kind.
#[derive(Debug, PartialEq, Eq)]
pub struct FieldTypeDescriptor {
    pub kind: FieldKind,
    pub default_value: DefaultValue,
    pub supports_placeholder: bool,
    pub supports_label: bool,
    /// True only for `select`.
    pub requires_options: bool,
    /// True only for `array` and `sections_array`.
    pub is_reorderable_container: bool,
    /// `Some("sections")` for `sections_array`, distinguishing it from a plain array.
    pub container_sub_kind: Option<&'static str>,
}

const fn leaf(
    kind: FieldKind,
    default_value: DefaultValue,
    supports_placeholder: bool,
) -> FieldTypeDescriptor {
    FieldTypeDescriptor {
        kind,
        default_value,
        supports_placeholder,
        supports_label: true,
        requires_options: false,
        is_reorderable_container: false,
        container_sub_kind: None,
    }
}

const fn reorderable(kind: FieldKind, sub_kind: Option<&'static str>) -> FieldTypeDescriptor {
    FieldTypeDescriptor {
        kind,
        default_value: DefaultValue::EmptySequence,
        supports_placeholder: false,
        supports_label: true,
        requires_options: false,
        is_reorderable_container: true,
        container_sub_kind: sub_kind,
    }
}

// Indexed by `FieldKind as usize`.
static DESCRIPTORS: [FieldTypeDescriptor; 12] = [
    leaf(FieldKind::Text, DefaultValue::EmptyString, true),
    leaf(FieldKind::Textarea, DefaultValue::EmptyString, true),
    leaf(FieldKind::Number, DefaultValue::Zero, true),
    leaf(FieldKind::Checkbox, DefaultValue::False, false),
    leaf(FieldKind::Date, DefaultValue::EmptyString, true),
    FieldTypeDescriptor {
        requires_options: true,
        ..leaf(FieldKind::Select, DefaultValue::EmptyString, false)
    },
    leaf(FieldKind::Url, DefaultValue::EmptyString, true),
    leaf(FieldKind::Image, DefaultValue::EmptyString, false),
    leaf(FieldKind::List, DefaultValue::EmptySequence, true),
    reorderable(FieldKind::Array, None),
    reorderable(FieldKind::SectionsArray, Some("sections")),
    FieldTypeDescriptor {
        kind: FieldKind::Object,
        default_value: DefaultValue::EmptyMapping,
        supports_placeholder: false,
        supports_label: false,
        requires_options: false,
        is_reorderable_container: false,
        container_sub_kind: None,
    },
];

/// Descriptor of a known kind.
pub fn descriptor(kind: FieldKind) -> &'static FieldTypeDescriptor {
    &DESCRIPTORS[kind as usize]
}

/// Look up a descriptor by its kind string.
///
/// # Errors
///
/// Returns a `SCHEMA_ERROR` when `kind` names none of the registered kinds.
pub fn lookup(kind: &str) -> Result<&'static FieldTypeDescriptor> {
    kind.parse::<FieldKind>().map(descriptor)
}

/// The whole registry, in kind order.
pub fn descriptors() -> &'static [FieldTypeDescriptor] {
    &DESCRIPTORS
}
