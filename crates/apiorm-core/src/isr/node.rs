use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use super::graph::SchemaId;

/// One normalized schema. Metadata shared by every kind lives here; the
/// kind-specific payload lives in [`SchemaKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub nullable: bool,
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
    pub read_only: bool,
    pub write_only: bool,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub extensions: IndexMap<String, serde_json::Value>,
}

impl SchemaNode {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            format: None,
            nullable: false,
            deprecated: false,
            title: None,
            description: None,
            default: None,
            example: None,
            read_only: false,
            write_only: false,
            extensions: IndexMap::new(),
        }
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    pub fn string() -> Self {
        Self::new(SchemaKind::String(StringSchema::default()))
    }

    pub fn integer() -> Self {
        Self::new(SchemaKind::Integer(NumericSchema::default()))
    }

    pub fn number() -> Self {
        Self::new(SchemaKind::Number(NumericSchema::default()))
    }

    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Short kind label: `string`, `integer`, ..., `reference`, `composite`, `any`.
    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn as_reference(&self) -> Option<&ReferenceSchema> {
        match &self.kind {
            SchemaKind::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            SchemaKind::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArraySchema> {
        match &self.kind {
            SchemaKind::Array(a) => Some(a),
            _ => None,
        }
    }
}

/// Kind-specific payload of a [`SchemaNode`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaKind {
    String(StringSchema),
    Integer(NumericSchema),
    Number(NumericSchema),
    Boolean,
    Array(ArraySchema),
    Object(ObjectSchema),
    Reference(ReferenceSchema),
    Composite(CompositeSchema),
    /// No type information at all (`{}` or `true`).
    Any,
}

impl SchemaKind {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::String(_) => "string",
            SchemaKind::Integer(_) => "integer",
            SchemaKind::Number(_) => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Array(_) => "array",
            SchemaKind::Object(_) => "object",
            SchemaKind::Reference(_) => "reference",
            SchemaKind::Composite(_) => "composite",
            SchemaKind::Any => "any",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StringSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NumericSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ArraySchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    pub unique_items: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObjectSchema {
    pub properties: IndexMap<String, SchemaNode>,
    pub required: IndexSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,
}

impl ObjectSchema {
    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

/// A materialized `$ref`. `target` always points at a slot in the
/// [`SchemaGraph`](super::SchemaGraph); `cyclic` marks a reference created
/// while its target was still being resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceSchema {
    pub pointer: String,
    pub name: String,
    pub target: SchemaId,
    pub cyclic: bool,
}

/// Composition keywords, kept side by side rather than merged.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CompositeSchema {
    /// Typed keywords written next to the composition keywords.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<Box<SchemaNode>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<SchemaNode>>,
}
