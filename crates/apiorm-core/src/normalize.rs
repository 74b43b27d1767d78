//! Schema Normalizer: turn a parsed Schema Object into a [`SchemaNode`].

use crate::error::ResolveError;
use crate::isr::{
    AdditionalProperties as IsrAdditional, ArraySchema, CompositeSchema, NumericSchema,
    ObjectSchema, ReferenceSchema, SchemaKind, SchemaNode, StringSchema,
};
use crate::parse::schema::{
    AdditionalProperties, ExclusiveBound, Schema, SchemaOrRef, SchemaType, TypeSet,
};

/// Turns a `$ref` pointer into a materialized reference. Implemented by the
/// resolver while the graph is being built and by the finished graph.
pub trait RefResolve {
    fn resolve_ref(&mut self, pointer: &str) -> Result<ReferenceSchema, ResolveError>;
}

/// Normalize a schema, reference or boolean schema.
pub fn normalize<R: RefResolve + ?Sized>(
    schema_or_ref: &SchemaOrRef,
    refs: &mut R,
) -> Result<SchemaNode, ResolveError> {
    match schema_or_ref {
        SchemaOrRef::Ref { ref_path } => {
            let reference = refs.resolve_ref(ref_path)?;
            Ok(SchemaNode::new(SchemaKind::Reference(reference)))
        }
        SchemaOrRef::Bool(true) => Ok(SchemaNode::any()),
        SchemaOrRef::Bool(false) => Ok(SchemaNode::new(SchemaKind::Composite(CompositeSchema {
            not: Some(Box::new(SchemaNode::any())),
            ..CompositeSchema::default()
        }))),
        SchemaOrRef::Schema(schema) => normalize_schema(schema, refs),
    }
}

/// Normalize an inline Schema Object.
pub fn normalize_schema<R: RefResolve + ?Sized>(
    schema: &Schema,
    refs: &mut R,
) -> Result<SchemaNode, ResolveError> {
    if schema.has_composition() {
        return normalize_composite(schema, refs);
    }

    let (primary, type_nullable) = match &schema.schema_type {
        Some(TypeSet::Single(t)) => (Some(*t), false),
        Some(TypeSet::Multiple(types)) => {
            let non_null: Vec<SchemaType> = types
                .iter()
                .copied()
                .filter(|t| *t != SchemaType::Null)
                .collect();
            let has_null = non_null.len() != types.len();
            match non_null.as_slice() {
                [] => (Some(SchemaType::Null), has_null),
                [single] => (Some(*single), has_null),
                _ => return normalize_type_union(schema, &non_null, has_null, refs),
            }
        }
        None => (infer_type(schema), false),
    };

    let kind = match primary {
        Some(SchemaType::String) => SchemaKind::String(string_payload(schema)),
        Some(SchemaType::Integer) => SchemaKind::Integer(numeric_payload(schema)),
        Some(SchemaType::Number) => SchemaKind::Number(numeric_payload(schema)),
        Some(SchemaType::Boolean) => SchemaKind::Boolean,
        Some(SchemaType::Array) => SchemaKind::Array(array_payload(schema, refs)?),
        Some(SchemaType::Object) => SchemaKind::Object(object_payload(schema, refs)?),
        Some(SchemaType::Null) | None => SchemaKind::Any,
    };

    let mut node = with_metadata(SchemaNode::new(kind), schema);
    node.nullable = node.nullable || type_nullable || primary == Some(SchemaType::Null);

    keep_unplaced_keywords(&mut node, schema);
    Ok(node)
}

/// An untyped schema takes its kind from the keywords it carries: object,
/// then array, then the `enum`/`const` sample, then string, then number.
fn infer_type(schema: &Schema) -> Option<SchemaType> {
    if schema.has_object_keywords() {
        return Some(SchemaType::Object);
    }
    if schema.has_array_keywords() {
        return Some(SchemaType::Array);
    }
    if let Some(sample) = schema.enum_values.first().or(schema.const_value.as_ref()) {
        match sample {
            serde_json::Value::String(_) => return Some(SchemaType::String),
            serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => {
                return Some(SchemaType::Integer);
            }
            serde_json::Value::Number(_) => return Some(SchemaType::Number),
            serde_json::Value::Bool(_) => return Some(SchemaType::Boolean),
            _ => {}
        }
    }
    if schema.has_string_keywords() {
        return Some(SchemaType::String);
    }
    if schema.has_numeric_keywords() {
        return Some(SchemaType::Number);
    }
    None
}

/// Keywords the chosen kind has no field for go into `extensions` verbatim.
fn keep_unplaced_keywords(node: &mut SchemaNode, schema: &Schema) {
    use serde_json::{Value, json};

    let (string, numeric, array, object) = match node.kind {
        SchemaKind::String(_) => (true, false, false, false),
        SchemaKind::Integer(_) | SchemaKind::Number(_) => (false, true, false, false),
        SchemaKind::Array(_) => (false, false, true, false),
        SchemaKind::Object(_) => (false, false, false, true),
        _ => (false, false, false, false),
    };
    let bound = |b: &ExclusiveBound| match b {
        ExclusiveBound::Flag(flag) => json!(flag),
        ExclusiveBound::Value(v) => json!(v),
    };
    let mut unplaced: Vec<(&str, Option<Value>)> = Vec::new();

    if !(string || numeric) {
        let values = (!schema.enum_values.is_empty()).then(|| json!(schema.enum_values));
        unplaced.push(("enum", values));
        unplaced.push(("const", schema.const_value.clone()));
    }
    if !string {
        unplaced.push(("minLength", schema.min_length.map(|v| json!(v))));
        unplaced.push(("maxLength", schema.max_length.map(|v| json!(v))));
        unplaced.push(("pattern", schema.pattern.clone().map(Value::String)));
    }
    if !numeric {
        unplaced.push(("minimum", schema.minimum.map(|v| json!(v))));
        unplaced.push(("maximum", schema.maximum.map(|v| json!(v))));
        unplaced.push(("exclusiveMinimum", schema.exclusive_minimum.as_ref().map(bound)));
        unplaced.push(("exclusiveMaximum", schema.exclusive_maximum.as_ref().map(bound)));
        unplaced.push(("multipleOf", schema.multiple_of.map(|v| json!(v))));
    }
    if !array {
        unplaced.push(("minItems", schema.min_items.map(|v| json!(v))));
        unplaced.push(("maxItems", schema.max_items.map(|v| json!(v))));
        unplaced.push(("uniqueItems", schema.unique_items.map(|v| json!(v))));
    }
    if !object {
        let required = (!schema.required.is_empty()).then(|| json!(schema.required));
        unplaced.push(("required", required));
        unplaced.push(("minProperties", schema.min_properties.map(|v| json!(v))));
        unplaced.push(("maxProperties", schema.max_properties.map(|v| json!(v))));
    }
    for (key, value) in unplaced {
        if let Some(value) = value {
            node.extensions.insert(key.to_string(), value);
        }
    }
}

fn with_metadata(mut node: SchemaNode, schema: &Schema) -> SchemaNode {
    node.format = schema.format.clone();
    node.nullable = schema.nullable.unwrap_or(false);
    node.deprecated = schema.deprecated.unwrap_or(false);
    node.title = schema.title.clone();
    node.description = schema.description.clone();
    node.default = schema.default_value.clone();
    node.example = schema.example.clone();
    node.read_only = schema.read_only.unwrap_or(false);
    node.write_only = schema.write_only.unwrap_or(false);
    node.extensions = schema.extensions.clone();
    node
}

fn enum_with_const(schema: &Schema) -> Vec<serde_json::Value> {
    let mut values = schema.enum_values.clone();
    if values.is_empty() {
        if let Some(c) = &schema.const_value {
            values.push(c.clone());
        }
    }
    values
}

fn string_payload(schema: &Schema) -> StringSchema {
    StringSchema {
        min_length: schema.min_length,
        max_length: schema.max_length,
        pattern: schema.pattern.clone(),
        enum_values: enum_with_const(schema),
    }
}

fn numeric_payload(schema: &Schema) -> NumericSchema {
    // 3.0 flags turn the inclusive bound exclusive; 3.1 carries the bound itself.
    let (minimum, exclusive_minimum) = match schema.exclusive_minimum {
        Some(ExclusiveBound::Flag(true)) => (None, schema.minimum),
        Some(ExclusiveBound::Value(v)) => (schema.minimum, Some(v)),
        _ => (schema.minimum, None),
    };
    let (maximum, exclusive_maximum) = match schema.exclusive_maximum {
        Some(ExclusiveBound::Flag(true)) => (None, schema.maximum),
        Some(ExclusiveBound::Value(v)) => (schema.maximum, Some(v)),
        _ => (schema.maximum, None),
    };
    NumericSchema {
        minimum,
        maximum,
        exclusive_minimum,
        exclusive_maximum,
        multiple_of: schema.multiple_of,
        enum_values: enum_with_const(schema),
    }
}

fn array_payload<R: RefResolve + ?Sized>(
    schema: &Schema,
    refs: &mut R,
) -> Result<ArraySchema, ResolveError> {
    let items = match &schema.items {
        Some(items) => Some(Box::new(normalize(items, refs)?)),
        None => None,
    };
    Ok(ArraySchema {
        items,
        min_items: schema.min_items,
        max_items: schema.max_items,
        unique_items: schema.unique_items.unwrap_or(false),
    })
}

fn object_payload<R: RefResolve + ?Sized>(
    schema: &Schema,
    refs: &mut R,
) -> Result<ObjectSchema, ResolveError> {
    let mut object = ObjectSchema {
        required: schema.required.iter().cloned().collect(),
        min_properties: schema.min_properties,
        max_properties: schema.max_properties,
        ..ObjectSchema::default()
    };
    for (name, prop) in &schema.properties {
        object
            .properties
            .insert(name.clone(), normalize(prop, refs)?);
    }
    object.additional_properties = match &schema.additional_properties {
        Some(AdditionalProperties::Bool(b)) => Some(IsrAdditional::Allowed(*b)),
        Some(AdditionalProperties::Schema(s)) => {
            Some(IsrAdditional::Schema(Box::new(normalize(s, refs)?)))
        }
        None => None,
    };
    Ok(object)
}

fn normalize_all<R: RefResolve + ?Sized>(
    list: &[SchemaOrRef],
    refs: &mut R,
) -> Result<Vec<SchemaNode>, ResolveError> {
    list.iter().map(|s| normalize(s, refs)).collect()
}

fn normalize_composite<R: RefResolve + ?Sized>(
    schema: &Schema,
    refs: &mut R,
) -> Result<SchemaNode, ResolveError> {
    let rest = schema.without_composition();
    let base = if rest.has_type_keywords() {
        let mut base = normalize_schema(&rest, refs)?;
        // Metadata belongs to the composite node, not to its base.
        base.description = None;
        base.title = None;
        base.extensions
            .retain(|key, _| !schema.extensions.contains_key(key));
        Some(Box::new(base))
    } else {
        None
    };

    let composite = CompositeSchema {
        base,
        all_of: normalize_all(&schema.all_of, refs)?,
        any_of: normalize_all(&schema.any_of, refs)?,
        one_of: normalize_all(&schema.one_of, refs)?,
        not: match &schema.not {
            Some(n) => Some(Box::new(normalize(n, refs)?)),
            None => None,
        },
    };
    Ok(with_metadata(
        SchemaNode::new(SchemaKind::Composite(composite)),
        schema,
    ))
}

/// `type: [string, integer]` becomes an `anyOf` of single-typed branches.
fn normalize_type_union<R: RefResolve + ?Sized>(
    schema: &Schema,
    types: &[SchemaType],
    nullable: bool,
    refs: &mut R,
) -> Result<SchemaNode, ResolveError> {
    let mut branches = Vec::with_capacity(types.len());
    for t in types {
        let single = Schema {
            schema_type: Some(TypeSet::Single(*t)),
            title: None,
            description: None,
            extensions: Default::default(),
            ..schema.clone()
        };
        branches.push(normalize_schema(&single, refs)?);
    }
    let mut node = with_metadata(
        SchemaNode::new(SchemaKind::Composite(CompositeSchema {
            any_of: branches,
            ..CompositeSchema::default()
        })),
        schema,
    );
    node.nullable = node.nullable || nullable;
    Ok(node)
}
