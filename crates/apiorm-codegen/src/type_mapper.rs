use apiorm_core::isr::{SchemaGraph, SchemaKind, SchemaNode};
use apiorm_core::mapping::AttributeRecord;

/// The node that decides a schema's PHP type: references are followed, and a
/// composite stands for its first typed `base`/`allOf` branch.
pub fn typed<'a>(node: &'a SchemaNode, graph: &'a SchemaGraph) -> &'a SchemaNode {
    let target = graph.deref(node);
    match &target.kind {
        SchemaKind::Composite(composite) => composite
            .base
            .as_deref()
            .into_iter()
            .chain(&composite.all_of)
            .filter(|branch| !branch.as_reference().is_some_and(|r| r.cyclic))
            .map(|branch| typed(branch, graph))
            .find(|branch| !matches!(branch.kind, SchemaKind::Any | SchemaKind::Composite(_)))
            .unwrap_or(target),
        _ => target,
    }
}

fn is_date(node: &SchemaNode) -> bool {
    matches!(node.format.as_deref(), Some("date" | "date-time"))
}

/// Map a schema to its PHP type name.
pub fn php_type(node: &SchemaNode, graph: &SchemaGraph) -> &'static str {
    let target = typed(node, graph);
    match &target.kind {
        SchemaKind::Integer(_) => "int",
        SchemaKind::Number(_) => "float",
        SchemaKind::Boolean => "bool",
        SchemaKind::Array(_) | SchemaKind::Object(_) => "array",
        SchemaKind::String(_) if is_date(target) => "\\DateTimeInterface",
        SchemaKind::String(_) => "string",
        SchemaKind::Reference(_) | SchemaKind::Composite(_) | SchemaKind::Any => "mixed",
    }
}

/// PHP type of an attribute, `?`-qualified when it may be absent or null.
pub fn attribute_type(attr: &AttributeRecord, graph: &SchemaGraph) -> String {
    let base = php_type(&attr.schema, graph);
    if base == "mixed" || (attr.required && !attr.nullable) {
        base.to_string()
    } else {
        format!("?{base}")
    }
}

/// Attribute cast for the model's `$casts` table. Plain strings need none.
pub fn php_cast(node: &SchemaNode, graph: &SchemaGraph) -> Option<&'static str> {
    let target = typed(node, graph);
    match &target.kind {
        SchemaKind::Integer(_) => Some("integer"),
        SchemaKind::Number(_) => Some("float"),
        SchemaKind::Boolean => Some("boolean"),
        SchemaKind::Array(_) | SchemaKind::Object(_) => Some("array"),
        SchemaKind::String(_) => match target.format.as_deref() {
            Some("date") => Some("date"),
            Some("date-time") => Some("datetime"),
            _ => None,
        },
        _ => None,
    }
}
