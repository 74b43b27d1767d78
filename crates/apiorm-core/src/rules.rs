//! Validation Rule Generator: JSON-Schema constraints → ordered rule tokens.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::isr::{
    ArraySchema, CompositeSchema, NumericSchema, SchemaGraph, SchemaKind, SchemaNode,
};
use crate::mapping::ModelMapping;

/// Ordered `field → rule tokens`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationRuleSet {
    fields: IndexMap<String, Vec<String>>,
}

impl ValidationRuleSet {
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append tokens to a field, skipping ones it already has.
    pub fn extend_field(&mut self, field: &str, tokens: Vec<String>) {
        let existing = self.fields.entry(field.to_string()).or_default();
        for token in tokens {
            if !existing.contains(&token) {
                existing.push(token);
            }
        }
    }
}

/// Rule tokens for one field: presence marker, type, then constraints.
pub fn field_rules(node: &SchemaNode, required: bool, graph: &SchemaGraph) -> Vec<String> {
    merged_field_rules(&[node], required, graph)
}

/// One field declared by several `allOf` members. Presence is decided once
/// for all of them; the type and constraint tokens are concatenated.
fn merged_field_rules(nodes: &[&SchemaNode], required: bool, graph: &SchemaGraph) -> Vec<String> {
    let nullable = nodes
        .iter()
        .any(|node| node.nullable || graph.deref(node).nullable);
    let mut rules = Vec::new();
    if required {
        rules.push("required".to_string());
        if nullable {
            rules.push("nullable".to_string());
        }
    } else {
        rules.push("nullable".to_string());
    }
    for node in nodes {
        constraint_tokens(graph.deref(node), graph, &mut rules);
    }
    dedup(rules)
}

/// Rules for a whole schema: one entry per property of an object or `allOf`
/// chain, `*` for a root array.
pub fn generate_rules(node: &SchemaNode, graph: &SchemaGraph) -> ValidationRuleSet {
    let mut set = ValidationRuleSet::default();
    let target = graph.deref(node);
    if let SchemaKind::Array(array) = &target.kind {
        if let Some(tokens) = item_rules(array, graph) {
            set.extend_field("*", tokens);
        }
        return set;
    }

    let mut flat = FlatObject::default();
    flat.collect(target, graph);
    for (name, nodes) in &flat.properties {
        let required = flat.required.contains(name);
        set.extend_field(name, merged_field_rules(nodes, required, graph));
        for node in nodes {
            add_item_rules(&mut set, name, node, graph);
        }
    }
    set
}

/// Properties and required names gathered across an object and the members
/// of its composition (`allOf`, the first `anyOf`/`oneOf` branch).
#[derive(Default)]
struct FlatObject<'g> {
    properties: IndexMap<String, Vec<&'g SchemaNode>>,
    required: IndexSet<String>,
}

impl<'g> FlatObject<'g> {
    fn collect(&mut self, node: &'g SchemaNode, graph: &'g SchemaGraph) {
        match &graph.deref(node).kind {
            SchemaKind::Object(object) => {
                for (name, prop) in &object.properties {
                    self.properties.entry(name.clone()).or_default().push(prop);
                }
                self.required.extend(object.required.iter().cloned());
            }
            SchemaKind::Composite(composite) => {
                for branch in rule_branches(composite).filter(|b| !is_cyclic(b)) {
                    self.collect(branch, graph);
                }
            }
            _ => {}
        }
    }
}

/// anyOf and oneOf contribute their first branch only.
fn rule_branches(composite: &CompositeSchema) -> impl Iterator<Item = &SchemaNode> {
    composite
        .base
        .as_deref()
        .into_iter()
        .chain(&composite.all_of)
        .chain(composite.any_of.first())
        .chain(composite.one_of.first())
}

/// Rules over a model's merged attributes.
pub fn model_rules(mapping: &ModelMapping, graph: &SchemaGraph) -> ValidationRuleSet {
    let mut set = ValidationRuleSet::default();
    for attr in mapping.attributes.values() {
        set.extend_field(&attr.name, field_rules(&attr.schema, attr.required, graph));
        add_item_rules(&mut set, &attr.name, &attr.schema, graph);
    }
    set
}

fn add_item_rules(set: &mut ValidationRuleSet, field: &str, node: &SchemaNode, graph: &SchemaGraph) {
    if let SchemaKind::Array(array) = &graph.deref(node).kind {
        if let Some(tokens) = item_rules(array, graph) {
            set.extend_field(&format!("{field}.*"), tokens);
        }
    }
}

fn item_rules(array: &ArraySchema, graph: &SchemaGraph) -> Option<Vec<String>> {
    let items = array.items.as_deref()?;
    let target = graph.deref(items);
    let mut rules = Vec::new();
    if items.nullable || target.nullable {
        rules.push("nullable".to_string());
    }
    constraint_tokens(target, graph, &mut rules);
    if array.unique_items {
        rules.push("distinct".to_string());
    }
    let rules = dedup(rules);
    (!rules.is_empty()).then_some(rules)
}

fn constraint_tokens(node: &SchemaNode, graph: &SchemaGraph, out: &mut Vec<String>) {
    match &node.kind {
        SchemaKind::String(s) => {
            out.push("string".to_string());
            push_bound(out, "min", s.min_length.map(|v| v.to_string()));
            push_bound(out, "max", s.max_length.map(|v| v.to_string()));
            if let Some(pattern) = &s.pattern {
                out.push(format!("regex:/{pattern}/"));
            }
            push_enum(out, &s.enum_values);
        }
        SchemaKind::Integer(n) => {
            out.push("integer".to_string());
            numeric_tokens(n, out);
        }
        SchemaKind::Number(n) => {
            out.push("numeric".to_string());
            numeric_tokens(n, out);
        }
        SchemaKind::Boolean => out.push("boolean".to_string()),
        SchemaKind::Array(a) => {
            out.push("array".to_string());
            push_bound(out, "min", a.min_items.map(|v| v.to_string()));
            push_bound(out, "max", a.max_items.map(|v| v.to_string()));
        }
        SchemaKind::Object(o) => {
            out.push("array".to_string());
            push_bound(out, "min", o.min_properties.map(|v| v.to_string()));
            push_bound(out, "max", o.max_properties.map(|v| v.to_string()));
        }
        SchemaKind::Composite(c) => {
            for branch in rule_branches(c).filter(|b| !is_cyclic(b)) {
                constraint_tokens(graph.deref(branch), graph, out);
            }
        }
        // A reference still standing after deref is an alias loop.
        SchemaKind::Reference(_) | SchemaKind::Any => {}
    }
    if let Some(token) = node.format.as_deref().and_then(format_token) {
        out.push(token.to_string());
    }
}

fn numeric_tokens(n: &NumericSchema, out: &mut Vec<String>) {
    push_bound(out, "min", n.minimum.map(format_number));
    push_bound(out, "max", n.maximum.map(format_number));
    push_bound(out, "gt", n.exclusive_minimum.map(format_number));
    push_bound(out, "lt", n.exclusive_maximum.map(format_number));
    push_bound(out, "multiple_of", n.multiple_of.map(format_number));
    push_enum(out, &n.enum_values);
}

/// Composition branches that close a reference cycle are not followed.
fn is_cyclic(node: &SchemaNode) -> bool {
    node.as_reference().is_some_and(|r| r.cyclic)
}

fn push_bound(out: &mut Vec<String>, rule: &str, value: Option<String>) {
    if let Some(value) = value {
        out.push(format!("{rule}:{value}"));
    }
}

fn push_enum(out: &mut Vec<String>, values: &[serde_json::Value]) {
    if values.is_empty() {
        return;
    }
    let joined: Vec<String> = values
        .iter()
        .map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(format_number)
                .unwrap_or_else(|| n.to_string()),
            other => other.to_string(),
        })
        .collect();
    out.push(format!("in:{}", joined.join(",")));
}

fn format_token(format: &str) -> Option<&'static str> {
    match format {
        "email" => Some("email"),
        "uri" | "url" => Some("url"),
        "date" | "date-time" => Some("date"),
        "uuid" => Some("uuid"),
        "ipv4" => Some("ipv4"),
        "ipv6" => Some("ipv6"),
        _ => None,
    }
}

/// `3.0` → `3`, `0.5` → `0.5`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn dedup(tokens: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if !out.contains(&token) {
            out.push(token);
        }
    }
    out
}
