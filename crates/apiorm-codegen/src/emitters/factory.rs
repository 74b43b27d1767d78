use apiorm_core::config::GeneratorConfig;
use apiorm_core::isr::{NumericSchema, SchemaGraph, SchemaKind, StringSchema};
use apiorm_core::mapping::{AttributeRecord, ModelMapping};
use minijinja::context;

use super::{FACTORY_TEMPLATE, environment, php_literal};
use crate::error::GenerateError;
use crate::naming::{class_name, factory_class};
use crate::type_mapper::typed;

/// Render the factory class for one mapping. Read-only attributes are left out.
pub fn emit_factory(
    mapping: &ModelMapping,
    graph: &SchemaGraph,
    config: &GeneratorConfig,
) -> Result<String, GenerateError> {
    let env = environment()?;
    let tmpl = env.get_template(FACTORY_TEMPLATE)?;
    let class = class_name(&mapping.model_name, config);

    let fields: Vec<minijinja::Value> = mapping
        .attributes
        .values()
        .filter(|attr| !attr.read_only)
        .map(|attr| {
            context! {
                name => attr.name.clone(),
                value => sample_value(attr, graph),
            }
        })
        .collect();

    let source = tmpl.render(context! {
        php_namespace => config.namespace.clone(),
        class_name => class.clone(),
        factory_class => factory_class(&class),
        fields => fields,
    })?;
    Ok(source)
}

/// A deterministic PHP literal that satisfies the attribute's schema.
pub fn sample_value(attr: &AttributeRecord, graph: &SchemaGraph) -> String {
    if let Some(default) = &attr.default {
        return php_literal(default);
    }
    let target = typed(&attr.schema, graph);
    if let Some(value) = target.default.as_ref().or(target.example.as_ref()) {
        return php_literal(value);
    }
    match &target.kind {
        SchemaKind::String(s) => sample_string(s, target.format.as_deref()),
        SchemaKind::Integer(n) => match n.enum_values.first() {
            Some(value) => php_literal(value),
            None => sample_integer(n).to_string(),
        },
        SchemaKind::Number(n) => match n.enum_values.first() {
            Some(value) => php_literal(value),
            None => format!("{:?}", sample_number(n)),
        },
        SchemaKind::Boolean => "false".to_string(),
        SchemaKind::Array(_) | SchemaKind::Object(_) => "[]".to_string(),
        SchemaKind::Reference(_) | SchemaKind::Composite(_) | SchemaKind::Any => {
            "null".to_string()
        }
    }
}

fn sample_string(s: &StringSchema, format: Option<&str>) -> String {
    if let Some(value) = s.enum_values.first() {
        return php_literal(value);
    }
    let fixed = match format {
        Some("email") => Some("user@example.com"),
        Some("uuid") => Some("00000000-0000-4000-8000-000000000000"),
        Some("date") => Some("2024-01-01"),
        Some("date-time") => Some("2024-01-01T00:00:00+00:00"),
        Some("uri" | "url") => Some("https://example.com"),
        Some("ipv4") => Some("127.0.0.1"),
        Some("ipv6") => Some("::1"),
        _ => None,
    };
    if let Some(value) = fixed {
        return format!("'{value}'");
    }

    const PLACEHOLDER: &str = "string";
    // Longer minimums are clamped; the factory line stays small.
    const MAX_PLACEHOLDER: u64 = 255;
    let mut len = PLACEHOLDER.len() as u64;
    if let Some(min) = s.min_length {
        len = len.max(min);
    }
    if let Some(max) = s.max_length {
        len = len.min(max);
    }
    let len = len.min(MAX_PLACEHOLDER);
    if len == PLACEHOLDER.len() as u64 {
        format!("'{PLACEHOLDER}'")
    } else {
        format!("'{}'", "x".repeat(len as usize))
    }
}

fn sample_integer(n: &NumericSchema) -> i64 {
    let lower = n
        .minimum
        .map(|m| m.ceil() as i64)
        .or(n.exclusive_minimum.map(|m| m.floor() as i64 + 1));
    let upper = n
        .maximum
        .map(|m| m.floor() as i64)
        .or(n.exclusive_maximum.map(|m| m.ceil() as i64 - 1));
    match (lower, upper) {
        (Some(lower), _) => lower,
        (None, Some(upper)) if upper < 1 => upper,
        _ => 1,
    }
}

fn sample_number(n: &NumericSchema) -> f64 {
    if let Some(min) = n.minimum {
        return min;
    }
    if let Some(min) = n.exclusive_minimum {
        return match n.multiple_of {
            Some(step) if step > 0.0 => (min / step).floor() * step + step,
            _ => min + 1.0,
        };
    }
    match n.maximum.or(n.exclusive_maximum) {
        Some(max) if max < 1.0 => max - 1.0,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiorm_core::isr::SchemaNode;
    use serde_json::json;

    fn sample(node: SchemaNode) -> String {
        sample_value(&AttributeRecord::new("field", node, true), &SchemaGraph::default())
    }

    #[test]
    fn test_defaults_and_examples_win() {
        let mut node = SchemaNode::integer();
        node.example = Some(json!(7));
        assert_eq!(sample(node.clone()), "7");
        node.default = Some(json!(3));
        assert_eq!(sample(node), "3");
    }

    #[test]
    fn test_strings() {
        assert_eq!(sample(SchemaNode::string()), "'string'");
        assert_eq!(
            sample(SchemaNode::string().with_format("email")),
            "'user@example.com'"
        );

        let mut short = SchemaNode::string();
        if let SchemaKind::String(s) = &mut short.kind {
            s.max_length = Some(3);
        }
        assert_eq!(sample(short), "'xxx'");

        let mut huge = SchemaNode::string();
        if let SchemaKind::String(s) = &mut huge.kind {
            s.min_length = Some(1 << 40);
        }
        assert_eq!(sample(huge), format!("'{}'", "x".repeat(255)));

        let mut status = SchemaNode::string();
        if let SchemaKind::String(s) = &mut status.kind {
            s.enum_values = vec![json!("available"), json!("sold")];
        }
        assert_eq!(sample(status), "'available'");
    }

    #[test]
    fn test_numbers_respect_bounds() {
        let mut age = SchemaNode::integer();
        if let SchemaKind::Integer(n) = &mut age.kind {
            n.minimum = Some(18.0);
        }
        assert_eq!(sample(age), "18");

        let mut pages = SchemaNode::integer();
        if let SchemaKind::Integer(n) = &mut pages.kind {
            n.exclusive_minimum = Some(0.0);
        }
        assert_eq!(sample(pages), "1");

        let mut rating = SchemaNode::number();
        if let SchemaKind::Number(n) = &mut rating.kind {
            n.minimum = Some(0.0);
            n.maximum = Some(5.0);
        }
        assert_eq!(sample(rating), "0.0");

        assert_eq!(sample(SchemaNode::number()), "1.0");
        assert_eq!(sample(SchemaNode::boolean()), "false");
        assert_eq!(sample(SchemaNode::any()), "null");
    }
}
