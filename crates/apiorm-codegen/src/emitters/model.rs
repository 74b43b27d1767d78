use apiorm_core::config::GeneratorConfig;
use apiorm_core::isr::SchemaGraph;
use apiorm_core::mapping::{ModelMapping, RelationshipRecord};
use apiorm_core::rules::model_rules;
use heck::ToLowerCamelCase;
use minijinja::context;

use super::{MODEL_TEMPLATE, environment};
use crate::error::GenerateError;
use crate::naming::{class_name, split_base_class};
use crate::type_mapper::{attribute_type, php_cast};

/// Render the model class for one mapping.
pub fn emit_model(
    mapping: &ModelMapping,
    graph: &SchemaGraph,
    config: &GeneratorConfig,
    base_url: Option<&str>,
) -> Result<String, GenerateError> {
    let env = environment()?;
    let tmpl = env.get_template(MODEL_TEMPLATE)?;
    let (base_import, base_class) = split_base_class(&config.base_class);

    let attributes: Vec<minijinja::Value> = mapping
        .attributes
        .values()
        .map(|attr| {
            context! {
                name => attr.name.clone(),
                type => attribute_type(attr, graph),
            }
        })
        .collect();

    let fillable: Vec<&str> = mapping
        .attributes
        .values()
        .filter(|attr| !attr.read_only)
        .map(|attr| attr.name.as_str())
        .collect();

    let hidden: Vec<&str> = mapping
        .attributes
        .values()
        .filter(|attr| attr.write_only)
        .map(|attr| attr.name.as_str())
        .collect();

    let casts: Vec<minijinja::Value> = mapping
        .attributes
        .values()
        .filter_map(|attr| {
            php_cast(&attr.schema, graph).map(|cast| {
                context! {
                    name => attr.name.clone(),
                    cast => cast,
                }
            })
        })
        .collect();

    let operations: Vec<minijinja::Value> = mapping
        .operations
        .iter()
        .map(|op| {
            context! {
                id => op.operation_id.clone(),
                verb => op.verb.as_str(),
                method => op.method.as_str(),
                path => op.path.clone(),
            }
        })
        .collect();

    let rules: Vec<minijinja::Value> = model_rules(mapping, graph)
        .iter()
        .map(|(field, tokens)| {
            context! {
                field => field,
                tokens => tokens,
            }
        })
        .collect();

    let relationships: Vec<minijinja::Value> = mapping
        .relationships
        .iter()
        .map(|rel| relationship_to_ctx(rel, mapping, config))
        .collect();

    let source = tmpl.render(context! {
        php_namespace => config.namespace.clone(),
        base_import => base_import,
        base_class => base_class,
        class_name => class_name(&mapping.model_name, config),
        model_name => mapping.model_name.clone(),
        base_endpoint => mapping.base_endpoint.clone(),
        base_url => base_url,
        attributes => attributes,
        fillable => fillable,
        hidden => hidden,
        casts => casts,
        operations => operations,
        rules => rules,
        relationships => relationships,
    })?;
    Ok(source)
}

fn relationship_to_ctx(
    rel: &RelationshipRecord,
    mapping: &ModelMapping,
    config: &GeneratorConfig,
) -> minijinja::Value {
    match rel {
        RelationshipRecord::BelongsTo {
            name,
            related_model,
            foreign_key,
            local_key,
        }
        | RelationshipRecord::HasMany {
            name,
            related_model,
            foreign_key,
            local_key,
        } => context! {
            kind => rel.kind_name(),
            name => name.clone(),
            related => class_name(related_model, config),
            foreign_key => foreign_key.clone(),
            local_key => local_key.clone(),
        },
        RelationshipRecord::Embedded { name, .. } => {
            // Accessor names are camelCased; the stored attribute keeps its own spelling.
            let attribute = mapping
                .attributes
                .keys()
                .find(|key| key.to_lower_camel_case() == *name)
                .cloned()
                .unwrap_or_else(|| name.clone());
            context! {
                kind => rel.kind_name(),
                name => name.clone(),
                attribute => attribute,
            }
        }
    }
}
