//! Model Mapper: group endpoints into logical models, flatten the schemas
//! they use into attributes, and detect relationships.

pub mod names;
pub mod relationships;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::endpoints::EndpointRecord;
use crate::error::ModelError;
use crate::isr::{AdditionalProperties, SchemaGraph, SchemaId, SchemaKind, SchemaNode};
use crate::parse::operation::HttpMethod;

pub use relationships::{RelationshipOverride, RelationshipRecord, detect_relationships};

/// Model name used when neither a tag nor a static path segment is available.
pub const FALLBACK_MODEL_NAME: &str = "Resource";

/// CRUD role of an operation within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrudVerb {
    Index,
    Show,
    Store,
    Update,
    Destroy,
    Custom,
}

impl CrudVerb {
    pub fn classify(method: HttpMethod, has_path_parameter: bool) -> Self {
        match (method, has_path_parameter) {
            (HttpMethod::Get, false) => CrudVerb::Index,
            (HttpMethod::Get, true) => CrudVerb::Show,
            (HttpMethod::Post, false) => CrudVerb::Store,
            (HttpMethod::Put | HttpMethod::Patch, true) => CrudVerb::Update,
            (HttpMethod::Delete, true) => CrudVerb::Destroy,
            _ => CrudVerb::Custom,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CrudVerb::Index => "index",
            CrudVerb::Show => "show",
            CrudVerb::Store => "store",
            CrudVerb::Update => "update",
            CrudVerb::Destroy => "destroy",
            CrudVerb::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationBinding {
    pub operation_id: String,
    pub verb: CrudVerb,
    pub method: HttpMethod,
    pub path: String,
}

/// One model attribute, flattened from a referenced schema's properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRecord {
    pub name: String,
    pub schema: SchemaNode,
    pub required: bool,
    pub nullable: bool,
    pub read_only: bool,
    pub write_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl AttributeRecord {
    pub fn new(name: &str, schema: SchemaNode, required: bool) -> Self {
        Self {
            name: name.to_string(),
            required,
            nullable: schema.nullable,
            read_only: schema.read_only,
            write_only: schema.write_only,
            description: schema.description.clone(),
            default: schema.default.clone(),
            schema,
        }
    }
}

/// One logical model bound to a REST resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMapping {
    pub model_name: String,
    pub base_endpoint: String,
    pub operations: Vec<OperationBinding>,
    /// Registry keys of every schema the model's endpoints reference directly.
    pub schema_refs: IndexSet<String>,
    pub attributes: IndexMap<String, AttributeRecord>,
    pub relationships: Vec<RelationshipRecord>,
}

impl ModelMapping {
    fn new(model_name: String, base_endpoint: String) -> Self {
        Self {
            model_name,
            base_endpoint,
            operations: Vec::new(),
            schema_refs: IndexSet::new(),
            attributes: IndexMap::new(),
            relationships: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeRecord> {
        self.attributes.get(name)
    }

    pub fn operation(&self, verb: CrudVerb) -> Option<&OperationBinding> {
        self.operations.iter().find(|o| o.verb == verb)
    }

    pub fn relationship(&self, attribute: &str) -> Option<&RelationshipRecord> {
        let name = heck::ToLowerCamelCase::to_lower_camel_case(attribute);
        self.relationships.iter().find(|r| r.name() == name)
    }
}

/// Every model of a document, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ModelCatalog {
    models: IndexMap<String, ModelMapping>,
}

impl ModelCatalog {
    pub fn get(&self, name: &str) -> Option<&ModelMapping> {
        self.models.get(name)
    }

    /// Like [`get`](Self::get), failing with `InvalidModelMapping` for unknown names.
    pub fn require(&self, name: &str) -> Result<&ModelMapping, ModelError> {
        self.get(name)
            .ok_or_else(|| ModelError::InvalidModelMapping(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelMapping> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Mapper settings.
#[derive(Debug, Clone, Default)]
pub struct MapperOptions {
    /// Relationship overrides keyed `"Model.field"`.
    pub overrides: IndexMap<String, RelationshipOverride>,
}

/// Group endpoints into models and derive attributes and relationships.
pub fn map_models(
    endpoints: &[EndpointRecord],
    graph: &SchemaGraph,
    options: &MapperOptions,
) -> ModelCatalog {
    let mut models: IndexMap<String, ModelMapping> = IndexMap::new();

    for endpoint in endpoints {
        let name = model_name(endpoint);
        let mapping = models
            .entry(name.clone())
            .or_insert_with(|| ModelMapping::new(name, names::base_endpoint(&endpoint.path)));

        mapping.operations.push(OperationBinding {
            operation_id: endpoint.operation_id.clone(),
            verb: CrudVerb::classify(endpoint.method, endpoint.has_path_parameter()),
            method: endpoint.method,
            path: endpoint.path.clone(),
        });
        for schema in endpoint.schemas() {
            collect_schema_refs(schema, graph, &mut mapping.schema_refs);
        }
    }

    for mapping in models.values_mut() {
        mapping.attributes = merge_attributes(&mapping.schema_refs, graph);
        let attributes: Vec<&AttributeRecord> = mapping.attributes.values().collect();
        let model = mapping.model_name.clone();
        mapping.relationships = detect_relationships(&model, &attributes, graph, |field| {
            options.overrides.get(&format!("{model}.{field}")).cloned()
        });
        log::debug!(
            "model {}: {} operations, {} attributes, {} relationships",
            mapping.model_name,
            mapping.operations.len(),
            mapping.attributes.len(),
            mapping.relationships.len()
        );
    }

    ModelCatalog { models }
}

/// First tag, else first static path segment, singularized and StudlyCased.
pub fn model_name(endpoint: &EndpointRecord) -> String {
    if let Some(tag) = endpoint.tags.first() {
        return names::studly_singular(tag);
    }
    if let Some(segment) = names::static_segments(&endpoint.path).next() {
        return names::studly_singular(segment);
    }
    log::warn!(
        "{} {} has no tag and no static path segment, mapping it to {FALLBACK_MODEL_NAME}",
        endpoint.method,
        endpoint.path
    );
    FALLBACK_MODEL_NAME.to_string()
}

/// Collect the named schemas a node references, recursing through inline
/// structure but not into the referenced schemas.
pub fn collect_schema_refs(node: &SchemaNode, graph: &SchemaGraph, out: &mut IndexSet<String>) {
    match &node.kind {
        SchemaKind::Reference(r) => {
            out.insert(graph.entry(r.target).key.clone());
        }
        SchemaKind::Object(object) => {
            for prop in object.properties.values() {
                collect_schema_refs(prop, graph, out);
            }
            if let Some(AdditionalProperties::Schema(schema)) = &object.additional_properties {
                collect_schema_refs(schema, graph, out);
            }
        }
        SchemaKind::Array(array) => {
            if let Some(items) = &array.items {
                collect_schema_refs(items, graph, out);
            }
        }
        SchemaKind::Composite(composite) => {
            if let Some(base) = &composite.base {
                collect_schema_refs(base, graph, out);
            }
            for branch in composite
                .all_of
                .iter()
                .chain(&composite.any_of)
                .chain(&composite.one_of)
            {
                collect_schema_refs(branch, graph, out);
            }
            if let Some(not) = &composite.not {
                collect_schema_refs(not, graph, out);
            }
        }
        _ => {}
    }
}

/// Union of the referenced schemas' properties by name, first-seen order,
/// last write wins.
fn merge_attributes(
    schema_refs: &IndexSet<String>,
    graph: &SchemaGraph,
) -> IndexMap<String, AttributeRecord> {
    let mut attributes = IndexMap::new();
    for key in schema_refs {
        if let Some(id) = graph.lookup(key) {
            let mut visited = Vec::new();
            flatten_named(id, graph, &mut visited, &mut attributes);
        }
    }
    attributes
}

fn flatten_named(
    id: SchemaId,
    graph: &SchemaGraph,
    visited: &mut Vec<SchemaId>,
    out: &mut IndexMap<String, AttributeRecord>,
) {
    if visited.contains(&id) {
        return;
    }
    visited.push(id);
    flatten(graph.get(id), graph, visited, out);
}

fn flatten(
    node: &SchemaNode,
    graph: &SchemaGraph,
    visited: &mut Vec<SchemaId>,
    out: &mut IndexMap<String, AttributeRecord>,
) {
    match &node.kind {
        SchemaKind::Reference(r) => flatten_named(r.target, graph, visited, out),
        SchemaKind::Object(object) => {
            for (name, prop) in &object.properties {
                out.insert(
                    name.clone(),
                    AttributeRecord::new(name, prop.clone(), object.is_required(name)),
                );
            }
        }
        SchemaKind::Composite(composite) => {
            let members = composite.base.as_deref().into_iter().chain(&composite.all_of);
            for member in members.clone() {
                flatten(member, graph, visited, out);
            }
            // A name required by any member is required on the merged model.
            let mut required = IndexSet::new();
            for member in members {
                collect_required(member, graph, &mut required);
            }
            for name in &required {
                if let Some(attr) = out.get_mut(name) {
                    attr.required = true;
                }
            }
        }
        _ => {}
    }
}

fn collect_required(node: &SchemaNode, graph: &SchemaGraph, out: &mut IndexSet<String>) {
    if node.as_reference().is_some_and(|r| r.cyclic) {
        return;
    }
    match &graph.deref(node).kind {
        SchemaKind::Object(object) => out.extend(object.required.iter().cloned()),
        SchemaKind::Composite(composite) => {
            let members = composite.base.as_deref().into_iter().chain(&composite.all_of);
            for member in members {
                collect_required(member, graph, out);
            }
        }
        _ => {}
    }
}
