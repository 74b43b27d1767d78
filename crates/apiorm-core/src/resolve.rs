//! Reference Resolver: register every named schema, resolve `$ref` pointers
//! into a [`SchemaGraph`], and inline component parameters, request bodies
//! and responses into the operations that use them.

use indexmap::IndexMap;

use crate::error::{ParseError, PipelineError, ResolveError};
use crate::isr::{NamedSchema, ReferenceSchema, SchemaGraph, SchemaId, SchemaNode};
use crate::load::{DocumentLoader, Source};
use crate::normalize::{RefResolve, normalize};
use crate::parse::components::Components;
use crate::parse::content::Content;
use crate::parse::operation::{HttpMethod, Operation};
use crate::parse::parameter::ParameterOrRef;
use crate::parse::reference::RefOr;
use crate::parse::schema::{AdditionalProperties, SchemaOrRef};
use crate::parse::spec::OpenApiSpec;

const SCHEMA_PREFIX: &str = "/components/schemas/";

/// Component `$ref` chains longer than this are treated as unresolvable.
const MAX_COMPONENT_HOPS: usize = 16;

/// Resolver settings.
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    /// Follow `$ref`s into other documents through the loader.
    pub external_refs: bool,
    /// Where the root document came from; external refs are relative to it.
    pub source: Option<Source>,
    pub loader: DocumentLoader,
}

/// A parsed document whose references are all resolved.
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    /// The document with component parameters, request bodies and responses inlined.
    pub spec: OpenApiSpec,
    pub graph: SchemaGraph,
}

struct DocumentScope {
    key: String,
    source: Option<Source>,
    components: Components,
}

struct Slot {
    name: String,
    key: String,
    scope: usize,
    node: Option<SchemaNode>,
}

/// Resolves one document. State is local to a single [`resolve`](Self::resolve) call.
pub struct ReferenceResolver {
    options: ResolverOptions,
    scopes: Vec<DocumentScope>,
    slots: Vec<Slot>,
    index: IndexMap<String, SchemaId>,
    pointers: IndexMap<String, SchemaId>,
    stack: Vec<SchemaId>,
    scope_stack: Vec<usize>,
}

impl ReferenceResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self {
            options,
            scopes: Vec::new(),
            slots: Vec::new(),
            index: IndexMap::new(),
            pointers: IndexMap::new(),
            stack: Vec::new(),
            scope_stack: Vec::new(),
        }
    }

    /// Resolve a parsed document.
    pub fn resolve(mut self, spec: &OpenApiSpec) -> Result<ResolvedDocument, ResolveError> {
        let components = spec.components.clone().unwrap_or_default();
        self.scopes.push(DocumentScope {
            key: String::new(),
            source: self.options.source.clone(),
            components,
        });

        // Pass 1: a stub slot for every local schema so forward references find a target.
        let names: Vec<String> = self.scopes[0].components.schemas.keys().cloned().collect();
        for name in &names {
            let id = self.allocate(0, name);
            self.pointers
                .insert(format!("#{SCHEMA_PREFIX}{}", escape_pointer(name)), id);
        }

        // Pass 2: fill bodies in document order.
        for name in &names {
            if let Some(id) = self.index.get(name.as_str()).copied() {
                if self.slots[id.0].node.is_none() {
                    self.fill(id)?;
                }
            }
        }

        let mut resolved = spec.clone();
        for item in resolved.paths.values_mut() {
            item.parameters = self.inline_parameters(&item.parameters)?;
            for method in HttpMethod::ORDER {
                if let Some(op) = item.operation_mut(method) {
                    self.inline_operation(op)?;
                }
            }
        }

        let graph = self.finish()?;
        log::debug!("resolved {} named schemas", graph.len());
        Ok(ResolvedDocument {
            spec: resolved,
            graph,
        })
    }

    fn finish(self) -> Result<SchemaGraph, ResolveError> {
        let mut schemas = Vec::with_capacity(self.slots.len());
        for slot in self.slots {
            let node = slot
                .node
                .ok_or_else(|| ResolveError::UnresolvableReference(slot.key.clone()))?;
            schemas.push(NamedSchema {
                name: slot.name,
                key: slot.key,
                node,
            });
        }
        let mut graph = SchemaGraph::from_parts(schemas);
        graph.set_pointers(self.pointers);
        Ok(graph)
    }

    fn allocate(&mut self, scope: usize, name: &str) -> SchemaId {
        let key = scope_key(&self.scopes[scope].key, name);
        if let Some(id) = self.index.get(&key) {
            return *id;
        }
        let id = SchemaId(self.slots.len());
        self.slots.push(Slot {
            name: name.to_string(),
            key: key.clone(),
            scope,
            node: None,
        });
        self.index.insert(key, id);
        id
    }

    fn fill(&mut self, id: SchemaId) -> Result<(), ResolveError> {
        let (scope, name) = {
            let slot = &self.slots[id.0];
            (slot.scope, slot.name.clone())
        };
        let raw = self.scopes[scope]
            .components
            .schemas
            .get(&name)
            .cloned()
            .ok_or_else(|| ResolveError::UnresolvableReference(name.clone()))?;

        self.stack.push(id);
        self.scope_stack.push(scope);
        let result = normalize(&raw, self);
        self.stack.pop();
        self.scope_stack.pop();

        self.slots[id.0].node = Some(result?);
        Ok(())
    }

    fn current_scope(&self) -> usize {
        self.scope_stack.last().copied().unwrap_or(0)
    }

    fn external_scope(
        &mut self,
        from: usize,
        document: &str,
        pointer: &str,
    ) -> Result<usize, ResolveError> {
        let target = match &self.scopes[from].source {
            Some(base) => base.join(document),
            None => Source::parse(document),
        };
        let key = target.to_string();
        if let Some(i) = self.scopes.iter().position(|s| s.key == key) {
            return Ok(i);
        }

        let external = |cause: PipelineError| ResolveError::External {
            pointer: pointer.to_string(),
            cause: Box::new(cause),
        };
        let raw = self
            .options
            .loader
            .load(&target)
            .map_err(|e| external(e.into()))?;
        let components: Components = match raw.value.get("components") {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| external(ParseError::InvalidStructure(e).into()))?,
            None => Components::default(),
        };
        log::info!("loaded external schema document {key}");

        self.scopes.push(DocumentScope {
            key,
            source: Some(target),
            components,
        });
        Ok(self.scopes.len() - 1)
    }

    /// Make sure every schema reference under `schema` has a filled slot.
    fn register_refs(&mut self, schema: &SchemaOrRef) -> Result<(), ResolveError> {
        let mut pointers = Vec::new();
        collect_pointers(schema, &mut pointers);
        for pointer in pointers {
            self.resolve_ref(&pointer)?;
        }
        Ok(())
    }

    fn inline_operation(&mut self, op: &mut Operation) -> Result<(), ResolveError> {
        op.parameters = self.inline_parameters(&op.parameters)?;

        if let Some(body) = op.request_body.take() {
            let body = self.inline(body, "requestBodies", |c| &c.request_bodies)?;
            self.register_content(&body.content)?;
            op.request_body = Some(RefOr::Item(body));
        }

        let mut responses = IndexMap::new();
        for (status, resp) in std::mem::take(&mut op.responses) {
            let resp = self.inline(resp, "responses", |c| &c.responses)?;
            self.register_content(&resp.content)?;
            responses.insert(status, RefOr::Item(resp));
        }
        op.responses = responses;
        Ok(())
    }

    fn inline_parameters(
        &mut self,
        params: &[ParameterOrRef],
    ) -> Result<Vec<ParameterOrRef>, ResolveError> {
        let mut out = Vec::with_capacity(params.len());
        for p in params {
            let param = self.inline(p.clone(), "parameters", |c| &c.parameters)?;
            if let Some(schema) = &param.schema {
                self.register_refs(schema)?;
            }
            out.push(RefOr::Item(param));
        }
        Ok(out)
    }

    fn register_content(&mut self, content: &Content) -> Result<(), ResolveError> {
        for media in content.values() {
            if let Some(schema) = &media.schema {
                self.register_refs(schema)?;
            }
        }
        Ok(())
    }

    /// Replace a component `$ref` with a copy of its target.
    fn inline<T: Clone>(
        &self,
        value: RefOr<T>,
        section: &str,
        table: impl Fn(&Components) -> &IndexMap<String, RefOr<T>>,
    ) -> Result<T, ResolveError> {
        match value {
            RefOr::Item(item) => Ok(item),
            RefOr::Ref { ref_path } => self.lookup_component(&ref_path, section, table),
        }
    }

    /// Follow a root-document component pointer (`#/components/{section}/Name`),
    /// including component-to-component chains.
    fn lookup_component<T: Clone>(
        &self,
        pointer: &str,
        section: &str,
        table: impl Fn(&Components) -> &IndexMap<String, RefOr<T>>,
    ) -> Result<T, ResolveError> {
        let prefix = format!("/components/{section}/");
        let mut current = pointer.to_string();
        for _ in 0..MAX_COMPONENT_HOPS {
            let (document, fragment) = split_pointer(&current);
            if !document.is_empty() {
                return Err(ResolveError::ExternalReferenceUnsupported(current));
            }
            let name = fragment
                .strip_prefix(prefix.as_str())
                .map(unescape_pointer)
                .ok_or_else(|| ResolveError::UnresolvableReference(current.clone()))?;
            match table(&self.scopes[0].components).get(&name) {
                Some(RefOr::Item(item)) => return Ok(item.clone()),
                Some(RefOr::Ref { ref_path }) => current = ref_path.clone(),
                None => return Err(ResolveError::UnresolvableReference(current)),
            }
        }
        Err(ResolveError::UnresolvableReference(pointer.to_string()))
    }
}

impl RefResolve for ReferenceResolver {
    fn resolve_ref(&mut self, pointer: &str) -> Result<ReferenceSchema, ResolveError> {
        let scope = self.current_scope();
        let (document, fragment) = split_pointer(pointer);

        let target_scope = if document.is_empty() {
            scope
        } else if self.options.external_refs {
            self.external_scope(scope, document, pointer)?
        } else {
            return Err(ResolveError::ExternalReferenceUnsupported(
                pointer.to_string(),
            ));
        };

        let name = fragment
            .strip_prefix(SCHEMA_PREFIX)
            .map(unescape_pointer)
            .ok_or_else(|| ResolveError::UnresolvableReference(pointer.to_string()))?;

        let key = scope_key(&self.scopes[target_scope].key, &name);
        let id = match self.index.get(&key) {
            Some(id) => *id,
            None if self.scopes[target_scope]
                .components
                .schemas
                .contains_key(&name) =>
            {
                self.allocate(target_scope, &name)
            }
            None => return Err(ResolveError::UnresolvableReference(pointer.to_string())),
        };

        let cyclic = self.stack.contains(&id);
        if !cyclic && self.slots[id.0].node.is_none() {
            self.fill(id)?;
        }
        if scope == 0 {
            self.pointers.entry(pointer.to_string()).or_insert(id);
        }

        Ok(ReferenceSchema {
            pointer: pointer.to_string(),
            name,
            target: id,
            cyclic,
        })
    }
}

/// Read-only reference lookups against a finished graph, used for schemas
/// normalized after resolution (operation parameters and bodies).
pub struct GraphRefs<'g>(pub &'g SchemaGraph);

impl RefResolve for GraphRefs<'_> {
    fn resolve_ref(&mut self, pointer: &str) -> Result<ReferenceSchema, ResolveError> {
        let id = self
            .0
            .lookup_pointer(pointer)
            .ok_or_else(|| ResolveError::UnresolvableReference(pointer.to_string()))?;
        Ok(ReferenceSchema {
            pointer: pointer.to_string(),
            name: self.0.name(id).to_string(),
            target: id,
            cyclic: false,
        })
    }
}

fn scope_key(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}#{name}")
    }
}

/// Split `doc.yaml#/a/b` into (`doc.yaml`, `/a/b`).
fn split_pointer(pointer: &str) -> (&str, &str) {
    match pointer.split_once('#') {
        Some((document, fragment)) => (document, fragment),
        None => (pointer, ""),
    }
}

fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Every `$ref` under a raw schema, in document order.
fn collect_pointers(schema: &SchemaOrRef, out: &mut Vec<String>) {
    let schema = match schema {
        SchemaOrRef::Ref { ref_path } => {
            out.push(ref_path.clone());
            return;
        }
        SchemaOrRef::Bool(_) => return,
        SchemaOrRef::Schema(s) => s,
    };
    for prop in schema.properties.values() {
        collect_pointers(prop, out);
    }
    if let Some(items) = &schema.items {
        collect_pointers(items, out);
    }
    if let Some(AdditionalProperties::Schema(s)) = &schema.additional_properties {
        collect_pointers(s, out);
    }
    for s in schema
        .all_of
        .iter()
        .chain(&schema.any_of)
        .chain(&schema.one_of)
    {
        collect_pointers(s, out);
    }
    if let Some(not) = &schema.not {
        collect_pointers(not, out);
    }
}
