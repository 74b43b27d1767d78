use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use super::node::{SchemaKind, SchemaNode};

/// Index of a named schema inside a [`SchemaGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SchemaId(pub(crate) usize);

impl SchemaId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One named schema in the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSchema {
    pub name: String,
    /// Canonical registry key: the bare name for local schemas,
    /// `document#name` for schemas pulled in from external documents.
    pub key: String,
    pub node: SchemaNode,
}

/// Arena of every named schema reachable from a document. References inside
/// nodes point at arena slots, so cyclic schemas stay finite.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaGraph {
    schemas: Vec<NamedSchema>,
    #[serde(skip)]
    index: IndexMap<String, SchemaId>,
    /// `$ref` strings as written in the root document, mapped to their targets.
    #[serde(skip)]
    pointers: IndexMap<String, SchemaId>,
}

impl SchemaGraph {
    pub(crate) fn from_parts(schemas: Vec<NamedSchema>) -> Self {
        let index = schemas
            .iter()
            .enumerate()
            .map(|(i, s)| (s.key.clone(), SchemaId(i)))
            .collect();
        Self {
            schemas,
            index,
            pointers: IndexMap::new(),
        }
    }

    pub(crate) fn set_pointers(&mut self, pointers: IndexMap<String, SchemaId>) {
        self.pointers = pointers;
    }

    /// Target of a `$ref` written in the root document.
    pub fn lookup_pointer(&self, pointer: &str) -> Option<SchemaId> {
        if let Some(id) = self.pointers.get(pointer) {
            return Some(*id);
        }
        pointer
            .strip_prefix("#/components/schemas/")
            .and_then(|name| self.lookup(&name.replace("~1", "/").replace("~0", "~")))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn get(&self, id: SchemaId) -> &SchemaNode {
        &self.schemas[id.0].node
    }

    pub fn entry(&self, id: SchemaId) -> &NamedSchema {
        &self.schemas[id.0]
    }

    pub fn name(&self, id: SchemaId) -> &str {
        &self.schemas[id.0].name
    }

    /// Look up a schema by registry key (the bare component name for local schemas).
    pub fn lookup(&self, key: &str) -> Option<SchemaId> {
        self.index.get(key).copied()
    }

    pub fn by_name(&self, key: &str) -> Option<&SchemaNode> {
        self.lookup(key).map(|id| self.get(id))
    }

    /// Look up by registry key, falling back to the first schema with that
    /// bare name (for schemas pulled in from external documents).
    pub fn find(&self, name: &str) -> Option<SchemaId> {
        self.lookup(name)
            .or_else(|| self.iter().find(|(_, s)| s.name == name).map(|(id, _)| id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SchemaId, &NamedSchema)> {
        self.schemas
            .iter()
            .enumerate()
            .map(|(i, s)| (SchemaId(i), s))
    }

    /// Follow reference chains until a non-reference node. Stops at the last
    /// node reached if the chain loops back on itself.
    pub fn deref<'a>(&'a self, node: &'a SchemaNode) -> &'a SchemaNode {
        let mut current = node;
        let mut hops = 0;
        while let SchemaKind::Reference(r) = &current.kind {
            if hops > self.schemas.len() {
                break;
            }
            current = self.get(r.target);
            hops += 1;
        }
        current
    }

    /// Name of the schema a node points at, if it is a reference.
    pub fn reference_name(&self, node: &SchemaNode) -> Option<&str> {
        node.as_reference().map(|r| self.name(r.target))
    }
}
