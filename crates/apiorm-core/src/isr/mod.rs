//! Intermediate schema representation: the canonical, typed form every stage
//! after normalization works on.

pub mod graph;
pub mod node;

pub use graph::{NamedSchema, SchemaGraph, SchemaId};
pub use node::{
    AdditionalProperties, ArraySchema, CompositeSchema, NumericSchema, ObjectSchema,
    ReferenceSchema, SchemaKind, SchemaNode, StringSchema,
};
