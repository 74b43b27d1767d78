use heck::ToLowerCamelCase;
use serde::{Deserialize, Serialize};

use crate::isr::{SchemaGraph, SchemaKind};

use super::AttributeRecord;
use super::names::foreign_key_for;

/// A relationship between a model and another model or an embedded object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelationshipRecord {
    #[serde(rename_all = "camelCase")]
    BelongsTo {
        name: String,
        related_model: String,
        foreign_key: String,
        local_key: String,
    },
    #[serde(rename_all = "camelCase")]
    HasMany {
        name: String,
        related_model: String,
        foreign_key: String,
        local_key: String,
    },
    Embedded {
        name: String,
        properties: Vec<String>,
    },
}

impl RelationshipRecord {
    pub fn name(&self) -> &str {
        match self {
            RelationshipRecord::BelongsTo { name, .. }
            | RelationshipRecord::HasMany { name, .. }
            | RelationshipRecord::Embedded { name, .. } => name,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            RelationshipRecord::BelongsTo { .. } => "belongsTo",
            RelationshipRecord::HasMany { .. } => "hasMany",
            RelationshipRecord::Embedded { .. } => "embedded",
        }
    }

    pub fn related_model(&self) -> Option<&str> {
        match self {
            RelationshipRecord::BelongsTo { related_model, .. }
            | RelationshipRecord::HasMany { related_model, .. } => Some(related_model),
            RelationshipRecord::Embedded { .. } => None,
        }
    }
}

/// Per-field replacement for the relationship heuristic, keyed `"Model.field"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelationshipOverride {
    /// Never treat the field as a relationship.
    Ignore,
    BelongsTo {
        related: String,
        #[serde(default)]
        foreign_key: Option<String>,
    },
    HasMany {
        related: String,
        #[serde(default)]
        foreign_key: Option<String>,
    },
    Embedded,
}

/// Detect relationships over a model's merged attributes.
///
/// A bare reference is a `belongsTo`, an array of references is a `hasMany`,
/// and an inline object with properties is `embedded`. Composition nodes are
/// not inspected.
pub fn detect_relationships(
    model_name: &str,
    attributes: &[&AttributeRecord],
    graph: &SchemaGraph,
    override_for: impl Fn(&str) -> Option<RelationshipOverride>,
) -> Vec<RelationshipRecord> {
    let mut relationships = Vec::new();
    for attr in attributes {
        let record = match override_for(&attr.name) {
            Some(o) => forced(model_name, attr, o),
            None => detect(model_name, attr, graph),
        };
        if let Some(record) = record {
            relationships.push(record);
        }
    }
    relationships
}

fn detect(
    model_name: &str,
    attr: &AttributeRecord,
    graph: &SchemaGraph,
) -> Option<RelationshipRecord> {
    let name = attr.name.to_lower_camel_case();
    match &attr.schema.kind {
        SchemaKind::Reference(r) => Some(RelationshipRecord::BelongsTo {
            name,
            related_model: graph.name(r.target).to_string(),
            foreign_key: format!("{}_id", attr.name),
            local_key: "id".to_string(),
        }),
        SchemaKind::Array(array) => {
            let target = array.items.as_ref()?.as_reference()?;
            Some(RelationshipRecord::HasMany {
                name,
                related_model: graph.name(target.target).to_string(),
                foreign_key: foreign_key_for(model_name),
                local_key: "id".to_string(),
            })
        }
        SchemaKind::Object(object) if !object.properties.is_empty() => {
            Some(RelationshipRecord::Embedded {
                name,
                properties: object.properties.keys().cloned().collect(),
            })
        }
        _ => None,
    }
}

fn forced(
    model_name: &str,
    attr: &AttributeRecord,
    o: RelationshipOverride,
) -> Option<RelationshipRecord> {
    let name = attr.name.to_lower_camel_case();
    match o {
        RelationshipOverride::Ignore => None,
        RelationshipOverride::BelongsTo {
            related,
            foreign_key,
        } => Some(RelationshipRecord::BelongsTo {
            name,
            related_model: related,
            foreign_key: foreign_key.unwrap_or_else(|| format!("{}_id", attr.name)),
            local_key: "id".to_string(),
        }),
        RelationshipOverride::HasMany {
            related,
            foreign_key,
        } => Some(RelationshipRecord::HasMany {
            name,
            related_model: related,
            foreign_key: foreign_key.unwrap_or_else(|| foreign_key_for(model_name)),
            local_key: "id".to_string(),
        }),
        RelationshipOverride::Embedded => Some(RelationshipRecord::Embedded {
            name,
            properties: attr
                .schema
                .as_object()
                .map(|o| o.properties.keys().cloned().collect())
                .unwrap_or_default(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isr::{ArraySchema, NamedSchema, ObjectSchema, ReferenceSchema, SchemaId, SchemaNode};

    fn graph() -> SchemaGraph {
        SchemaGraph::from_parts(vec![NamedSchema {
            name: "Category".to_string(),
            key: "Category".to_string(),
            node: SchemaNode::new(SchemaKind::Object(ObjectSchema::default())),
        }])
    }

    fn reference() -> SchemaNode {
        SchemaNode::new(SchemaKind::Reference(ReferenceSchema {
            pointer: "#/components/schemas/Category".to_string(),
            name: "Category".to_string(),
            target: SchemaId(0),
            cyclic: false,
        }))
    }

    fn attr(name: &str, schema: SchemaNode) -> AttributeRecord {
        AttributeRecord::new(name, schema, false)
    }

    #[test]
    fn test_belongs_to_from_reference() {
        let a = attr("main_category", reference());
        let rels = detect_relationships("Pet", &[&a], &graph(), |_| None);
        assert_eq!(
            rels,
            vec![RelationshipRecord::BelongsTo {
                name: "mainCategory".to_string(),
                related_model: "Category".to_string(),
                foreign_key: "main_category_id".to_string(),
                local_key: "id".to_string(),
            }]
        );
    }

    #[test]
    fn test_has_many_from_array_of_references() {
        let a = attr(
            "categories",
            SchemaNode::new(SchemaKind::Array(ArraySchema {
                items: Some(Box::new(reference())),
                ..ArraySchema::default()
            })),
        );
        let rels = detect_relationships("PetOwner", &[&a], &graph(), |_| None);
        assert_eq!(rels[0].kind_name(), "hasMany");
        assert_eq!(rels[0].related_model(), Some("Category"));
        let RelationshipRecord::HasMany { foreign_key, .. } = &rels[0] else {
            panic!("expected hasMany");
        };
        assert_eq!(foreign_key, "pet_owner_id");
    }

    #[test]
    fn test_scalar_and_empty_object_are_not_relationships() {
        let s = attr("name", SchemaNode::string());
        let o = attr("meta", SchemaNode::new(SchemaKind::Object(ObjectSchema::default())));
        let arr = attr(
            "labels",
            SchemaNode::new(SchemaKind::Array(ArraySchema {
                items: Some(Box::new(SchemaNode::string())),
                ..ArraySchema::default()
            })),
        );
        assert!(detect_relationships("Pet", &[&s, &o, &arr], &graph(), |_| None).is_empty());
    }

    #[test]
    fn test_override_ignores_and_forces() {
        let category = attr("category", reference());
        let owner = attr("owner_id", SchemaNode::integer());
        let rels = detect_relationships("Pet", &[&category, &owner], &graph(), |field| {
            match field {
                "category" => Some(RelationshipOverride::Ignore),
                "owner_id" => Some(RelationshipOverride::BelongsTo {
                    related: "User".to_string(),
                    foreign_key: Some("owner_id".to_string()),
                }),
                _ => None,
            }
        });
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].name(), "ownerId");
        assert_eq!(rels[0].related_model(), Some("User"));
    }
}
