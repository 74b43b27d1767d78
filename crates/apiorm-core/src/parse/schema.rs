use indexmap::IndexMap;
use serde::Deserialize;

/// A JSON Schema type keyword value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

/// The `type` field can be a single type or, since 3.1, an array of types.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TypeSet {
    Single(SchemaType),
    Multiple(Vec<SchemaType>),
}

/// A reference, an inline schema, or a 3.1 boolean schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrRef {
    Ref {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    Bool(bool),
    Schema(Box<Schema>),
}

/// `exclusiveMinimum`/`exclusiveMaximum`: a flag in 3.0, a bound in 3.1.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExclusiveBound {
    Flag(bool),
    Value(f64),
}

/// `additionalProperties` can be a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<SchemaOrRef>),
}

/// A JSON Schema object as written in the document. Keywords without a
/// dedicated field are collected into `extensions`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: Option<TypeSet>,
    pub format: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "default")]
    pub default_value: Option<serde_json::Value>,
    pub example: Option<serde_json::Value>,
    pub nullable: Option<bool>,
    pub deprecated: Option<bool>,
    pub read_only: Option<bool>,
    pub write_only: Option<bool>,

    pub properties: IndexMap<String, SchemaOrRef>,
    pub required: Vec<String>,
    pub additional_properties: Option<AdditionalProperties>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,

    pub items: Option<Box<SchemaOrRef>>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: Option<bool>,

    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    #[serde(rename = "enum")]
    pub enum_values: Vec<serde_json::Value>,
    #[serde(rename = "const")]
    pub const_value: Option<serde_json::Value>,

    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<ExclusiveBound>,
    pub exclusive_maximum: Option<ExclusiveBound>,
    pub multiple_of: Option<f64>,

    pub all_of: Vec<SchemaOrRef>,
    pub any_of: Vec<SchemaOrRef>,
    pub one_of: Vec<SchemaOrRef>,
    pub not: Option<Box<SchemaOrRef>>,

    #[serde(flatten)]
    pub extensions: IndexMap<String, serde_json::Value>,
}

impl Schema {
    pub fn has_composition(&self) -> bool {
        !self.all_of.is_empty()
            || !self.any_of.is_empty()
            || !self.one_of.is_empty()
            || self.not.is_some()
    }

    /// A copy with every composition keyword removed.
    pub fn without_composition(&self) -> Schema {
        Schema {
            all_of: Vec::new(),
            any_of: Vec::new(),
            one_of: Vec::new(),
            not: None,
            ..self.clone()
        }
    }

    /// Whether any typed keyword besides metadata is present.
    pub fn has_type_keywords(&self) -> bool {
        self.schema_type.is_some()
            || !self.enum_values.is_empty()
            || self.const_value.is_some()
            || self.has_object_keywords()
            || self.has_array_keywords()
            || self.has_string_keywords()
            || self.has_numeric_keywords()
    }

    pub fn has_object_keywords(&self) -> bool {
        !self.properties.is_empty()
            || !self.required.is_empty()
            || self.additional_properties.is_some()
            || self.min_properties.is_some()
            || self.max_properties.is_some()
    }

    pub fn has_array_keywords(&self) -> bool {
        self.items.is_some()
            || self.min_items.is_some()
            || self.max_items.is_some()
            || self.unique_items.is_some()
    }

    pub fn has_string_keywords(&self) -> bool {
        self.min_length.is_some() || self.max_length.is_some() || self.pattern.is_some()
    }

    pub fn has_numeric_keywords(&self) -> bool {
        self.minimum.is_some()
            || self.maximum.is_some()
            || self.exclusive_minimum.is_some()
            || self.exclusive_maximum.is_some()
            || self.multiple_of.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_keywords_collected() {
        let schema: Schema = serde_json::from_value(serde_json::json!({
            "type": "string",
            "x-laravel-cast": "encrypted",
            "contentMediaType": "text/plain"
        }))
        .unwrap();
        assert_eq!(schema.schema_type, Some(TypeSet::Single(SchemaType::String)));
        assert_eq!(schema.extensions.len(), 2);
        assert_eq!(schema.extensions["x-laravel-cast"], "encrypted");
    }

    #[test]
    fn test_exclusive_bound_forms() {
        let v30: Schema = serde_json::from_value(serde_json::json!({
            "type": "integer", "minimum": 1, "exclusiveMinimum": true
        }))
        .unwrap();
        assert_eq!(v30.exclusive_minimum, Some(ExclusiveBound::Flag(true)));

        let v31: Schema = serde_json::from_value(serde_json::json!({
            "type": "integer", "exclusiveMinimum": 1
        }))
        .unwrap();
        assert_eq!(v31.exclusive_minimum, Some(ExclusiveBound::Value(1.0)));
    }

    #[test]
    fn test_ref_or_bool_or_schema() {
        let r: SchemaOrRef =
            serde_json::from_value(serde_json::json!({"$ref": "#/components/schemas/Pet"}))
                .unwrap();
        assert!(matches!(r, SchemaOrRef::Ref { .. }));
        let b: SchemaOrRef = serde_json::from_value(serde_json::json!(true)).unwrap();
        assert_eq!(b, SchemaOrRef::Bool(true));
        let s: SchemaOrRef = serde_json::from_value(serde_json::json!({"type": "string"})).unwrap();
        assert!(matches!(s, SchemaOrRef::Schema(_)));
    }
}
