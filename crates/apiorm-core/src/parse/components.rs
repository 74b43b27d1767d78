use indexmap::IndexMap;
use serde::Deserialize;

use super::content::{RequestBodyOrRef, ResponseOrRef};
use super::parameter::ParameterOrRef;
use super::schema::SchemaOrRef;

/// `components` of a document: the targets of `#/components/...` pointers.
/// Security schemes stay untyped; only their names are reported.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Components {
    pub schemas: IndexMap<String, SchemaOrRef>,
    pub parameters: IndexMap<String, ParameterOrRef>,
    pub request_bodies: IndexMap<String, RequestBodyOrRef>,
    pub responses: IndexMap<String, ResponseOrRef>,
    pub security_schemes: IndexMap<String, serde_json::Value>,
}
