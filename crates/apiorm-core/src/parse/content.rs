//! Request bodies, responses and the media-type maps they carry.

use indexmap::IndexMap;
use serde::Deserialize;

use super::reference::RefOr;
use super::schema::SchemaOrRef;

/// Media type name → payload description.
pub type Content = IndexMap<String, MediaType>;

/// Payload of one media type. Encodings and named examples are ignored.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct MediaType {
    pub schema: Option<SchemaOrRef>,
    pub example: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct RequestBody {
    pub description: Option<String>,
    pub required: bool,
    pub content: Content,
}

/// One response. Headers and links are not modelled.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Response {
    pub description: String,
    pub content: Content,
}

pub type RequestBodyOrRef = RefOr<RequestBody>;
pub type ResponseOrRef = RefOr<Response>;
