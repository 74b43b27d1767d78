use serde::{Deserialize, Serialize};

use super::reference::RefOr;
use super::schema::SchemaOrRef;

/// Where a parameter travels (`in`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
}

/// An operation or path-item parameter. Parameters are identified by
/// `name` together with `location`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Ignored for path parameters, which are always required.
    #[serde(default)]
    pub required: bool,
    pub schema: Option<SchemaOrRef>,
    pub style: Option<String>,
    pub explode: Option<bool>,
    pub description: Option<String>,
    pub deprecated: Option<bool>,
}

impl Parameter {
    pub fn same_slot(&self, other: &Parameter) -> bool {
        self.name == other.name && self.location == other.location
    }
}

pub type ParameterOrRef = RefOr<Parameter>;
