use indexmap::IndexMap;
use serde::Deserialize;

use super::components::Components;
use super::operation::PathItem;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Info {
    pub title: String,
    pub description: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Server {
    pub url: String,
    pub description: Option<String>,
}

/// The parts of an OpenAPI 3.x document the pipeline reads. Security
/// requirements, webhooks and external docs are skipped.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenApiSpec {
    pub openapi: String,
    #[serde(default)]
    pub info: Info,
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    pub components: Option<Components>,
}

impl OpenApiSpec {
    /// The first declared server URL, used as the default API base URL.
    pub fn base_url(&self) -> Option<&str> {
        self.servers.first().map(|s| s.url.as_str())
    }

    /// Names under `components.securitySchemes`, in document order.
    pub fn security_schemes(&self) -> Vec<&str> {
        self.components
            .iter()
            .flat_map(|c| c.security_schemes.keys())
            .map(String::as_str)
            .collect()
    }
}
