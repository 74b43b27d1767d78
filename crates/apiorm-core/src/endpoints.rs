//! Endpoint Extractor: one [`EndpointRecord`] per path × method, with
//! parameters, request body and responses normalized against the graph.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::ResolveError;
use crate::isr::SchemaNode;
use crate::normalize::normalize;
use crate::parse::content::Content;
use crate::parse::operation::{HttpMethod, Operation};
use crate::parse::parameter::{Parameter, ParameterLocation, ParameterOrRef};
use crate::resolve::{GraphRefs, ResolvedDocument};

/// Media type → schema.
pub type ContentMap = IndexMap<String, SchemaNode>;

/// One HTTP operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRecord {
    pub operation_id: String,
    pub path: String,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Vec<ParameterRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<ContentMap>,
    pub responses: IndexMap<String, ContentMap>,
    pub deprecated: bool,
}

impl EndpointRecord {
    /// Whether the path contains a `{param}` segment.
    pub fn has_path_parameter(&self) -> bool {
        self.path.contains('{')
    }

    /// Every schema carried by the endpoint: parameters, then the request
    /// body, then responses.
    pub fn schemas(&self) -> impl Iterator<Item = &SchemaNode> {
        self.parameters
            .iter()
            .filter_map(|p| p.schema.as_ref())
            .chain(self.request_body.iter().flat_map(|c| c.values()))
            .chain(self.responses.values().flat_map(|c| c.values()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterRecord {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deprecated: bool,
}

/// Extract every operation of a resolved document in path order, then
/// method order (`get, post, put, patch, delete, head, options, trace`).
pub fn extract_endpoints(doc: &ResolvedDocument) -> Result<Vec<EndpointRecord>, ResolveError> {
    let mut refs = GraphRefs(&doc.graph);
    let mut endpoints = Vec::new();

    for (path, item) in &doc.spec.paths {
        for method in HttpMethod::ORDER {
            let Some(op) = item.operation(method) else {
                continue;
            };
            let params = merge_parameters(&item.parameters, &op.parameters)?;
            endpoints.push(build_endpoint(path, method, op, &params, &mut refs)?);
        }
    }

    log::debug!("extracted {} endpoints", endpoints.len());
    Ok(endpoints)
}

/// Synthesize an operation id from method and path: `GET /pets/{petId}`
/// becomes `get_pets__petId`.
pub fn synthesize_operation_id(method: HttpMethod, path: &str) -> String {
    let sanitized: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        method.as_lower().to_string()
    } else {
        format!("{}_{trimmed}", method.as_lower())
    }
}

/// Path-level parameters first; an operation parameter with the same
/// `name` and `in` replaces the path-level one in place.
fn merge_parameters<'a>(
    path_level: &'a [ParameterOrRef],
    op_level: &'a [ParameterOrRef],
) -> Result<Vec<&'a Parameter>, ResolveError> {
    let mut merged: Vec<&Parameter> = Vec::new();
    for p in path_level.iter().chain(op_level) {
        let param = p.item().map_err(unresolved)?;
        match merged.iter().position(|m| m.same_slot(param)) {
            Some(i) => merged[i] = param,
            None => merged.push(param),
        }
    }
    Ok(merged)
}

fn build_endpoint(
    path: &str,
    method: HttpMethod,
    op: &Operation,
    params: &[&Parameter],
    refs: &mut GraphRefs<'_>,
) -> Result<EndpointRecord, ResolveError> {
    let operation_id = op
        .operation_id
        .clone()
        .unwrap_or_else(|| synthesize_operation_id(method, path));

    let mut parameters = Vec::with_capacity(params.len());
    for param in params {
        let schema = param
            .schema
            .as_ref()
            .map(|s| normalize(s, refs))
            .transpose()?;
        parameters.push(ParameterRecord {
            name: param.name.clone(),
            location: param.location,
            required: param.required || param.location == ParameterLocation::Path,
            schema,
            style: param.style.clone(),
            explode: param.explode,
            description: param.description.clone(),
            deprecated: param.deprecated.unwrap_or(false),
        });
    }

    let request_body = match &op.request_body {
        Some(body) => Some(content_map(&body.item().map_err(unresolved)?.content, refs)?),
        None => None,
    };

    let mut responses = IndexMap::new();
    for (status, resp) in &op.responses {
        let resp = resp.item().map_err(unresolved)?;
        responses.insert(status.clone(), content_map(&resp.content, refs)?);
    }

    Ok(EndpointRecord {
        operation_id,
        path: path.to_string(),
        method,
        summary: op.summary.clone(),
        description: op.description.clone(),
        tags: op.tags.clone(),
        parameters,
        request_body,
        responses,
        deprecated: op.deprecated.unwrap_or(false),
    })
}

/// Component refs are inlined by the resolver; one left over is an error.
fn unresolved(pointer: &str) -> ResolveError {
    ResolveError::UnresolvableReference(pointer.to_string())
}

fn content_map(
    content: &Content,
    refs: &mut GraphRefs<'_>,
) -> Result<ContentMap, ResolveError> {
    let mut map = ContentMap::new();
    for (media_type, media) in content {
        if let Some(schema) = &media.schema {
            map.insert(media_type.clone(), normalize(schema, refs)?);
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::reference::RefOr;

    #[test]
    fn test_synthesize_operation_id() {
        assert_eq!(synthesize_operation_id(HttpMethod::Get, "/pets"), "get_pets");
        assert_eq!(
            synthesize_operation_id(HttpMethod::Get, "/pets/{petId}"),
            "get_pets__petId"
        );
        assert_eq!(
            synthesize_operation_id(HttpMethod::Delete, "/users/{id}/posts/"),
            "delete_users__id__posts"
        );
        assert_eq!(synthesize_operation_id(HttpMethod::Options, "/"), "options");
    }

    fn param(name: &str, location: ParameterLocation, description: &str) -> ParameterOrRef {
        RefOr::Item(Parameter {
            name: name.to_string(),
            location,
            description: Some(description.to_string()),
            required: false,
            deprecated: None,
            schema: None,
            style: None,
            explode: None,
        })
    }

    #[test]
    fn test_operation_parameter_overrides_path_parameter() {
        let path_level = vec![
            param("limit", ParameterLocation::Query, "path level"),
            param("X-Trace", ParameterLocation::Header, "trace"),
        ];
        let op_level = vec![
            param("limit", ParameterLocation::Query, "operation level"),
            param("limit", ParameterLocation::Header, "different location"),
        ];
        let merged = merge_parameters(&path_level, &op_level).unwrap();
        let described: Vec<_> = merged
            .iter()
            .map(|p| p.description.as_deref().unwrap())
            .collect();
        assert_eq!(
            described,
            vec!["operation level", "trace", "different location"]
        );
    }
}
