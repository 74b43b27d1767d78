//! Typed view of an OpenAPI 3.0/3.1 document, deserialized from a [`RawDocument`].

pub mod components;
pub mod content;
pub mod operation;
pub mod parameter;
pub mod reference;
pub mod schema;
pub mod spec;

use crate::error::{ParseError, PipelineError};
use crate::load::{RawDocument, Source};
use spec::OpenApiSpec;

/// OpenAPI versions accepted when no allow-list is configured.
pub const SUPPORTED_VERSIONS: &[&str] = &["3.0.0", "3.0.1", "3.0.2", "3.0.3", "3.1.0"];

/// Parse a loaded document, rejecting versions outside `supported`.
pub fn from_document<S: AsRef<str>>(
    doc: &RawDocument,
    supported: &[S],
) -> Result<OpenApiSpec, ParseError> {
    from_value(&doc.value, supported)
}

/// Parse an untyped document tree, rejecting versions outside `supported`.
pub fn from_value<S: AsRef<str>>(
    value: &serde_json::Value,
    supported: &[S],
) -> Result<OpenApiSpec, ParseError> {
    let version = document_version(value).ok_or(ParseError::MissingVersion)?;
    if !supported.iter().any(|v| v.as_ref() == version) {
        return Err(ParseError::UnsupportedVersion(version));
    }

    // The version may have been written as a bare YAML number; store it as text.
    let mut value = value.clone();
    if let Some(obj) = value.as_object_mut() {
        obj.remove("swagger");
        obj.insert("openapi".to_string(), serde_json::Value::String(version));
    }
    Ok(serde_json::from_value(value)?)
}

/// Parse an OpenAPI document from YAML text with the default allow-list.
pub fn from_yaml(input: &str) -> Result<OpenApiSpec, PipelineError> {
    from_text(input, "<inline>.yaml")
}

/// Parse an OpenAPI document from JSON text with the default allow-list.
pub fn from_json(input: &str) -> Result<OpenApiSpec, PipelineError> {
    from_text(input, "<inline>.json")
}

fn from_text(input: &str, name: &str) -> Result<OpenApiSpec, PipelineError> {
    let doc = RawDocument::from_bytes(Source::parse(name), input.as_bytes().to_vec())?;
    Ok(from_document(&doc, SUPPORTED_VERSIONS)?)
}

/// Read the declared `openapi` (or legacy `swagger`) version as a string.
pub fn document_version(value: &serde_json::Value) -> Option<String> {
    let raw = value.get("openapi").or_else(|| value.get("swagger"))?;
    match raw {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_from_openapi_key() {
        assert_eq!(
            document_version(&json!({"openapi": "3.0.3"})),
            Some("3.0.3".to_string())
        );
    }

    #[test]
    fn test_version_from_swagger_key() {
        assert_eq!(
            document_version(&json!({"swagger": "2.0"})),
            Some("2.0".to_string())
        );
    }

    #[test]
    fn test_numeric_version() {
        assert_eq!(
            document_version(&json!({"openapi": 3.1})),
            Some("3.1".to_string())
        );
    }

    #[test]
    fn test_reject_unlisted_version() {
        let err = from_value(&json!({"openapi": "3.1.0", "paths": {}}), &["3.0.3"]).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedVersion(v) if v == "3.1.0"));
    }

    #[test]
    fn test_missing_version() {
        let err = from_value(&json!({"paths": {}}), SUPPORTED_VERSIONS).unwrap_err();
        assert!(matches!(err, ParseError::MissingVersion));
    }
}
