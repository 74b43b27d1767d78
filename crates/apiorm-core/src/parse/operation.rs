use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::content::{RequestBodyOrRef, ResponseOrRef};
use super::parameter::ParameterOrRef;

/// HTTP method of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    /// Iteration order used when walking a path item.
    pub const ORDER: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Trace,
    ];

    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE"][*self as usize]
    }

    /// Lower-case name, as used for path item keys.
    pub fn as_lower(&self) -> &'static str {
        ["get", "post", "put", "patch", "delete", "head", "options", "trace"][*self as usize]
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operation object. Callbacks, servers and security are not read.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Vec<ParameterOrRef>,
    pub request_body: Option<RequestBodyOrRef>,
    pub responses: IndexMap<String, ResponseOrRef>,
    pub deprecated: Option<bool>,
}

/// Operations under one path, plus the parameters they share.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct PathItem {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<ParameterOrRef>,
    pub get: Option<Operation>,
    pub post: Option<Operation>,
    pub put: Option<Operation>,
    pub patch: Option<Operation>,
    pub delete: Option<Operation>,
    pub head: Option<Operation>,
    pub options: Option<Operation>,
    pub trace: Option<Operation>,
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }

    pub fn operation_mut(&mut self, method: HttpMethod) -> Option<&mut Operation> {
        match method {
            HttpMethod::Get => self.get.as_mut(),
            HttpMethod::Post => self.post.as_mut(),
            HttpMethod::Put => self.put.as_mut(),
            HttpMethod::Patch => self.patch.as_mut(),
            HttpMethod::Delete => self.delete.as_mut(),
            HttpMethod::Head => self.head.as_mut(),
            HttpMethod::Options => self.options.as_mut(),
            HttpMethod::Trace => self.trace.as_mut(),
        }
    }

    /// Present operations in [`HttpMethod::ORDER`].
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        HttpMethod::ORDER
            .into_iter()
            .filter_map(move |m| self.operation(m).map(|op| (m, op)))
    }
}
