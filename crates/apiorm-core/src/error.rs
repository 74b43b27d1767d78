use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("schema source not found: {0}")]
    SourceNotFound(String),

    #[error("schema source unreadable: {source_name}: {reason}")]
    SourceUnreadable { source_name: String, reason: String },

    #[error("schema source too large: {source_name} exceeds {limit} bytes")]
    SourceTooLarge { source_name: String, limit: u64 },

    #[error("malformed document {source_name}: not JSON ({json}) and not YAML ({yaml})")]
    MalformedDocument {
        source_name: String,
        json: String,
        yaml: String,
    },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),

    #[error("document declares neither `openapi` nor `swagger` version")]
    MissingVersion,

    #[error("invalid OpenAPI document structure: {0}")]
    InvalidStructure(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unresolvable reference: {0}")]
    UnresolvableReference(String),

    #[error("external reference not supported: {0}")]
    ExternalReferenceUnsupported(String),

    #[error("failed to load external document for {pointer}: {cause}")]
    External {
        pointer: String,
        #[source]
        cause: Box<PipelineError>,
    },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no model mapping named {0}")]
    InvalidModelMapping(String),
}

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("version storage I/O failed at {path}: {cause}")]
    Io {
        path: String,
        #[source]
        cause: std::io::Error,
    },

    #[error("invalid version metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema {schema} has no version {version}")]
    NotFound { schema: String, version: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {cause}")]
    Io {
        path: String,
        #[source]
        cause: std::io::Error,
    },

    #[error("failed to parse config {path}: {cause}")]
    Yaml {
        path: String,
        #[source]
        cause: serde_yaml_ng::Error,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),
}
