//! End-to-end driver: load → parse → resolve → extract → map.

use crate::endpoints::{EndpointRecord, extract_endpoints};
use crate::error::{ModelError, PipelineError};
use crate::isr::SchemaGraph;
use crate::load::{DocumentLoader, LoaderOptions, RawDocument, Source};
use crate::mapping::{MapperOptions, ModelCatalog, ModelMapping, map_models};
use crate::parse::{self, SUPPORTED_VERSIONS};
use crate::parse::spec::OpenApiSpec;
use crate::resolve::{ReferenceResolver, ResolverOptions};
use crate::rules::{ValidationRuleSet, generate_rules, model_rules};

/// Settings for one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub loader: LoaderOptions,
    pub supported_versions: Vec<String>,
    pub external_refs: bool,
    pub mapper: MapperOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            loader: LoaderOptions::default(),
            supported_versions: SUPPORTED_VERSIONS.iter().map(|v| v.to_string()).collect(),
            external_refs: false,
            mapper: MapperOptions::default(),
        }
    }
}

/// Everything derived from one document.
#[derive(Debug, Clone)]
pub struct ParsedSchema {
    pub source: Source,
    /// Hex sha256 of the document bytes.
    pub hash: String,
    /// The document with component parameters, bodies and responses inlined.
    pub spec: OpenApiSpec,
    pub graph: SchemaGraph,
    pub endpoints: Vec<EndpointRecord>,
    pub models: ModelCatalog,
}

impl ParsedSchema {
    pub fn model(&self, name: &str) -> Result<&ModelMapping, ModelError> {
        self.models.require(name)
    }

    /// Validation rules over a model's merged attributes.
    pub fn rules_for(&self, model: &str) -> Result<ValidationRuleSet, ModelError> {
        Ok(model_rules(self.model(model)?, &self.graph))
    }

    /// Validation rules for a named component schema.
    pub fn schema_rules(&self, schema: &str) -> Option<ValidationRuleSet> {
        self.graph
            .find(schema)
            .map(|id| generate_rules(self.graph.get(id), &self.graph))
    }

    pub fn base_url(&self) -> Option<&str> {
        self.spec.base_url()
    }

    pub fn title(&self) -> &str {
        &self.spec.info.title
    }
}

/// Runs documents through every stage. Holds no per-document state.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: PipelineOptions,
    loader: DocumentLoader,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        let loader = DocumentLoader::new(options.loader);
        Self { options, loader }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn load(&self, source: &Source) -> Result<RawDocument, PipelineError> {
        Ok(self.loader.load(source)?)
    }

    /// Load and process a source.
    pub fn run(&self, source: &Source) -> Result<ParsedSchema, PipelineError> {
        let doc = self.load(source)?;
        self.process(&doc)
    }

    /// Process a document that is already in memory (JSON or YAML text).
    pub fn process_str(&self, name: &str, input: &str) -> Result<ParsedSchema, PipelineError> {
        let doc = RawDocument::from_bytes(Source::parse(name), input.as_bytes().to_vec())?;
        self.process(&doc)
    }

    pub fn process(&self, doc: &RawDocument) -> Result<ParsedSchema, PipelineError> {
        let spec = parse::from_document(doc, &self.options.supported_versions)?;
        log::debug!("parsed {} (OpenAPI {})", doc.source, spec.openapi);

        let resolver = ReferenceResolver::new(ResolverOptions {
            external_refs: self.options.external_refs,
            source: Some(doc.source.clone()),
            loader: self.loader.clone(),
        });
        let resolved = resolver.resolve(&spec)?;
        let endpoints = extract_endpoints(&resolved)?;
        let models = map_models(&endpoints, &resolved.graph, &self.options.mapper);
        log::debug!(
            "{}: {} schemas, {} endpoints, {} models",
            doc.source,
            resolved.graph.len(),
            endpoints.len(),
            models.len()
        );

        Ok(ParsedSchema {
            source: doc.source.clone(),
            hash: doc.hash.clone(),
            spec: resolved.spec,
            graph: resolved.graph,
            endpoints,
            models,
        })
    }
}
