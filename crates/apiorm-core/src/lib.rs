pub mod cache;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod isr;
pub mod load;
pub mod mapping;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod resolve;
pub mod rules;
pub mod versioning;

pub use pipeline::{ParsedSchema, Pipeline, PipelineOptions};

/// A generated file with path and content.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

/// Trait for code generators that produce files from a processed document.
pub trait CodeGenerator {
    type Config;
    type Error: std::error::Error;
    fn generate(
        &self,
        schema: &ParsedSchema,
        config: &Self::Config,
    ) -> Result<Vec<GeneratedFile>, Self::Error>;
}
