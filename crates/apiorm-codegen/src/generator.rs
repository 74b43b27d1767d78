use std::path::{Path, PathBuf};

use apiorm_core::config::GeneratorConfig;
use apiorm_core::isr::SchemaGraph;
use apiorm_core::mapping::ModelMapping;
use apiorm_core::{CodeGenerator, GeneratedFile, ParsedSchema};

use crate::emitters;
use crate::error::GenerateError;
use crate::naming::{class_name, factory_file, model_file};

/// Source of the model class for one mapping.
pub fn generate_model_source(
    mapping: &ModelMapping,
    graph: &SchemaGraph,
    config: &GeneratorConfig,
) -> Result<String, GenerateError> {
    emitters::model::emit_model(mapping, graph, config, None)
}

/// Source of the factory class for one mapping.
pub fn generate_factory_source(
    mapping: &ModelMapping,
    graph: &SchemaGraph,
    config: &GeneratorConfig,
) -> Result<String, GenerateError> {
    emitters::factory::emit_factory(mapping, graph, config)
}

/// Model (and factory) generator over a processed document.
#[derive(Debug, Clone, Default)]
pub struct ModelGenerator {
    model: Option<String>,
    base_url: Option<String>,
}

impl ModelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a single named model instead of the whole catalog.
    pub fn only(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Base URL written into models, in place of the document's first server.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }
}

impl CodeGenerator for ModelGenerator {
    type Config = GeneratorConfig;
    type Error = GenerateError;

    fn generate(
        &self,
        schema: &ParsedSchema,
        config: &GeneratorConfig,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        let models: Vec<&ModelMapping> = match &self.model {
            Some(name) => vec![schema.model(name)?],
            None => schema.models.iter().collect(),
        };
        let base_url = self.base_url.as_deref().or(schema.base_url());

        let mut files = Vec::new();
        for mapping in models {
            let class = class_name(&mapping.model_name, config);
            files.push(GeneratedFile {
                path: model_file(&class),
                content: emitters::model::emit_model(mapping, &schema.graph, config, base_url)?,
            });
            if config.factories {
                files.push(GeneratedFile {
                    path: factory_file(&class),
                    content: emitters::factory::emit_factory(mapping, &schema.graph, config)?,
                });
            }
        }
        log::debug!("generated {} files for {}", files.len(), schema.source);
        Ok(files)
    }
}

/// One file the caller should write.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedWrite {
    pub path: PathBuf,
    pub content: String,
    /// An existing file will be replaced.
    pub replaces: bool,
}

/// Place generated files under `output_dir`. Nothing is written here; an
/// existing target is an error unless `overwrite` is set.
pub fn plan_writes(
    files: &[GeneratedFile],
    output_dir: &Path,
    overwrite: bool,
    exists: &dyn Fn(&Path) -> bool,
) -> Result<Vec<PlannedWrite>, GenerateError> {
    let mut plan = Vec::with_capacity(files.len());
    for file in files {
        let path = output_dir.join(&file.path);
        let replaces = exists(&path);
        if replaces && !overwrite {
            return Err(GenerateError::WouldOverwrite(path.display().to_string()));
        }
        plan.push(PlannedWrite {
            path,
            content: file.content.clone(),
            replaces,
        });
    }
    Ok(plan)
}
