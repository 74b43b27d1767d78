use apiorm_core::error::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{0} already exists (use --force or generator.overwrite_existing to replace it)")]
    WouldOverwrite(String),

    #[error("no model mapping named {0}")]
    InvalidModelMapping(String),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl From<ModelError> for GenerateError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidModelMapping(name) => GenerateError::InvalidModelMapping(name),
        }
    }
}
