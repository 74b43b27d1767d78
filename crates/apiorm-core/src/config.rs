use std::fs;
use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::load::{DEFAULT_MAX_BYTES, LoaderOptions, Source};
use crate::mapping::{MapperOptions, RelationshipOverride};
use crate::parse::SUPPORTED_VERSIONS;
use crate::pipeline::PipelineOptions;
use crate::versioning::CompareStrategy;

/// Top-level project configuration loaded from `.apiorm.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiOrmConfig {
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub supported_versions: Vec<String>,
    /// Follow `$ref`s into other documents.
    pub external_refs: bool,
    pub default_schema: Option<String>,
    pub schemas: IndexMap<String, SchemaSourceConfig>,
    pub generator: GeneratorConfig,
    pub versioning: VersioningConfig,
    /// Relationship overrides keyed `"Model.field"`.
    pub relationships: IndexMap<String, RelationshipOverride>,
}

impl Default for ApiOrmConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
            supported_versions: SUPPORTED_VERSIONS.iter().map(|v| v.to_string()).collect(),
            external_refs: false,
            default_schema: None,
            schemas: IndexMap::new(),
            generator: GeneratorConfig::default(),
            versioning: VersioningConfig::default(),
            relationships: IndexMap::new(),
        }
    }
}

impl ApiOrmConfig {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            loader: LoaderOptions {
                timeout: Duration::from_secs(self.fetch.timeout_secs),
                max_bytes: self.fetch.max_bytes,
            },
            supported_versions: self.supported_versions.clone(),
            external_refs: self.external_refs,
            mapper: MapperOptions {
                overrides: self.relationships.clone(),
            },
        }
    }

    /// The named schema, or the default one when `name` is `None`.
    pub fn schema(&self, name: Option<&str>) -> Option<(&str, &SchemaSourceConfig)> {
        let name = name.or(self.default_schema.as_deref())?;
        self.schemas
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Remote fetch limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// One configured schema document.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaSourceConfig {
    /// File path or `http(s)` URL.
    pub source: String,
    /// Overrides the document's first server URL in generated models.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub generation: GenerationToggle,
}

impl SchemaSourceConfig {
    pub fn source(&self) -> Source {
        Source::parse(&self.source)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationToggle {
    pub enabled: bool,
}

impl Default for GenerationToggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Class naming convention for generated models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    #[default]
    PascalCase,
    SnakeCase,
    CamelCase,
}

/// Code generator settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub namespace: String,
    pub output_directory: String,
    pub naming_convention: NamingConvention,
    pub prefix: String,
    pub suffix: String,
    pub overwrite_existing: bool,
    /// Also emit one factory per model.
    pub factories: bool,
    pub base_class: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            namespace: "App\\Models\\Api".to_string(),
            output_directory: "app/Models/Api".to_string(),
            naming_convention: NamingConvention::PascalCase,
            prefix: String::new(),
            suffix: String::new(),
            overwrite_existing: false,
            factories: true,
            base_class: "ApiModel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VersioningConfig {
    pub storage_root: String,
    pub strategy: CompareStrategy,
    /// Versions kept per schema by `versions prune`.
    pub keep: usize,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            storage_root: "storage/apiorm/schemas".to_string(),
            strategy: CompareStrategy::Hash,
            keep: 10,
        }
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".apiorm.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<ApiOrmConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|cause| ConfigError::Io {
        path: path.display().to_string(),
        cause,
    })?;
    let config = serde_yaml_ng::from_str(&content).map_err(|cause| ConfigError::Yaml {
        path: path.display().to_string(),
        cause,
    })?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# apiorm configuration
default_schema: petstore

schemas:
  petstore:
    source: openapi.yaml        # file path or http(s) URL
    # base_url: https://api.example.com
    generation:
      enabled: true

cache:
  enabled: true
  ttl_secs: 3600

fetch:
  timeout_secs: 30
  max_bytes: 10485760

supported_versions: ["3.0.0", "3.0.1", "3.0.2", "3.0.3", "3.1.0"]
external_refs: false

generator:
  namespace: App\Models\Api
  output_directory: app/Models/Api
  naming_convention: pascal_case   # pascal_case | snake_case | camel_case
  prefix: ""
  suffix: ""
  overwrite_existing: false
  factories: true
  base_class: ApiModel

versioning:
  storage_root: storage/apiorm/schemas
  strategy: hash                   # hash | content | timestamp
  keep: 10

relationships: {}
  # Pet.category: { type: ignore }
  # Order.buyer: { type: belongs_to, related: User, foreign_key: buyer_id }
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiOrmConfig::default();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
        assert_eq!(config.fetch.max_bytes, DEFAULT_MAX_BYTES);
        assert_eq!(config.supported_versions.len(), SUPPORTED_VERSIONS.len());
        assert!(!config.external_refs);
        assert_eq!(config.generator.naming_convention, NamingConvention::PascalCase);
        assert_eq!(config.versioning.strategy, CompareStrategy::Hash);
        assert!(config.schema(None).is_none());
    }

    #[test]
    fn test_default_config_content_parses() {
        let config: ApiOrmConfig = serde_yaml_ng::from_str(default_config_content()).unwrap();
        let (name, schema) = config.schema(None).unwrap();
        assert_eq!(name, "petstore");
        assert_eq!(schema.source(), Source::parse("openapi.yaml"));
        assert_eq!(config.generator.namespace, "App\\Models\\Api");
        assert!(config.relationships.is_empty());
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
default_schema: shop
schemas:
  shop:
    source: https://shop.example.com/openapi.json
    base_url: https://api.shop.example.com
    generation:
      enabled: false
fetch:
  timeout_secs: 5
external_refs: true
generator:
  naming_convention: snake_case
  prefix: Api
  overwrite_existing: true
versioning:
  strategy: content
relationships:
  Pet.category:
    type: ignore
  Order.buyer:
    type: belongs_to
    related: User
    foreign_key: buyer_id
"#;
        let config: ApiOrmConfig = serde_yaml_ng::from_str(yaml).unwrap();
        let (_, shop) = config.schema(Some("shop")).unwrap();
        assert!(matches!(shop.source(), Source::Url(_)));
        assert!(!shop.generation.enabled);
        assert_eq!(config.generator.naming_convention, NamingConvention::SnakeCase);
        assert_eq!(config.generator.prefix, "Api");
        assert!(config.generator.factories);
        assert_eq!(config.versioning.strategy, CompareStrategy::Content);
        assert_eq!(config.relationships["Pet.category"], RelationshipOverride::Ignore);

        let options = config.pipeline_options();
        assert!(options.external_refs);
        assert_eq!(options.loader.timeout, Duration::from_secs(5));
        assert_eq!(
            options.mapper.overrides["Order.buyer"],
            RelationshipOverride::BelongsTo {
                related: "User".to_string(),
                foreign_key: Some("buyer_id".to_string()),
            }
        );
    }

    #[test]
    fn test_missing_config_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join(CONFIG_FILE_NAME)).unwrap().is_none());
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "cache: [not, a, map]\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Yaml { .. })));
    }
}
