use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use indexmap::IndexMap;

use apiorm_codegen::{ModelGenerator, plan_writes};
use apiorm_core::cache::SchemaCache;
use apiorm_core::config::{self, ApiOrmConfig, CONFIG_FILE_NAME, SchemaSourceConfig};
use apiorm_core::load::Source;
use apiorm_core::rules::ValidationRuleSet;
use apiorm_core::versioning::{CompareStrategy, VersionStore};
use apiorm_core::{CodeGenerator, ParsedSchema, Pipeline};

#[derive(Parser)]
#[command(
    name = "apiorm",
    about = "OpenAPI schema pipeline for API-backed models",
    version
)]
struct Cli {
    /// Path to the project configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Which document to work on: an explicit source or a configured schema.
#[derive(Args, Clone)]
struct TargetArgs {
    /// OpenAPI document: file path or http(s) URL
    #[arg(short, long, conflicts_with = "schema")]
    input: Option<String>,

    /// Name of a schema from the configuration file
    #[arg(short, long)]
    schema: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an OpenAPI document by running the whole pipeline on it
    Validate {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the models, endpoints and schemas derived from a document
    Inspect {
        #[command(flatten)]
        target: TargetArgs,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: OutputFormat,

        /// Only print one part of the result
        #[arg(long, default_value = "all")]
        section: Section,
    },

    /// Print validation rules for models or component schemas
    Rules {
        #[command(flatten)]
        target: TargetArgs,

        /// Only this model
        #[arg(short, long)]
        model: Option<String>,

        /// Rules of a component schema instead of a model
        #[arg(long, conflicts_with = "model")]
        component: Option<String>,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: OutputFormat,
    },

    /// Generate model and factory sources
    Generate {
        #[command(flatten)]
        target: TargetArgs,

        /// Only this model
        #[arg(short, long)]
        model: Option<String>,

        /// Output directory (defaults to generator.output_directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace existing files
        #[arg(long)]
        force: bool,

        /// Show what would be written without touching the filesystem
        #[arg(long)]
        dry_run: bool,
    },

    /// Store and compare versions of schema documents
    Versions {
        #[command(subcommand)]
        command: VersionCommands,
    },

    /// Initialize a new apiorm configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum VersionCommands {
    /// Snapshot the current document if it changed since the last version
    Store {
        #[command(flatten)]
        target: TargetArgs,

        /// Name to store under (defaults to the schema or file name)
        #[arg(long)]
        name: Option<String>,

        /// Store even if nothing changed
        #[arg(long)]
        always: bool,
    },

    /// List stored versions, oldest first
    List {
        /// Stored schema name
        schema: String,
    },

    /// Compare two versions (the latest two by default)
    Diff {
        /// Stored schema name
        schema: String,
        from: Option<String>,
        to: Option<String>,

        /// Comparison strategy (defaults to versioning.strategy)
        #[arg(long)]
        strategy: Option<StrategyArg>,
    },

    /// Delete all but the newest versions
    Prune {
        /// Stored schema name
        schema: String,

        /// Versions to keep (defaults to versioning.keep)
        #[arg(long)]
        keep: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Section {
    All,
    Models,
    Endpoints,
    Schemas,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Hash,
    Content,
    Timestamp,
}

impl From<StrategyArg> for CompareStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Hash => CompareStrategy::Hash,
            StrategyArg::Content => CompareStrategy::Content,
            StrategyArg::Timestamp => CompareStrategy::Timestamp,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { target } => cmd_validate(&mut Session::open(&cli.config)?, &target),

        Commands::Inspect {
            target,
            format,
            section,
        } => cmd_inspect(&mut Session::open(&cli.config)?, &target, format, section),

        Commands::Rules {
            target,
            model,
            component,
            format,
        } => cmd_rules(
            &mut Session::open(&cli.config)?,
            &target,
            model.as_deref(),
            component.as_deref(),
            format,
        ),

        Commands::Generate {
            target,
            model,
            output,
            force,
            dry_run,
        } => cmd_generate(
            &mut Session::open(&cli.config)?,
            &target,
            model.as_deref(),
            output,
            force,
            dry_run,
        ),

        Commands::Versions { command } => cmd_versions(&mut Session::open(&cli.config)?, command),

        Commands::Init { force } => cmd_init(&cli.config, force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "apiorm", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Configuration plus the pipeline and cache built from it.
struct Session {
    config: ApiOrmConfig,
    pipeline: Pipeline,
    cache: SchemaCache,
}

impl Session {
    fn open(config_path: &Path) -> Result<Self> {
        let config = config::load_config(config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?
            .unwrap_or_else(|| {
                log::debug!("{} not found, using defaults", config_path.display());
                ApiOrmConfig::default()
            });
        let pipeline = Pipeline::new(config.pipeline_options());
        let cache = SchemaCache::new(config.cache.enabled, config.cache.ttl());
        Ok(Self {
            config,
            pipeline,
            cache,
        })
    }

    fn parse(&mut self, target: &Target) -> Result<Arc<ParsedSchema>> {
        self.cache
            .get_or_build(&self.pipeline, &target.source)
            .with_context(|| format!("failed to process {}", target.source))
    }
}

/// A document resolved from the command line or the configuration.
struct Target {
    name: String,
    source: Source,
    base_url: Option<String>,
    generate: bool,
}

impl Target {
    fn from_input(input: &str) -> Self {
        let source = Source::parse(input);
        Self {
            name: source_name(&source),
            source,
            base_url: None,
            generate: true,
        }
    }

    fn configured(name: &str, schema: &SchemaSourceConfig) -> Self {
        Self {
            name: name.to_string(),
            source: schema.source(),
            base_url: schema.base_url.clone(),
            generate: schema.generation.enabled,
        }
    }
}

/// File stem of the last path segment: `specs/petstore.yaml` → `petstore`.
fn source_name(source: &Source) -> String {
    let last = match source {
        Source::Path(path) => path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string),
        Source::Url(url) => url
            .split(['?', '#'])
            .next()
            .and_then(|u| u.trim_end_matches('/').rsplit('/').next())
            .map(|segment| match segment.split_once('.') {
                Some((stem, _)) => stem.to_string(),
                None => segment.to_string(),
            }),
    };
    last.filter(|s| !s.is_empty())
        .unwrap_or_else(|| "schema".to_string())
}

/// Every document a command should cover: the explicit input, the named or
/// default schema, or else every configured schema.
fn targets(args: &TargetArgs, cfg: &ApiOrmConfig) -> Result<Vec<Target>> {
    if let Some(input) = &args.input {
        return Ok(vec![Target::from_input(input)]);
    }
    if let Some((name, schema)) = cfg.schema(args.schema.as_deref()) {
        return Ok(vec![Target::configured(name, schema)]);
    }
    if let Some(name) = &args.schema {
        anyhow::bail!("schema `{name}` is not configured");
    }
    if cfg.schemas.is_empty() {
        anyhow::bail!("no input given and no schemas configured; pass --input or run `apiorm init`");
    }
    Ok(cfg
        .schemas
        .iter()
        .map(|(name, schema)| Target::configured(name, schema))
        .collect())
}

fn single_target(args: &TargetArgs, cfg: &ApiOrmConfig) -> Result<Target> {
    let mut all = targets(args, cfg)?;
    if all.len() != 1 {
        anyhow::bail!(
            "{} schemas are configured; pick one with --schema",
            all.len()
        );
    }
    Ok(all.remove(0))
}

fn print_value<T: serde::Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(value)?;
            print!("{}", yaml);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn cmd_validate(session: &mut Session, args: &TargetArgs) -> Result<()> {
    let mut failed = 0;
    for target in targets(args, &session.config)? {
        match session.parse(&target) {
            Ok(parsed) => {
                eprintln!(
                    "Valid OpenAPI {} document: {}",
                    parsed.spec.openapi,
                    parsed.title()
                );
                eprintln!("  Source: {}", parsed.source);
                eprintln!("  Version: {}", parsed.spec.info.version);
                eprintln!("  Paths: {}", parsed.spec.paths.len());
                eprintln!("  Schemas: {}", parsed.graph.len());
                eprintln!("  Endpoints: {}", parsed.endpoints.len());
                eprintln!("  Models: {}", parsed.models.len());
                let schemes = parsed.spec.security_schemes();
                if !schemes.is_empty() {
                    eprintln!("  Security schemes: {}", schemes.join(", "));
                }
            }
            Err(err) => {
                eprintln!("{}: {err:#}", target.name);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} document(s) failed validation");
    }
    eprintln!("Validation successful.");
    Ok(())
}

fn cmd_inspect(
    session: &mut Session,
    args: &TargetArgs,
    format: OutputFormat,
    section: Section,
) -> Result<()> {
    let target = single_target(args, &session.config)?;
    let parsed = session.parse(&target)?;
    let summary = build_inspect_summary(&parsed, section)?;
    print_value(&summary, format)
}

fn build_inspect_summary(parsed: &ParsedSchema, section: Section) -> Result<serde_json::Value> {
    let wants = |s: Section| section == Section::All || section == s;
    let mut summary = serde_json::Map::new();

    if section == Section::All {
        summary.insert(
            "info".to_string(),
            serde_json::json!({
                "title": parsed.title(),
                "version": parsed.spec.info.version,
                "openapi": parsed.spec.openapi,
                "baseUrl": parsed.base_url(),
                "securitySchemes": parsed.spec.security_schemes(),
                "hash": parsed.hash,
            }),
        );
    }
    if wants(Section::Models) {
        summary.insert("models".to_string(), serde_json::to_value(&parsed.models)?);
    }
    if wants(Section::Endpoints) {
        summary.insert(
            "endpoints".to_string(),
            serde_json::to_value(&parsed.endpoints)?,
        );
    }
    if wants(Section::Schemas) {
        let schemas: IndexMap<&str, _> = parsed
            .graph
            .iter()
            .map(|(_, schema)| (schema.key.as_str(), &schema.node))
            .collect();
        summary.insert("schemas".to_string(), serde_json::to_value(&schemas)?);
    }
    Ok(serde_json::Value::Object(summary))
}

fn cmd_rules(
    session: &mut Session,
    args: &TargetArgs,
    model: Option<&str>,
    component: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let target = single_target(args, &session.config)?;
    let parsed = session.parse(&target)?;

    let mut rules: IndexMap<String, ValidationRuleSet> = IndexMap::new();
    if let Some(component) = component {
        let set = parsed
            .schema_rules(component)
            .with_context(|| format!("no component schema named {component}"))?;
        rules.insert(component.to_string(), set);
    } else if let Some(model) = model {
        rules.insert(model.to_string(), parsed.rules_for(model)?);
    } else {
        for name in parsed.models.names() {
            rules.insert(name.to_string(), parsed.rules_for(name)?);
        }
    }
    print_value(&rules, format)
}

fn cmd_generate(
    session: &mut Session,
    args: &TargetArgs,
    model: Option<&str>,
    output: Option<PathBuf>,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let all = match model {
        Some(_) => vec![single_target(args, &session.config)?],
        None => targets(args, &session.config)?,
    };
    let generator_config = session.config.generator.clone();
    let output_dir =
        output.unwrap_or_else(|| PathBuf::from(&generator_config.output_directory));
    let overwrite = force || generator_config.overwrite_existing;

    for target in all {
        if !target.generate {
            eprintln!("Skipping {} (generation disabled)", target.name);
            continue;
        }
        let parsed = session.parse(&target)?;

        let mut generator = ModelGenerator::new().with_base_url(target.base_url.clone());
        if let Some(model) = model {
            generator = generator.only(model);
        }
        let files = generator
            .generate(&parsed, &generator_config)
            .with_context(|| format!("failed to generate models for {}", target.name))?;
        let plan = plan_writes(&files, &output_dir, overwrite, &|path: &Path| path.exists())?;

        eprintln!("Generating {} → {}", target.name, output_dir.display());
        for write in &plan {
            if dry_run {
                eprintln!("  would write {}", write.path.display());
                continue;
            }
            if let Some(parent) = write.path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
            }
            fs::write(&write.path, &write.content)
                .with_context(|| format!("failed to write {}", write.path.display()))?;
            let verb = if write.replaces { "replaced" } else { "wrote" };
            eprintln!("  {verb} {}", write.path.display());
        }
        eprintln!("Generated {} files for {}", plan.len(), target.name);
    }
    Ok(())
}

fn cmd_versions(session: &mut Session, command: VersionCommands) -> Result<()> {
    let versioning = session.config.versioning.clone();
    let store = VersionStore::new(&versioning.storage_root);

    match command {
        VersionCommands::Store {
            target,
            name,
            always,
        } => {
            let target = single_target(&target, &session.config)?;
            let name = name.unwrap_or_else(|| target.name.clone());
            let doc = session
                .pipeline
                .load(&target.source)
                .with_context(|| format!("failed to load {}", target.source))?;
            session
                .pipeline
                .process(&doc)
                .with_context(|| format!("refusing to store invalid document {}", target.source))?;

            let stored = if always {
                Some(store.store(&name, &doc.value)?)
            } else {
                store.store_if_changed(&name, &doc.value, versioning.strategy)?
            };
            match stored {
                Some(meta) => eprintln!(
                    "Stored {} version {} ({} bytes)",
                    meta.schema_name, meta.version, meta.size
                ),
                None => eprintln!("{name} is unchanged; nothing stored"),
            }
        }

        VersionCommands::List { schema } => {
            let versions = store.list(&schema)?;
            if versions.is_empty() {
                eprintln!("No stored versions of {schema}");
            }
            for meta in versions {
                println!(
                    "{}  {}  {:>8}  {}",
                    meta.version,
                    meta.created_at.to_rfc3339(),
                    meta.size,
                    meta.hash.get(..12).unwrap_or(meta.hash.as_str())
                );
            }
        }

        VersionCommands::Diff {
            schema,
            from,
            to,
            strategy,
        } => {
            let (from, to) = match (from, to) {
                (Some(from), Some(to)) => (from, to),
                (from, _) => {
                    let versions = store.list(&schema)?;
                    let [.., previous, latest] = versions.as_slice() else {
                        anyhow::bail!("{schema} has fewer than two stored versions");
                    };
                    (
                        from.unwrap_or_else(|| previous.version.clone()),
                        latest.version.clone(),
                    )
                }
            };
            let strategy = strategy.map(Into::into).unwrap_or(versioning.strategy);
            let diff = store.compare(&schema, &from, &to, strategy)?;
            print_value(&diff, OutputFormat::Yaml)?;
        }

        VersionCommands::Prune { schema, keep } => {
            let removed = store.prune(&schema, keep.unwrap_or(versioning.keep))?;
            for version in &removed {
                eprintln!("  removed {version}");
            }
            eprintln!("Pruned {} versions of {schema}", removed.len());
        }
    }
    Ok(())
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(config_path, config::default_config_content())
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_name() {
        assert_eq!(source_name(&Source::parse("specs/petstore.yaml")), "petstore");
        assert_eq!(
            source_name(&Source::parse("https://api.example.com/v1/openapi.json?x=1")),
            "openapi"
        );
        assert_eq!(source_name(&Source::parse("https://api.example.com/")), "api");
    }

    #[test]
    fn test_targets_prefer_input_then_config() {
        let cfg: ApiOrmConfig = serde_yaml_ng::from_str(
            r#"
schemas:
  shop:
    source: shop.yaml
  billing:
    source: https://billing.example.com/openapi.json
    generation:
      enabled: false
"#,
        )
        .unwrap();

        let input = TargetArgs {
            input: Some("local.yaml".to_string()),
            schema: None,
        };
        let found = targets(&input, &cfg).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "local");

        let named = TargetArgs {
            input: None,
            schema: Some("billing".to_string()),
        };
        let found = single_target(&named, &cfg).unwrap();
        assert!(!found.generate);
        assert!(matches!(found.source, Source::Url(_)));

        let none = TargetArgs {
            input: None,
            schema: None,
        };
        assert_eq!(targets(&none, &cfg).unwrap().len(), 2);
        assert!(single_target(&none, &cfg).is_err());

        let missing = TargetArgs {
            input: None,
            schema: Some("nope".to_string()),
        };
        assert!(targets(&missing, &cfg).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "apiorm", "generate", "-s", "shop", "-m", "Pet", "--force", "--dry-run",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Generate { force: true, dry_run: true, .. }
        ));

        let cli = Cli::try_parse_from(["apiorm", "versions", "diff", "shop", "--strategy", "content"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Versions {
                command: VersionCommands::Diff { .. }
            }
        ));

        assert!(Cli::try_parse_from(["apiorm", "validate", "-i", "a.yaml", "-s", "shop"]).is_err());
    }
}
