mod config;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;

use config::{CONFIG_FILE_NAME, JsgConfig, load_config};
use jsg_core::builder::TypeBuilder;
use jsg_core::pipeline::{BuildInput, GenerationSpecification, Pipeline};
use jsg_core::reference::JsonReference;
use jsg_core::resolver::{InlineSource, build_document_resolver};
use jsg_core::vocabulary::{Dialect, VocabularyRegistry};
use jsg_core::{CancellationToken, GeneratedArtifact};
use jsg_rust_models::RustModelsEmitter;

#[derive(Parser)]
#[command(name = "jsg", about = "JSON Schema to Rust model generator", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate model declarations from the project config
    Generate {
        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Inspect the resolved type graph of a schema document
    Inspect {
        /// Path to the schema file
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: InspectFormat,
    },

    /// Initialize a new jsg configuration
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

#[derive(Clone, ValueEnum)]
enum InspectFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { config } => cmd_generate(config),

        Commands::Inspect { input, format } => cmd_inspect(&input, format),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "jsg", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn cmd_generate(config_path: Option<PathBuf>) -> Result<()> {
    let path = config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let cfg = load_config(&path)
        .map_err(|e| anyhow::anyhow!(e))?
        .with_context(|| format!("no config found at {}; run `jsg init`", path.display()))?;

    let input = build_input(&cfg)?;
    let mut pipeline = Pipeline::with_default_dialects();
    let output = pipeline
        .run(&input, &RustModelsEmitter, &CancellationToken::new())
        .map_err(|e| anyhow::anyhow!(e))?;

    write_artifacts(Path::new(&cfg.output), &output.artifacts)?;
    log::info!("wrote {} artifact(s) to {}", output.artifacts.len(), cfg.output);

    if !output.diagnostics.is_empty() {
        for diagnostic in &output.diagnostics {
            log::error!("{diagnostic}");
        }
        bail!(
            "generation completed with {} diagnostic(s)",
            output.diagnostics.len()
        );
    }
    Ok(())
}

/// Assemble the pipeline input from the project config: schema files are
/// read here, at the host boundary, and handed to the core as inline text.
fn build_input(cfg: &JsgConfig) -> Result<BuildInput> {
    let mut sources = Vec::new();
    for entry in &cfg.sources {
        let text = fs::read_to_string(&entry.path)
            .with_context(|| format!("failed to read {}", entry.path.display()))?;
        sources.push(InlineSource::new(entry.key.clone(), text));
    }

    let specifications = cfg
        .targets
        .iter()
        .map(|target| GenerationSpecification {
            type_name: target.type_name.clone(),
            module: target.module.clone(),
            location: target.location.clone(),
            rebase_to_root: target.rebase_to_root,
        })
        .collect();

    Ok(BuildInput {
        sources,
        config: cfg.options.clone(),
        specifications,
    })
}

fn write_artifacts(output_dir: &Path, artifacts: &[GeneratedArtifact]) -> Result<()> {
    for artifact in artifacts {
        let path = output_dir.join(&artifact.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, &artifact.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::debug!("wrote {}", path.display());
    }
    Ok(())
}

#[derive(Serialize)]
struct NodeSummary {
    location: String,
    dialect: String,
    shape: String,
    edges: Vec<EdgeSummary>,
}

#[derive(Serialize)]
struct EdgeSummary {
    keyword: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    target: String,
}

fn cmd_inspect(input: &Path, format: InspectFormat) -> Result<()> {
    let text =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    let key = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("schema.json")
        .to_string();

    let (resolver, diagnostics) = build_document_resolver(&[InlineSource::new(key.clone(), text)]);
    if !diagnostics.is_empty() {
        for diagnostic in &diagnostics {
            log::error!("{diagnostic}");
        }
        bail!("{} is not a valid schema document", input.display());
    }

    let registry = VocabularyRegistry::with_default_dialects();
    let mut builder = TypeBuilder::new(&resolver, &registry);
    builder
        .add_type_declarations(
            &JsonReference::new(&key),
            Dialect::LATEST,
            false,
            &CancellationToken::new(),
        )
        .map_err(|e| anyhow::anyhow!(e))?;

    let graph = builder.graph();
    let summary: Vec<NodeSummary> = graph
        .iter()
        .map(|(_, node)| NodeSummary {
            location: node.location.to_string(),
            dialect: format!("{:?}", node.dialect),
            shape: format!("{:?}", node.shape),
            edges: node
                .edges
                .iter()
                .map(|edge| EdgeSummary {
                    keyword: edge.keyword.clone(),
                    label: edge.label.clone(),
                    target: graph.get(edge.target).location.to_string(),
                })
                .collect(),
        })
        .collect();

    let rendered = match format {
        InspectFormat::Yaml => serde_yaml_ng::to_string(&summary)?,
        InspectFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    println!("{rendered}");
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    fs::write(path, config::default_config_content())
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote {CONFIG_FILE_NAME}");
    Ok(())
}
