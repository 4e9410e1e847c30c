//! Blueprint - architecture design generator CLI
//!
//! The `blueprint` command turns a requirement into architecture diagrams.
//!
//! ## Commands
//!
//! - `design`: Run the full design pipeline for a requirement
//! - `validate`: Check the mermaid diagrams in a file
//! - `extract`: Print the first diagram of a file as JSON
//! - `render`: Convert every diagram of a markdown file to images

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

use blueprint_core::domain::{DesignRequest, DiagramKind};
use blueprint_core::{
    extract, extract_all, DesignPipeline, DesignService, FileRequirementSource, LogFormat,
    MermaidRenderer, PipelineConfig, PromptCatalog, SyntaxValidator,
};
use blueprint_ledger::MarkdownExecutionLog;
use blueprint_llm::GeminiClient;

#[derive(Parser)]
#[command(name = "blueprint")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Architecture design and diagram generation from requirements", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an architecture design for a requirement
    Design {
        /// Requirement key (file stem under the requirements directory)
        #[arg(short, long, env = "BLUEPRINT_REQUIREMENT")]
        requirement: String,

        /// Directory holding <KEY>.json or <KEY>.md requirement files
        #[arg(long, env = "BLUEPRINT_REQUIREMENTS_DIR", default_value = "requirements")]
        requirements_dir: PathBuf,

        /// Cloud provider (aws or gcp)
        #[arg(short, long, env = "BLUEPRINT_PROVIDER", default_value = "aws")]
        provider: String,

        /// Extra context appended to every prompt
        #[arg(short, long)]
        context: Option<String>,

        /// Where the design document is written
        #[arg(long, env = "BLUEPRINT_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Where the execution log is written
        #[arg(long, env = "BLUEPRINT_LOG_DIR")]
        log_dir: Option<PathBuf>,

        /// Skip renderer detection and validate structurally
        #[arg(long)]
        no_renderer: bool,
    },

    /// Validate the mermaid diagrams in a file
    Validate {
        /// Markdown or .mmd file
        file: PathBuf,

        /// Skip renderer detection and validate structurally
        #[arg(long)]
        no_renderer: bool,
    },

    /// Extract the first mermaid diagram of a file as JSON
    Extract {
        /// File holding a model response or markdown document
        file: PathBuf,

        /// Diagram kind to tag the candidate with
        #[arg(short, long, default_value = "flowchart")]
        kind: DiagramKind,
    },

    /// Convert every mermaid diagram in a markdown file to an image
    Render {
        /// Markdown file containing mermaid diagrams
        file: PathBuf,

        /// Directory for the generated images
        #[arg(short, long, default_value = "./diagrams")]
        output_dir: PathBuf,

        /// Output image format
        #[arg(short, long, value_enum, default_value_t = ImageFormat::Png)]
        format: ImageFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    blueprint_core::init_tracing(LogFormat::from_json_flag(cli.json), level);

    let config = PipelineConfig::from_env();

    match cli.command {
        Commands::Design {
            requirement,
            requirements_dir,
            provider,
            context,
            output_dir,
            log_dir,
            no_renderer,
        } => {
            let mut config = config;
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(dir) = log_dir {
                config.log_dir = dir;
            }
            cmd_design(
                config,
                &requirement,
                &requirements_dir,
                &provider,
                context,
                no_renderer,
            )
            .await
        }
        Commands::Validate { file, no_renderer } => cmd_validate(&config, &file, no_renderer).await,
        Commands::Extract { file, kind } => cmd_extract(&file, kind),
        Commands::Render {
            file,
            output_dir,
            format,
        } => cmd_render(&config, &file, &output_dir, format).await,
    }
}

async fn validator_for(config: &PipelineConfig, no_renderer: bool) -> SyntaxValidator {
    if no_renderer {
        SyntaxValidator::structural_only()
    } else {
        SyntaxValidator::detect(config).await
    }
}

/// Run the design pipeline against Gemini and write the document.
async fn cmd_design(
    config: PipelineConfig,
    requirement: &str,
    requirements_dir: &Path,
    provider: &str,
    context: Option<String>,
    no_renderer: bool,
) -> Result<()> {
    let backend = GeminiClient::from_env().context("Failed to configure the Gemini client")?;
    let validator = validator_for(&config, no_renderer).await;
    info!(tier = ?validator.tier(), "Diagram validation ready");

    let log = Arc::new(MarkdownExecutionLog::new(&config.log_dir));
    let pipeline = DesignPipeline::new(
        Arc::new(backend),
        validator,
        log.clone(),
        PromptCatalog::builtin(),
        config,
    );
    let service = DesignService::new(
        pipeline,
        Arc::new(FileRequirementSource::new(requirements_dir)),
        log,
    );

    let mut request = DesignRequest::new(requirement, provider);
    if let Some(context) = context {
        request = request.with_context(context);
    }

    let response = service
        .generate(request)
        .await
        .with_context(|| format!("Design generation failed for {requirement}"))?;

    println!("Architecture design: {}", response.document_path.display());
    println!("Execution ID:        {}", response.execution_id);
    println!("Diagrams:            {}", response.diagrams.len());
    for (i, diagram) in response.diagrams.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, diagram.title, diagram.kind);
    }
    Ok(())
}

/// Validate every fenced diagram of `file`, or the whole file when it has none.
async fn cmd_validate(config: &PipelineConfig, file: &Path, no_renderer: bool) -> Result<()> {
    let text = read_input(file)?;
    let mut diagrams = extract_all(&text);
    if diagrams.is_empty() {
        diagrams.push(text.trim().to_string());
    }

    let validator = validator_for(config, no_renderer).await;
    let mut invalid = 0;
    for (i, code) in diagrams.iter().enumerate() {
        let result = validator.validate(code).await;
        if result.valid {
            println!("diagram {}: ok", i + 1);
        } else {
            invalid += 1;
            println!("diagram {}: invalid: {}", i + 1, result.error_text());
        }
    }

    if invalid > 0 {
        bail!("{} of {} diagrams failed validation", invalid, diagrams.len());
    }
    Ok(())
}

fn cmd_extract(file: &Path, kind: DiagramKind) -> Result<()> {
    let text = read_input(file)?;
    let Some(candidate) = extract(&text, kind) else {
        bail!("No mermaid diagram found in {}", file.display());
    };
    println!("{}", serde_json::to_string_pretty(&candidate)?);
    Ok(())
}

/// Render every diagram to `<stem>_diagram_<n>.<format>` in `output_dir`.
async fn cmd_render(
    config: &PipelineConfig,
    file: &Path,
    output_dir: &Path,
    format: ImageFormat,
) -> Result<()> {
    let text = read_input(file)?;
    let diagrams = extract_all(&text);
    if diagrams.is_empty() {
        bail!("No mermaid diagrams found in {}", file.display());
    }

    let renderer = MermaidRenderer::detect(&config.renderer_command, config.renderer_timeout())
        .await
        .with_context(|| {
            format!(
                "Mermaid renderer '{}' is not available (install @mermaid-js/mermaid-cli or set BLUEPRINT_RENDERER)",
                config.renderer_command
            )
        })?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("diagrams");
    let mut failed = 0;
    for (i, code) in diagrams.iter().enumerate() {
        let path = output_dir.join(image_name(stem, i + 1, format));
        match renderer.render_to(code, &path).await {
            Ok(()) => println!("{}", path.display()),
            Err(e) => {
                failed += 1;
                warn!(diagram = i + 1, error = %e, "Failed to render diagram");
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} diagrams failed to render", failed, diagrams.len());
    }
    Ok(())
}

fn image_name(stem: &str, index: usize, format: ImageFormat) -> String {
    format!("{stem}_diagram_{index}.{}", format.extension())
}

fn read_input(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}
