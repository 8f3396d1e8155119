use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::GeneratorConfig;
use crate::examples::{example_spec, EXAMPLES};
use crate::extract::ExtractionHints;
use crate::generator::{write_project, WriteOptions};
use crate::service::{ApiGenerator, GenerationMode};
use crate::spec::{load_spec, to_spec_string, ApiSpec, SpecFormat};

/// Command-line interface for apiforge
///
/// Turns API specifications, or plain-language descriptions of an API, into
/// runnable service projects.
#[derive(Parser)]
#[command(name = "apiforge", version)]
#[command(about = "REST API project generator", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./apiforge.toml when present)
    #[arg(long, global = true, env = "APIFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List the built-in example specifications, or print one as JSON
    Examples {
        /// Example to print (e.g. user_management)
        #[arg(long)]
        name: Option<String>,
    },
    /// Load and validate a specification (JSON or YAML)
    Validate {
        #[arg(short, long)]
        spec: PathBuf,
    },
    /// Generate a project from a specification
    Generate {
        /// Path to the specification file (JSON or YAML)
        #[arg(short, long)]
        spec: PathBuf,

        /// Output directory for the generated files
        #[arg(short, long)]
        output: PathBuf,

        /// Overwrite existing files
        #[arg(short, long, default_value_t = false)]
        force: bool,

        /// Show what would be written without writing files
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Run the AI review pass before writing (needs an API key); same as `--mode ai_assisted`
        #[arg(long, default_value_t = false)]
        enhance: bool,

        /// How much the language model writes: template, ai_assisted or fully_ai
        #[arg(long, value_enum, default_value_t = GenerationMode::Template)]
        mode: GenerationMode,
    },
    /// Show whether the AI features are available
    Status,
    /// Derive a specification from a plain-language description (needs an API key)
    Describe {
        /// What the API should do
        text: String,

        /// Business domain, e.g. "e-commerce"
        #[arg(long)]
        domain: Option<String>,

        #[arg(long, value_enum, default_value_t = Complexity::Medium)]
        complexity: Complexity,

        /// Do not ask for authentication endpoints
        #[arg(long, default_value_t = false)]
        no_auth: bool,

        /// Ask for administrator endpoints
        #[arg(long, default_value_t = false)]
        admin: bool,

        /// Write the specification here (format from extension) instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// How elaborate an extracted API should be
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        }
    }
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration or a specification cannot be loaded
/// - A specification is invalid or its stack is unsupported
/// - The language model is unavailable for `describe`
/// - Output files cannot be written
pub async fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Examples { name } => run_examples(name.as_deref()),
        Commands::Validate { spec } => run_validate(&spec),
        Commands::Generate {
            spec,
            output,
            force,
            dry_run,
            enhance,
            mode,
        } => {
            let config = GeneratorConfig::load(cli.config.as_deref())?;
            let mode = if enhance && mode == GenerationMode::Template {
                GenerationMode::AiAssisted
            } else {
                mode
            };
            run_generate(config, &spec, &output, WriteOptions { force, dry_run }, mode).await
        }
        Commands::Status => {
            let config = GeneratorConfig::load(cli.config.as_deref())?;
            run_status(config)
        }
        Commands::Describe {
            text,
            domain,
            complexity,
            no_auth,
            admin,
            out,
        } => {
            let config = GeneratorConfig::load(cli.config.as_deref())?;
            let hints = ExtractionHints {
                domain,
                complexity: complexity.as_str().to_string(),
                include_auth: !no_auth,
                include_admin: admin,
            };
            run_describe(config, &text, &hints, out.as_deref()).await
        }
    }
}

fn run_examples(name: Option<&str>) -> anyhow::Result<()> {
    let Some(name) = name else {
        for example in EXAMPLES {
            let spec = example.load()?;
            println!(
                "{:<16} {} v{} ({}/{}/{}, {} endpoints)",
                example.slug,
                spec.name,
                spec.version,
                spec.framework,
                spec.database,
                spec.auth_method,
                spec.endpoints.len()
            );
        }
        return Ok(());
    };
    match example_spec(name)? {
        Some(spec) => {
            println!("{}", to_spec_string(&spec, SpecFormat::Json)?);
            Ok(())
        }
        None => {
            let known: Vec<&str> = EXAMPLES.iter().map(|e| e.slug).collect();
            bail!("Unknown example `{name}` (available: {})", known.join(", "))
        }
    }
}

fn run_validate(path: &Path) -> anyhow::Result<()> {
    let spec = load_spec(path)?;
    println!(
        "✅ {} v{}: {} endpoints ({}/{}/{})",
        spec.name,
        spec.version,
        spec.endpoints.len(),
        spec.framework,
        spec.database,
        spec.auth_method
    );
    Ok(())
}

async fn run_generate(
    config: GeneratorConfig,
    spec_path: &Path,
    output: &Path,
    options: WriteOptions,
    mode: GenerationMode,
) -> anyhow::Result<()> {
    let spec = load_spec(spec_path)?;
    let generator = ApiGenerator::from_config(config);
    let outcome = generator
        .generate_with_mode(&spec, mode)
        .await
        .with_context(|| format!("Failed to generate project from {}", spec_path.display()))?;

    if let Some(logic) = &outcome.logic {
        println!(
            "AI handlers: {} accepted, {} discarded",
            logic.accepted.len(),
            logic.discarded.len()
        );
        for discarded in &logic.discarded {
            println!("  - {}: {}", discarded.endpoint, discarded.reason);
        }
    }
    if let Some(report) = &outcome.review {
        let accepted: Vec<&str> = report.accepted.iter().map(|r| r.as_str()).collect();
        println!(
            "AI review: {} accepted [{}], {} discarded",
            accepted.len(),
            accepted.join(", "),
            report.discarded.len()
        );
        if let Some(score) = report.quality_score {
            println!("  quality score: {score}/100");
        }
        for recommendation in &report.recommendations {
            println!("  - {recommendation}");
        }
    }
    if let Some(reason) = &outcome.fallback {
        warn!(mode = %mode, reason = %reason, "AI stage skipped, writing earlier output");
        eprintln!("Warning: AI review skipped: {reason}");
    }

    let report = write_project(&outcome.artifacts, output, options)?;
    for path in &report.planned {
        println!("would write {}", path.display());
    }
    for path in &report.written {
        println!("wrote {}", path.display());
    }
    for path in &report.skipped {
        println!("skipped {} (exists, use --force)", path.display());
    }
    Ok(())
}

fn run_status(config: GeneratorConfig) -> anyhow::Result<()> {
    let status = ApiGenerator::from_config(config).ai_status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn run_describe(
    config: GeneratorConfig,
    text: &str,
    hints: &ExtractionHints,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        bail!("Description must not be empty");
    }
    let generator = ApiGenerator::from_config(config);
    let extracted = generator
        .generate_from_description_detailed(text, hints)
        .await
        .context("Failed to extract a specification")?;

    if !extracted.reasoning.is_empty() {
        eprintln!("Reasoning: {}", extracted.reasoning);
    }
    for suggestion in &extracted.suggestions {
        eprintln!("Suggestion: {suggestion}");
    }
    eprintln!("Confidence: {:.2}", extracted.confidence_score);

    write_spec(&extracted.spec, out)
}

fn write_spec(spec: &ApiSpec, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            let content = to_spec_string(spec, SpecFormat::from_path(path))?;
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => println!("{}", to_spec_string(spec, SpecFormat::Json)?),
    }
    Ok(())
}
