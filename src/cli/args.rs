//! CLI argument definitions and parsing structures.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{CliOverrides, Mode};

/// promforge - LLM-driven Prometheus exporter generator
#[derive(Parser)]
#[command(name = "promforge")]
#[command(about = "Generate, validate and extend Go Prometheus exporters with LLM agents")]
#[command(long_about = r#"
promforge drives a multi-phase pipeline: research the metrics a target service
should expose, generate a Go Prometheus exporter for them, validate the result
with the Go toolchain (formatting, vet, lint, security scan), ask the model to
fix what the tools report, generate tests, and finish with Grafana dashboard
and Prometheus alerting suggestions.

EXAMPLES:
  # Generate a fresh exporter into ./generated-exporter
  promforge run --target aws_connect_exporter

  # Extend an existing exporter with newly researched metrics
  promforge run --mode extend --exporter-path ./existing-exporter

  # Use an explicit config file and output directory
  promforge run --config promforge.toml --output-dir ./out

CONFIGURATION:
  Settings are loaded with precedence: CLI flags > config file > defaults.
  Without --config, promforge.toml in the working directory is used when
  present. Provider API keys come from environment variables (OPENAI_API_KEY,
  ANTHROPIC_API_KEY, or per-role overrides via [llm.roles.<role>] api_key_env).
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (default: ./promforge.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline (research → code → validate → test → monitor)
    ///
    /// EXAMPLES:
    ///   promforge run --target aws_connect_exporter
    ///   promforge run --mode extend --exporter-path ./existing --output-dir ./out
    Run(RunArgs),
}

/// Arguments for `promforge run`.
#[derive(Args)]
pub struct RunArgs {
    /// Target exporter name used in research and generation prompts
    #[arg(long)]
    pub target: Option<String>,

    /// Operating mode
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Existing exporter sources (required with --mode extend)
    #[arg(long)]
    pub exporter_path: Option<PathBuf>,

    /// Directory the generated exporter is written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Fix-loop attempts before validation errors become fatal
    #[arg(long)]
    pub max_fix_retries: Option<u32>,
}

impl RunArgs {
    /// Fold the run arguments and global flags into config overrides.
    #[must_use]
    pub fn overrides(&self, config: Option<PathBuf>, verbose: bool) -> CliOverrides {
        CliOverrides {
            config,
            target: self.target.clone(),
            mode: self.mode,
            exporter_path: self.exporter_path.clone(),
            output_dir: self.output_dir.clone(),
            max_fix_retries: self.max_fix_retries,
            verbose,
        }
    }
}
