//! promforge - LLM-driven Prometheus exporter pipeline
//!
//! This crate turns a target service name into a working Go Prometheus
//! exporter through a multi-phase agent pipeline: research the metrics worth
//! exposing, generate exporter code, validate it with the Go toolchain, loop
//! model-driven fixes over the reported errors, generate tests, and finish
//! with Grafana dashboard and Prometheus alerting suggestions.
//!
//! promforge can be used in two ways:
//! - **CLI**: `promforge run --target aws_connect_exporter`
//! - **Library**: construct a [`config::Config`], build an
//!   [`orchestrator::Orchestrator`] and await [`orchestrator::Orchestrator::run`]
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! promforge run --target aws_connect_exporter --output-dir ./generated-exporter
//! ```
//!
//! # Quick Start (Library)
//!
//! ```no_run
//! use std::sync::Arc;
//! use promforge::config::Config;
//! use promforge::orchestrator::Orchestrator;
//!
//! # async fn demo() -> Result<(), promforge::error::ForgeError> {
//! let config = Arc::new(Config::default());
//! let orchestrator = Orchestrator::new(config)?;
//! let result = orchestrator.run().await?;
//! println!("wrote {} files", result.written_files.len());
//! # Ok(())
//! # }
//! ```
//!
//! Providers are selected per agent role in the `[llm]` configuration
//! section; every role defaults to OpenAI and can be pointed at Anthropic
//! (or a compatible proxy via `base_url`) individually.

pub mod agents;
pub mod cli;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod extraction;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod prompts;
pub mod runner;
pub mod types;
pub mod workspace;

pub use config::{Config, Mode};
pub use error::ForgeError;
pub use orchestrator::Orchestrator;
pub use types::{Metric, ResearchResult, RunResult, TestResult};
