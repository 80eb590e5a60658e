//! Error taxonomy for the promforge pipeline.
//!
//! Every fallible path in the crate surfaces as a [`ForgeError`]. Phase-level
//! conditions get their own sub-enums so callers can match on the class of
//! failure (and so the CLI can map each class to a stable exit code, see
//! [`crate::exit_codes`]).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the pipeline.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Configuration could not be loaded or is invalid. Always pre-run.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A provider API key environment variable is unset or empty. Always
    /// pre-run; the pipeline never starts without keys for every configured
    /// provider.
    #[error(
        "{provider} API key missing: the {env_var} environment variable is not set. \
         Set it with: export {env_var}=your-api-key"
    )]
    ApiKey { provider: String, env_var: String },

    /// Research phase could not produce a usable starting point.
    #[error("research failed: {0}")]
    Research(#[from] ResearchError),

    /// Metric-schema violations and fix-loop exhaustion.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Code generation or environment setup infrastructure failure.
    #[error("code generation failed: {0}")]
    CodeGeneration(#[from] CodeGenerationError),

    /// Test-phase infrastructure faults. Ordinary test failures are data
    /// ([`crate::types::TestResult`]), not errors.
    #[error("testing failed: {0}")]
    Testing(#[from] TestingError),

    /// LLM provider/transport failure after the bounded retry budget.
    #[error("LLM provider error: {0}")]
    Llm(#[from] LlmError),

    /// Filesystem failure while persisting or reading run artifacts.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal failure (serialization, runtime startup).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ForgeError {
    /// Build an [`ForgeError::Io`] tagged with the offending path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Actionable hints printed under the error message by the CLI.
    #[must_use]
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Config(ConfigError::MissingExporterPath) => vec![
                "pass --exporter-path pointing at the existing exporter sources",
                "or switch to --mode create to generate a fresh exporter",
            ],
            Self::Config(_) => vec![
                "check promforge.toml for syntax errors and field names",
                "run with --verbose for the full configuration trace",
            ],
            Self::ApiKey { .. } => vec![
                "export the named environment variable before running",
                "per-role key variables can be overridden via [llm.roles.<role>] api_key_env",
            ],
            Self::Research(_) => vec![
                "confirm the --exporter-path directory contains .go source files",
            ],
            Self::Validation(ValidationError::Unresolved { .. }) => vec![
                "inspect the generated sources left in the output directory",
                "raise --max-fix-retries or adjust the [toolchain] commands",
            ],
            Self::Llm(LlmError::ProviderQuota(_)) => {
                vec!["the provider reported rate limiting; wait and re-run"]
            }
            Self::Llm(LlmError::ProviderAuth(_)) => {
                vec!["verify the API key is current and has access to the configured model"]
            }
            _ => Vec::new(),
        }
    }
}

impl From<serde_json::Error> for ForgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization failed: {err}"))
    }
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("{message}")]
    Invalid { message: String },

    #[error("extend mode requires an existing exporter path (--exporter-path)")]
    MissingExporterPath,
}

/// Research-phase failures that no retry can recover.
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("no valid Go files found in {path}")]
    NoExistingSources { path: PathBuf },
}

/// Metric-schema violations and fix-loop exhaustion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid metric name: {name}")]
    MetricName { name: String },

    #[error("metric {name} has no description")]
    MissingDescription { name: String },

    #[error("invalid metric type {metric_type:?} for {name}")]
    MetricType { name: String, metric_type: String },

    #[error("failed to produce valid code after {attempts} fix attempts")]
    Unresolved { attempts: u32 },
}

/// Environment-setup and artifact-persistence failures.
#[derive(Debug, Error)]
pub enum CodeGenerationError {
    #[error("environment setup failed: {reason}")]
    EnvironmentSetup { reason: String },

    #[error("refusing to write outside the output directory: {path}")]
    UnsafePath { path: String },
}

/// Test-phase infrastructure faults. Test command failures themselves are
/// reported through [`crate::types::TestResult`], never through this type.
#[derive(Debug, Error)]
pub enum TestingError {
    #[error("test harness failure: {reason}")]
    Harness { reason: String },
}

/// Provider/transport taxonomy for the LLM boundary.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider authentication failed: {0}")]
    ProviderAuth(String),

    #[error("provider quota exhausted: {0}")]
    ProviderQuota(String),

    #[error("provider outage: {0}")]
    ProviderOutage(String),

    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("LLM client misconfiguration: {0}")]
    Misconfiguration(String),
}

/// External-command execution failures.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("{program} timed out after {timeout_seconds}s")]
    Timeout {
        program: String,
        timeout_seconds: u64,
    },
}
