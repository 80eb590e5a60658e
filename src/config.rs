//! Configuration loading: CLI > `promforge.toml` > built-in defaults.
//!
//! The file model is all-optional; resolution merges it over defaults field
//! by field, then lets CLI flags win. Everything downstream sees only the
//! resolved [`Config`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::llm::{AgentRole, Provider};

/// File picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "promforge.toml";

/// Pipeline operating mode.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Generate a fresh exporter from researched metrics.
    Create,
    /// Add metrics to an existing exporter.
    Extend,
}

/// Values the CLI layer passes down; `None` means "not given on the
/// command line".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub target: Option<String>,
    pub mode: Option<Mode>,
    pub exporter_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub max_fix_retries: Option<u32>,
    pub verbose: bool,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub target: String,
    pub mode: Mode,
    pub exporter_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub max_fix_retries: u32,
    pub llm: LlmConfig,
    pub toolchain: ToolchainConfig,
    pub markers: MarkerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: "aws_connect_exporter".to_string(),
            mode: Mode::Create,
            exporter_path: None,
            output_dir: PathBuf::from("generated-exporter"),
            max_fix_retries: 3,
            llm: LlmConfig::default(),
            toolchain: ToolchainConfig::default(),
            markers: MarkerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with precedence CLI > file > defaults.
    ///
    /// An explicitly passed `--config` path must exist; the implicit
    /// `promforge.toml` in the working directory is optional.
    pub fn load(cli: &CliOverrides) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::Invalid {
            message: format!("cannot determine working directory: {e}"),
        })?;
        Self::load_from(&start_dir, cli)
    }

    /// Path-driven variant of [`Config::load`] that avoids process-global
    /// working-directory state.
    pub fn load_from(start_dir: &Path, cli: &CliOverrides) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => ConfigFile::read(path)?,
            None => {
                let implicit = start_dir.join(DEFAULT_CONFIG_FILE);
                if implicit.is_file() {
                    ConfigFile::read(&implicit)?
                } else {
                    ConfigFile::default()
                }
            }
        };
        Self::resolve(cli, file)
    }

    fn resolve(cli: &CliOverrides, file: ConfigFile) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(target) = file.target {
            config.target = target;
        }
        if let Some(mode) = file.mode {
            config.mode = mode;
        }
        config.exporter_path = file.exporter_path;
        if let Some(output_dir) = file.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(retries) = file.max_fix_retries {
            config.max_fix_retries = retries;
        }
        config.llm.apply(file.llm);
        config.toolchain.apply(file.toolchain);
        config.markers.apply(file.markers);

        if let Some(target) = &cli.target {
            config.target = target.clone();
        }
        if let Some(mode) = cli.mode {
            config.mode = mode;
        }
        if let Some(path) = &cli.exporter_path {
            config.exporter_path = Some(path.clone());
        }
        if let Some(dir) = &cli.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(retries) = cli.max_fix_retries {
            config.max_fix_retries = retries;
        }

        if config.mode == Mode::Extend && config.exporter_path.is_none() {
            return Err(ConfigError::MissingExporterPath);
        }
        if config.max_fix_retries == 0 {
            return Err(ConfigError::Invalid {
                message: "max_fix_retries must be at least 1".to_string(),
            });
        }
        if config.llm.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                message: "llm.request_timeout_secs must be at least 1".to_string(),
            });
        }

        Ok(config)
    }
}

/// Resolved `[llm]` section.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub request_timeout: Duration,
    pub cache: bool,
    pub default: RoleLlmConfig,
    roles: BTreeMap<AgentRole, RoleLlmFile>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(120),
            cache: true,
            default: RoleLlmConfig::default(),
            roles: BTreeMap::new(),
        }
    }
}

impl LlmConfig {
    /// Effective settings for one role: the default table with the role's
    /// overrides applied on top.
    #[must_use]
    pub fn for_role(&self, role: AgentRole) -> RoleLlmConfig {
        let mut resolved = self.default.clone();
        if let Some(overrides) = self.roles.get(&role) {
            apply_role_overrides(&mut resolved, overrides);
        }
        resolved
    }

    fn apply(&mut self, file: LlmFileSection) {
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(cache) = file.cache {
            self.cache = cache;
        }
        if let Some(default) = &file.default {
            apply_role_overrides(&mut self.default, default);
        }
        self.roles = file.roles;
    }
}

/// Provider/model settings a single role resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleLlmConfig {
    pub provider: Provider,
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
}

impl Default for RoleLlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            model: None,
            temperature: 0.0,
            max_tokens: 2048,
            api_key_env: None,
            base_url: None,
        }
    }
}

fn apply_role_overrides(resolved: &mut RoleLlmConfig, overrides: &RoleLlmFile) {
    if let Some(provider) = overrides.provider {
        resolved.provider = provider;
    }
    if let Some(model) = &overrides.model {
        resolved.model = Some(model.clone());
    }
    if let Some(temperature) = overrides.temperature {
        resolved.temperature = temperature;
    }
    if let Some(max_tokens) = overrides.max_tokens {
        resolved.max_tokens = max_tokens;
    }
    if let Some(api_key_env) = &overrides.api_key_env {
        resolved.api_key_env = Some(api_key_env.clone());
    }
    if let Some(base_url) = &overrides.base_url {
        resolved.base_url = Some(base_url.clone());
    }
}

/// One external tool: command plus fixed arguments. The file under check is
/// appended as the final argument where applicable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolSpec {
    pub fn new(command: impl Into<String>, args: &[&str]) -> Self {
        Self {
            command: command.into(),
            args: args.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Resolved `[toolchain]` section for the Go side of the pipeline.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    pub go: String,
    pub module_name: String,
    pub deps: Vec<String>,
    pub format: ToolSpec,
    pub vet: ToolSpec,
    pub lint: ToolSpec,
    pub security: ToolSpec,
    pub test: ToolSpec,
    pub tool_timeout: Duration,
    pub test_timeout: Duration,
    pub dep_timeout: Duration,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            go: "go".to_string(),
            module_name: "aws-connect-exporter".to_string(),
            deps: vec![
                "github.com/prometheus/client_golang/prometheus".to_string(),
                "github.com/prometheus/client_golang/prometheus/promhttp".to_string(),
                "github.com/aws/aws-sdk-go/aws".to_string(),
                "github.com/aws/aws-sdk-go/aws/session".to_string(),
                "github.com/aws/aws-sdk-go/service/connect".to_string(),
                "gopkg.in/alecthomas/kingpin.v2".to_string(),
            ],
            format: ToolSpec::new("gofmt", &["-w"]),
            vet: ToolSpec::new("go", &["vet"]),
            lint: ToolSpec::new("golangci-lint", &["run"]),
            security: ToolSpec::new("gosec", &[]),
            test: ToolSpec::new("go", &["test", "./..."]),
            tool_timeout: Duration::from_secs(30),
            test_timeout: Duration::from_secs(60),
            dep_timeout: Duration::from_secs(120),
        }
    }
}

impl ToolchainConfig {
    fn apply(&mut self, file: ToolchainFileSection) {
        if let Some(go) = file.go {
            self.go = go;
        }
        if let Some(module_name) = file.module_name {
            self.module_name = module_name;
        }
        if let Some(deps) = file.deps {
            self.deps = deps;
        }
        if let Some(format) = file.format {
            self.format = format;
        }
        if let Some(vet) = file.vet {
            self.vet = vet;
        }
        if let Some(lint) = file.lint {
            self.lint = lint;
        }
        if let Some(security) = file.security {
            self.security = security;
        }
        if let Some(test) = file.test {
            self.test = test;
        }
        if let Some(secs) = file.tool_timeout_secs {
            self.tool_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.test_timeout_secs {
            self.test_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.dep_timeout_secs {
            self.dep_timeout = Duration::from_secs(secs);
        }
    }
}

/// Content markers and canonical paths used when classifying parsed code
/// blocks (`[markers]` section).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerConfig {
    pub entry_marker: String,
    pub test_marker: String,
    pub entry_file: String,
    pub test_file: String,
    pub default_file: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            entry_marker: "func main(".to_string(),
            test_marker: "func Test".to_string(),
            entry_file: "cmd/main.go".to_string(),
            test_file: "exporter_test.go".to_string(),
            default_file: "exporter.go".to_string(),
        }
    }
}

impl MarkerConfig {
    /// Canonical path for a code block without an explicit path annotation.
    #[must_use]
    pub fn classify(&self, content: &str) -> &str {
        if content.contains(&self.entry_marker) {
            &self.entry_file
        } else if content.contains(&self.test_marker) {
            &self.test_file
        } else {
            &self.default_file
        }
    }

    fn apply(&mut self, file: MarkerFileSection) {
        if let Some(entry_marker) = file.entry_marker {
            self.entry_marker = entry_marker;
        }
        if let Some(test_marker) = file.test_marker {
            self.test_marker = test_marker;
        }
        if let Some(entry_file) = file.entry_file {
            self.entry_file = entry_file;
        }
        if let Some(test_file) = file.test_file {
            self.test_file = test_file;
        }
        if let Some(default_file) = file.default_file {
            self.default_file = default_file;
        }
    }
}

/// On-disk TOML model. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    target: Option<String>,
    mode: Option<Mode>,
    exporter_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    max_fix_retries: Option<u32>,
    #[serde(default)]
    llm: LlmFileSection,
    #[serde(default)]
    toolchain: ToolchainFileSection,
    #[serde(default)]
    markers: MarkerFileSection,
}

impl ConfigFile {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LlmFileSection {
    request_timeout_secs: Option<u64>,
    cache: Option<bool>,
    default: Option<RoleLlmFile>,
    #[serde(default)]
    roles: BTreeMap<AgentRole, RoleLlmFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RoleLlmFile {
    provider: Option<Provider>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    api_key_env: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ToolchainFileSection {
    go: Option<String>,
    module_name: Option<String>,
    deps: Option<Vec<String>>,
    format: Option<ToolSpec>,
    vet: Option<ToolSpec>,
    lint: Option<ToolSpec>,
    security: Option<ToolSpec>,
    test: Option<ToolSpec>,
    tool_timeout_secs: Option<u64>,
    test_timeout_secs: Option<u64>,
    dep_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MarkerFileSection {
    entry_marker: Option<String>,
    test_marker: Option<String>,
    entry_file: Option<String>,
    test_file: Option<String>,
    default_file: Option<String>,
}
