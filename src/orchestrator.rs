//! The multi-phase pipeline driver.
//!
//! Phase order: research (with a bounded retry loop around metric
//! validation), code generation, Go environment setup, validation with a
//! bounded fix loop, test generation, persistence, test execution with
//! best-effort diagnosis, then dashboard and alert generation concurrently.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::agents::{
    AlertAgent, CodingAgent, DashboardAgent, ResearchAgent, TestingAgent, ValidationAgent,
};
use crate::config::{Config, Mode};
use crate::error::{
    CodeGenerationError, ConfigError, ForgeError, ResearchError, RunnerError, ValidationError,
};
use crate::llm::{AgentRole, LlmRouter};
use crate::metrics::validate_metrics;
use crate::runner::{CommandSpec, run_command};
use crate::types::{
    CodeArtifact, ResearchResult, RunResult, StructureAnalysis, ValidatedCodeArtifact,
};
use crate::workspace::{self, ALERTS_FILE, DASHBOARD_FILE, Workspace};

/// Research attempts before the last validation failure becomes fatal.
const RESEARCH_ATTEMPTS: u32 = 3;
/// Pause between research attempts.
const RESEARCH_RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct Orchestrator {
    config: Arc<Config>,
    workspace: Workspace,
    research: ResearchAgent,
    coding: CodingAgent,
    validation: ValidationAgent,
    testing: TestingAgent,
    dashboard: DashboardAgent,
    alerts: AlertAgent,
}

impl Orchestrator {
    /// Wire up all agents against the configured providers.
    pub fn new(config: Arc<Config>) -> Result<Self, ForgeError> {
        let router = LlmRouter::from_config(&config)?;
        Ok(Self::with_router(config, &router))
    }

    /// Agents built over an explicit backend router.
    pub fn with_router(config: Arc<Config>, router: &LlmRouter) -> Self {
        let workspace = Workspace::new(&config.output_dir);
        Self {
            research: ResearchAgent::new(router.backend(AgentRole::Research)),
            coding: CodingAgent::new(router.backend(AgentRole::Coding), config.markers.clone()),
            validation: ValidationAgent::new(workspace.clone(), config.toolchain.clone()),
            testing: TestingAgent::new(
                router.backend(AgentRole::Testing),
                workspace.clone(),
                config.toolchain.clone(),
            ),
            dashboard: DashboardAgent::new(router.backend(AgentRole::Dashboard)),
            alerts: AlertAgent::new(router.backend(AgentRole::Alert)),
            workspace,
            config,
        }
    }

    /// Run the full pipeline and return the result bundle.
    pub async fn run(&self) -> Result<RunResult, ForgeError> {
        let started_at = Utc::now();
        self.workspace.prepare()?;

        info!(
            target = %self.config.target,
            mode = %self.config.mode,
            output = %self.workspace.root().display(),
            "starting pipeline"
        );

        let research = self.research_phase().await?;
        info!(metrics = research.metrics.len(), "research complete");

        info!("generating exporter code");
        let artifact = self.coding.generate_exporter(&research).await?;
        info!(files = artifact.len(), "code generation complete");

        info!("initializing Go module and installing dependencies");
        self.setup_environment().await?;

        info!("validating generated code");
        let validated = self.validate_with_fixes(artifact).await?;

        info!("generating test files");
        let tests = self.coding.generate_tests().await?;

        let mut bundle = CodeArtifact::from_files(validated.files.clone());
        bundle.merge(tests);
        let mut written_files = self.workspace.write_artifact(&bundle.files)?;
        info!(files = written_files.len(), "sources written");

        info!("running tests");
        let test_result = self.testing.run_tests().await;
        if test_result.passed {
            info!("all tests passed");
        } else {
            let preview: String = test_result.output.chars().take(100).collect();
            warn!(output = %preview, "tests failed");
            if let Some(diagnosis) = self
                .testing
                .diagnose(&test_result.output, &code_for_prompt(&validated))
                .await
            {
                info!(%diagnosis, "test failure diagnosis");
            }
        }

        info!("generating dashboard and alert configurations");
        let (dashboard, alerts) = tokio::join!(
            self.dashboard.generate(&research.metrics),
            self.alerts.generate(&research.metrics),
        );
        let dashboard = dashboard?;
        let alerts = alerts?;

        written_files.push(self.workspace.write_text(DASHBOARD_FILE, &dashboard)?);
        written_files.push(self.workspace.write_text(ALERTS_FILE, &alerts)?);
        info!("dashboard and alert suggestions saved");

        Ok(RunResult {
            research,
            code: validated,
            test_result,
            dashboard,
            alerts,
            written_files,
            started_at,
            completed_at: Utc::now(),
        })
    }

    async fn research_phase(&self) -> Result<ResearchResult, ForgeError> {
        let existing = match self.config.mode {
            Mode::Create => None,
            Mode::Extend => {
                let path = self
                    .config
                    .exporter_path
                    .as_ref()
                    .ok_or(ForgeError::Config(ConfigError::MissingExporterPath))?;
                let sources = workspace::load_existing_sources(path);
                if sources.is_empty() {
                    return Err(ResearchError::NoExistingSources { path: path.clone() }.into());
                }
                let structure = workspace::analyze_structure(&sources, &self.config.markers);
                info!(files = sources.len(), "loaded existing exporter sources");
                Some((sources, structure))
            }
        };
        self.retry_research(existing).await
    }

    /// Bounded retry around metric-schema validation. Provider errors
    /// propagate immediately; the last validation failure is surfaced
    /// unchanged once the budget is spent.
    async fn retry_research(
        &self,
        existing: Option<(BTreeMap<String, String>, StructureAnalysis)>,
    ) -> Result<ResearchResult, ForgeError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let research = match &existing {
                Some((sources, structure)) => {
                    self.research
                        .research_with_existing_code(
                            &self.config.target,
                            sources.clone(),
                            structure.clone(),
                        )
                        .await?
                }
                None => self.research.research(&self.config.target).await?,
            };
            match validate_metrics(&research.metrics) {
                Ok(()) => return Ok(research),
                Err(e) => {
                    if attempt >= RESEARCH_ATTEMPTS {
                        error!(attempts = attempt, error = %e, "research never produced valid metrics");
                        return Err(e.into());
                    }
                    warn!(
                        attempt,
                        max = RESEARCH_ATTEMPTS,
                        error = %e,
                        "research validation failed, retrying"
                    );
                    tokio::time::sleep(RESEARCH_RETRY_DELAY).await;
                }
            }
        }
    }

    /// `go mod init`, the dependency fetches in parallel, then
    /// `go mod tidy`. Individual failures are logged and tolerated; only
    /// infrastructure faults (unlaunchable toolchain, lost tasks) abort.
    async fn setup_environment(&self) -> Result<(), ForgeError> {
        let toolchain = &self.config.toolchain;
        let root = self.workspace.root();

        let init = CommandSpec::new(&toolchain.go)
            .args(["mod", "init"])
            .arg(&toolchain.module_name)
            .cwd(root);
        match run_command(&init, toolchain.tool_timeout).await {
            Ok(output) if !output.success() => {
                warn!(output = %output.combined(), "go mod init failed");
            }
            Ok(_) => debug!(module = %toolchain.module_name, "go module initialized"),
            Err(e) => return Err(environment_error(e)),
        }

        let mut fetches = JoinSet::new();
        for dep in toolchain.deps.clone() {
            let spec = CommandSpec::new(&toolchain.go).arg("get").arg(&dep).cwd(root);
            let timeout = toolchain.dep_timeout;
            fetches.spawn(async move { (dep, run_command(&spec, timeout).await) });
        }
        while let Some(joined) = fetches.join_next().await {
            let (dep, result) = joined.map_err(|e| {
                ForgeError::from(CodeGenerationError::EnvironmentSetup {
                    reason: format!("dependency task failed: {e}"),
                })
            })?;
            match result {
                Ok(output) if output.success() => debug!(%dep, "installed dependency"),
                Ok(output) => {
                    warn!(%dep, output = %output.combined(), "failed to install dependency");
                }
                Err(RunnerError::Timeout { .. }) => warn!(%dep, "dependency fetch timed out"),
                Err(e @ RunnerError::Launch { .. }) => return Err(environment_error(e)),
            }
        }

        let tidy = CommandSpec::new(&toolchain.go).args(["mod", "tidy"]).cwd(root);
        match run_command(&tidy, toolchain.tool_timeout).await {
            Ok(output) if !output.success() => {
                warn!(output = %output.combined(), "go mod tidy failed");
            }
            Ok(_) => {}
            Err(e) => return Err(environment_error(e)),
        }
        Ok(())
    }

    /// Validate, then loop: ask the coding model to fix the reported errors
    /// and re-validate, up to the configured retry budget.
    async fn validate_with_fixes(
        &self,
        artifact: CodeArtifact,
    ) -> Result<ValidatedCodeArtifact, ForgeError> {
        let mut validated = self.validation.validate(&artifact).await?;
        let mut attempts = 0;
        while !validated.is_valid() && attempts < self.config.max_fix_retries {
            attempts += 1;
            warn!(
                errors = validated.validation_errors.len(),
                attempt = attempts,
                max = self.config.max_fix_retries,
                "validation failed, requesting fixes"
            );
            let code = code_for_prompt(&validated);
            let fixed = self
                .coding
                .fix_code(&validated.validation_errors, &code)
                .await?;
            validated = self.validation.validate(&fixed).await?;
        }
        if !validated.is_valid() {
            error!(attempts, "could not produce valid code");
            return Err(ValidationError::Unresolved { attempts }.into());
        }
        Ok(validated)
    }
}

/// The code text shown to the model: the formatter's output when available,
/// otherwise the raw files joined.
fn code_for_prompt(validated: &ValidatedCodeArtifact) -> String {
    match &validated.formatted_code {
        Some(code) => code.clone(),
        None => validated
            .files
            .values()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

fn environment_error(e: RunnerError) -> ForgeError {
    CodeGenerationError::EnvironmentSetup {
        reason: e.to_string(),
    }
    .into()
}
