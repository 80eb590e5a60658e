//! Test execution and failure diagnosis.

use std::sync::Arc;

use tracing::warn;

use crate::config::ToolchainConfig;
use crate::llm::{AgentRole, ChatRequest, LlmBackend};
use crate::prompts;
use crate::runner::{CommandSpec, run_command};
use crate::types::TestResult;
use crate::workspace::Workspace;

pub struct TestingAgent {
    backend: Arc<dyn LlmBackend>,
    workspace: Workspace,
    toolchain: ToolchainConfig,
}

impl TestingAgent {
    pub fn new(backend: Arc<dyn LlmBackend>, workspace: Workspace, toolchain: ToolchainConfig) -> Self {
        Self {
            backend,
            workspace,
            toolchain,
        }
    }

    /// Run the configured test command in the workspace.
    ///
    /// Never fails the pipeline: launch errors and timeouts become failed
    /// results carrying the error text as output.
    pub async fn run_tests(&self) -> TestResult {
        let spec = CommandSpec::new(&self.toolchain.test.command)
            .args(&self.toolchain.test.args)
            .cwd(self.workspace.root());
        match run_command(&spec, self.toolchain.test_timeout).await {
            Ok(output) if output.success() => TestResult::passed(output.combined()),
            Ok(output) => TestResult::failed(output.combined()),
            Err(e) => TestResult::failed(e.to_string()),
        }
    }

    /// Ask the testing model why the tests failed. Best effort: provider
    /// errors surface as `None` and the pipeline continues either way.
    pub async fn diagnose(&self, output: &str, code: &str) -> Option<String> {
        let request = ChatRequest::from_prompts(
            AgentRole::Testing,
            prompts::DEFAULT_SYSTEM_PROMPT,
            prompts::diagnose_failure(output, code),
        );
        match self.backend.complete(request).await {
            Ok(completion) => Some(completion.content),
            Err(e) => {
                warn!(error = %e, "test failure diagnosis unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::{CannedBackend, FailingBackend};
    use crate::config::ToolSpec;

    fn agent_with(test: ToolSpec, backend: Arc<dyn LlmBackend>) -> (TestingAgent, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.prepare().unwrap();
        let toolchain = ToolchainConfig {
            test,
            ..ToolchainConfig::default()
        };
        (TestingAgent::new(backend, workspace, toolchain), dir)
    }

    #[tokio::test]
    async fn passing_command_yields_a_passed_result() {
        let (agent, _dir) = agent_with(ToolSpec::new("true", &[]), CannedBackend::new(""));
        let result = agent.run_tests().await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn failing_command_yields_output_not_error() {
        let (agent, _dir) = agent_with(ToolSpec::new("false", &[]), CannedBackend::new(""));
        let result = agent.run_tests().await;
        assert!(!result.passed);
    }

    #[tokio::test]
    async fn missing_test_binary_is_a_failed_result() {
        let (agent, _dir) = agent_with(
            ToolSpec::new("promforge-no-such-tool", &[]),
            CannedBackend::new(""),
        );
        let result = agent.run_tests().await;
        assert!(!result.passed);
        assert!(result.output.contains("failed to launch"));
    }

    #[tokio::test]
    async fn diagnose_returns_the_model_analysis() {
        let backend = CannedBackend::new("The collector is registered twice.");
        let (agent, _dir) = agent_with(ToolSpec::new("true", &[]), backend.clone());

        let diagnosis = agent
            .diagnose("--- FAIL: TestMetrics", "package main\n")
            .await;

        assert_eq!(
            diagnosis.as_deref(),
            Some("The collector is registered twice.")
        );
        let prompt = backend.last_user_prompt();
        assert!(prompt.starts_with("Tests failed with output: --- FAIL: TestMetrics"));
        assert!(prompt.contains("package main"));
    }

    #[tokio::test]
    async fn diagnose_swallows_provider_errors() {
        let (agent, _dir) = agent_with(ToolSpec::new("true", &[]), Arc::new(FailingBackend));
        let diagnosis = agent.diagnose("--- FAIL", "package main\n").await;
        assert!(diagnosis.is_none());
    }
}
