//! Dashboard and alert-rule generation.
//!
//! Both agents take the researched metrics and return free-form text the
//! orchestrator persists alongside the exporter. They run concurrently at
//! the end of a run.

use std::sync::Arc;

use crate::error::ForgeError;
use crate::llm::{AgentRole, ChatRequest, LlmBackend};
use crate::prompts;
use crate::types::Metric;

pub struct DashboardAgent {
    backend: Arc<dyn LlmBackend>,
}

impl DashboardAgent {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    pub async fn generate(&self, metrics: &[Metric]) -> Result<String, ForgeError> {
        let metrics_json = serde_json::to_string_pretty(metrics)?;
        let request = ChatRequest::from_prompts(
            AgentRole::Dashboard,
            prompts::DEFAULT_SYSTEM_PROMPT,
            prompts::dashboard(&metrics_json),
        );
        let completion = self.backend.complete(request).await?;
        Ok(completion.content)
    }
}

pub struct AlertAgent {
    backend: Arc<dyn LlmBackend>,
}

impl AlertAgent {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    pub async fn generate(&self, metrics: &[Metric]) -> Result<String, ForgeError> {
        let metrics_json = serde_json::to_string_pretty(metrics)?;
        let request = ChatRequest::from_prompts(
            AgentRole::Alert,
            prompts::DEFAULT_SYSTEM_PROMPT,
            prompts::alerts(&metrics_json),
        );
        let completion = self.backend.complete(request).await?;
        Ok(completion.content)
    }
}
