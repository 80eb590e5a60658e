//! Code generation: exporter sources, extension patches, tests and fixes.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::MarkerConfig;
use crate::error::ForgeError;
use crate::extraction::{parse_source_files, strip_code_fences};
use crate::llm::{AgentRole, ChatRequest, LlmBackend};
use crate::prompts;
use crate::types::{CodeArtifact, Metric, ResearchResult};

pub struct CodingAgent {
    backend: Arc<dyn LlmBackend>,
    markers: MarkerConfig,
}

impl CodingAgent {
    pub fn new(backend: Arc<dyn LlmBackend>, markers: MarkerConfig) -> Self {
        Self { backend, markers }
    }

    /// Generate exporter sources for the researched metrics.
    ///
    /// In extension mode the model only returns the files it changes; those
    /// are merged over the existing sources. Without any new metrics the
    /// existing sources pass through untouched and no model call is made.
    pub async fn generate_exporter(
        &self,
        research: &ResearchResult,
    ) -> Result<CodeArtifact, ForgeError> {
        if research.is_extension() {
            return self.extend_exporter(research).await;
        }

        let metrics_json = serde_json::to_string(&research.metrics)?;
        let request = ChatRequest::from_prompts(
            AgentRole::Coding,
            prompts::DEFAULT_SYSTEM_PROMPT,
            prompts::generate_exporter(&metrics_json),
        );
        let completion = self.backend.complete(request).await?;
        let artifact = self.artifact_from_response(&completion.content);
        debug!(files = artifact.len(), "generated exporter sources");
        Ok(artifact)
    }

    async fn extend_exporter(&self, research: &ResearchResult) -> Result<CodeArtifact, ForgeError> {
        let new_metrics: Vec<&Metric> = research.metrics.iter().filter(|m| m.is_new()).collect();
        if new_metrics.is_empty() {
            info!("no new metrics proposed, keeping existing sources unchanged");
            return Ok(CodeArtifact::from_files(research.existing_code.clone()));
        }

        let structure = research.structure.clone().unwrap_or_default();
        let metrics_json = serde_json::to_string(&new_metrics)?;
        let request = ChatRequest::from_prompts(
            AgentRole::Coding,
            prompts::DEFAULT_SYSTEM_PROMPT,
            prompts::extend_exporter(&metrics_json, &structure, &research.existing_code),
        );
        let completion = self.backend.complete(request).await?;
        let changed = self.artifact_from_response(&completion.content);

        let mut merged = CodeArtifact::from_files(research.existing_code.clone());
        merged.merge(changed);
        debug!(files = merged.len(), "merged extension sources");
        Ok(merged)
    }

    /// One test file in the configured test slot.
    pub async fn generate_tests(&self) -> Result<CodeArtifact, ForgeError> {
        let request = ChatRequest::from_prompts(
            AgentRole::Coding,
            prompts::DEFAULT_SYSTEM_PROMPT,
            prompts::generate_tests(),
        );
        let completion = self.backend.complete(request).await?;
        let body = strip_code_fences(&completion.content);
        Ok(CodeArtifact::single(self.markers.test_file.clone(), body))
    }

    /// One corrected source file in the default slot.
    pub async fn fix_code(
        &self,
        errors: &[String],
        code: &str,
    ) -> Result<CodeArtifact, ForgeError> {
        let request = ChatRequest::from_prompts(
            AgentRole::Coding,
            prompts::DEFAULT_SYSTEM_PROMPT,
            prompts::fix_code(errors, code),
        );
        let completion = self.backend.complete(request).await?;
        let body = strip_code_fences(&completion.content);
        Ok(CodeArtifact::single(self.markers.default_file.clone(), body))
    }

    /// Structured extraction first; a response with no recognizable file
    /// layout becomes one file classified by content.
    fn artifact_from_response(&self, response: &str) -> CodeArtifact {
        let mut files = parse_source_files(response, &self.markers);
        if files.is_empty() {
            let body = strip_code_fences(response);
            if !body.is_empty() {
                files.insert(self.markers.classify(body).to_string(), body.to_string());
            }
        }
        CodeArtifact::from_files(files)
    }
}
