//! Research phase: ask the research model for a metric catalogue.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ForgeError;
use crate::extraction::strip_code_fences;
use crate::llm::{AgentRole, ChatRequest, LlmBackend};
use crate::prompts;
use crate::types::{Metric, ResearchResult, StructureAnalysis};

/// Envelope the research prompts ask for: `{"metrics": [...]}`.
#[derive(Debug, Deserialize)]
struct MetricsEnvelope {
    #[serde(default)]
    metrics: Vec<Metric>,
}

pub struct ResearchAgent {
    backend: Arc<dyn LlmBackend>,
}

impl ResearchAgent {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    /// Propose metrics for a fresh exporter.
    pub async fn research(&self, target: &str) -> Result<ResearchResult, ForgeError> {
        let request = ChatRequest::from_prompts(
            AgentRole::Research,
            prompts::DEFAULT_SYSTEM_PROMPT,
            prompts::research(target),
        );
        let completion = self.backend.complete(request).await?;
        let metrics = parse_metrics(&completion.content);
        debug!(count = metrics.len(), "research proposed metrics");
        Ok(ResearchResult::new(metrics))
    }

    /// Catalogue an existing exporter and propose additions. The sources and
    /// the structure analysis travel with the result so later phases can
    /// merge against them.
    pub async fn research_with_existing_code(
        &self,
        target: &str,
        existing_code: BTreeMap<String, String>,
        structure: StructureAnalysis,
    ) -> Result<ResearchResult, ForgeError> {
        let request = ChatRequest::from_prompts(
            AgentRole::Research,
            prompts::DEFAULT_SYSTEM_PROMPT,
            prompts::extension_research(target, &existing_code, &structure),
        );
        let completion = self.backend.complete(request).await?;
        let metrics = parse_metrics(&completion.content);
        debug!(
            total = metrics.len(),
            new = metrics.iter().filter(|m| m.is_new()).count(),
            "extension research catalogued metrics"
        );
        Ok(ResearchResult {
            metrics,
            existing_code,
            structure: Some(structure),
        })
    }
}

/// Decode the metrics envelope, tolerating a code fence around it.
///
/// An undecodable response degrades to a placeholder metric instead of
/// failing the phase; the schema check downstream decides what is usable.
fn parse_metrics(response: &str) -> Vec<Metric> {
    let body = strip_code_fences(response);
    match serde_json::from_str::<MetricsEnvelope>(body) {
        Ok(envelope) => envelope.metrics,
        Err(e) => {
            warn!(error = %e, "research response was not valid JSON, using placeholder metric");
            placeholder_metrics()
        }
    }
}

fn placeholder_metrics() -> Vec<Metric> {
    let mut metric = Metric::new(
        "aws_connect_queue_length",
        "Number of calls waiting in queue",
        "gauge",
    );
    metric.sample_value = Some(serde_json::Value::String("10".to_string()));
    vec![metric]
}
