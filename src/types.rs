//! Core data types flowing through the pipeline.
//!
//! These are value types: phases hand them along by reference or move, and
//! only the orchestrator holds run-level mutable state. File mappings use
//! `BTreeMap` so iteration order (prompt construction, validation sequence,
//! the formatted-code slot) is deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `status` value marking a metric proposed by extension-mode research.
pub const STATUS_NEW: &str = "new";
/// `status` value marking a metric already covered by the existing exporter.
pub const STATUS_EXISTING: &str = "existing";

/// One Prometheus metric as reported by the research phase.
///
/// `metric_type` stays a raw string here: the research response is untrusted
/// LLM output, and the validator (not the deserializer) is the gate that
/// rejects unknown types with a message naming the metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub metric_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Free-form provider-specific hints (API commands, dimensions, units).
    #[serde(flatten)]
    pub hints: BTreeMap<String, serde_json::Value>,
}

impl Metric {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        metric_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            metric_type: metric_type.into(),
            sample_value: None,
            status: None,
            hints: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Whether extension-mode code generation should cover this metric.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.status.as_deref() == Some(STATUS_NEW)
    }
}

/// The closed set of metric types the validator accepts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MetricType {
    Gauge,
    Counter,
    Histogram,
}

impl MetricType {
    /// Parse a raw `type` string, `None` when outside the allowed set.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::from_str(raw).ok()
    }
}

/// Facts derived from existing exporter sources in extension mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    /// First file containing the entry-point marker.
    pub main_file: Option<String>,
    /// Files registering Prometheus collectors.
    pub collector_files: Vec<String>,
    /// Package name declared by the entry file.
    pub package_name: Option<String>,
    /// Union of import paths across all files.
    pub imports: BTreeSet<String>,
}

/// Output of the research phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchResult {
    pub metrics: Vec<Metric>,
    /// Carried-over sources when operating in extension mode; empty otherwise.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub existing_code: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<StructureAnalysis>,
}

impl ResearchResult {
    #[must_use]
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self {
            metrics,
            existing_code: BTreeMap::new(),
            structure: None,
        }
    }

    /// Extension mode is signalled by carried-over sources.
    #[must_use]
    pub fn is_extension(&self) -> bool {
        !self.existing_code.is_empty()
    }
}

/// A mapping of relative file path to generated source text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub files: BTreeMap<String, String>,
}

impl CodeArtifact {
    #[must_use]
    pub fn from_files(files: BTreeMap<String, String>) -> Self {
        Self { files }
    }

    #[must_use]
    pub fn single(path: impl Into<String>, content: impl Into<String>) -> Self {
        let mut files = BTreeMap::new();
        files.insert(path.into(), content.into());
        Self { files }
    }

    /// Merge `other` over this artifact: matching paths are overwritten,
    /// untouched files survive.
    pub fn merge(&mut self, other: CodeArtifact) {
        self.files.extend(other.files);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }
}

/// A [`CodeArtifact`] after the external tool sequence has run over it.
///
/// `formatted_code` holds the re-read content of the last file processed
/// (tools like the formatter rewrite files in place). Terminal validity is an
/// empty `validation_errors` list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatedCodeArtifact {
    pub files: BTreeMap<String, String>,
    pub validation_errors: Vec<String>,
    pub formatted_code: Option<String>,
}

impl ValidatedCodeArtifact {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }
}

/// Outcome of the external test command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub passed: bool,
    /// Combined stdout/stderr, or the launch/timeout error text.
    pub output: String,
}

impl TestResult {
    #[must_use]
    pub fn passed(output: impl Into<String>) -> Self {
        Self {
            passed: true,
            output: output.into(),
        }
    }

    #[must_use]
    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            passed: false,
            output: output.into(),
        }
    }
}

/// Final bundle returned to the caller after a full pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub research: ResearchResult,
    pub code: ValidatedCodeArtifact,
    pub test_result: TestResult,
    pub dashboard: String,
    pub alerts: String,
    /// Absolute paths of every file persisted during the run.
    pub written_files: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_status_helpers() {
        let fresh = Metric::new("aws_connect_queue_length", "Calls waiting", "gauge");
        assert!(!fresh.is_new());

        let proposed = fresh.clone().with_status(STATUS_NEW);
        assert!(proposed.is_new());

        let existing = fresh.with_status(STATUS_EXISTING);
        assert!(!existing.is_new());
    }

    #[test]
    fn metric_type_parses_the_closed_set() {
        assert_eq!(MetricType::parse("gauge"), Some(MetricType::Gauge));
        assert_eq!(MetricType::parse("counter"), Some(MetricType::Counter));
        assert_eq!(MetricType::parse("histogram"), Some(MetricType::Histogram));
        assert_eq!(MetricType::parse("summary"), None);
        assert_eq!(MetricType::parse(""), None);
    }

    #[test]
    fn metric_deserializes_with_free_form_hints() {
        let raw = r#"{
            "name": "aws_connect_agents_online",
            "description": "Agents currently online",
            "type": "gauge",
            "sample_value": 42,
            "api_command": "DescribeAgentStatus"
        }"#;
        let metric: Metric = serde_json::from_str(raw).unwrap();
        assert_eq!(metric.name, "aws_connect_agents_online");
        assert_eq!(metric.metric_type, "gauge");
        assert_eq!(
            metric.hints.get("api_command"),
            Some(&serde_json::Value::String("DescribeAgentStatus".into()))
        );
    }

    #[test]
    fn artifact_merge_overwrites_by_path() {
        let mut base = CodeArtifact::from_files(BTreeMap::from([
            ("exporter.go".to_string(), "old".to_string()),
            ("cmd/main.go".to_string(), "main".to_string()),
        ]));
        base.merge(CodeArtifact::single("exporter.go", "new"));

        assert_eq!(base.len(), 2);
        assert_eq!(base.files["exporter.go"], "new");
        assert_eq!(base.files["cmd/main.go"], "main");
    }

    #[test]
    fn validated_artifact_validity() {
        let mut validated = ValidatedCodeArtifact::default();
        assert!(validated.is_valid());

        validated
            .validation_errors
            .push("Vet errors in exporter.go: bad".to_string());
        assert!(!validated.is_valid());
    }

    #[test]
    fn extension_mode_is_detected_from_existing_code() {
        let mut research = ResearchResult::new(vec![]);
        assert!(!research.is_extension());

        research
            .existing_code
            .insert("exporter.go".into(), "package main".into());
        assert!(research.is_extension());
    }
}
