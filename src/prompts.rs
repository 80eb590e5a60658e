//! Prompt construction for every LLM-facing phase.
//!
//! All functions are pure: inputs in, rendered prompt out. Metric lists are
//! passed pre-serialized so the callers control JSON rendering (compact for
//! code generation, pretty for dashboards and alerts).

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::types::StructureAnalysis;

/// Shared system prompt for all roles.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert Go developer specializing in \
     Prometheus exporters and AWS service integrations. You write idiomatic, production-quality \
     Go code and follow Prometheus metric naming conventions exactly. When asked for JSON you \
     respond with JSON only, no commentary.";

/// Characters of each existing file included in extension-research prompts.
const PREVIEW_LIMIT: usize = 600;

pub fn research(target: &str) -> String {
    format!(
        "Research the metrics a Prometheus exporter for {target} should expose.\n\
         \n\
         Respond with JSON only, in this shape:\n\
         {{\"metrics\": [{{\"name\": \"...\", \"description\": \"...\", \
         \"sample_value\": \"...\", \"type\": \"gauge\"}}]}}\n\
         \n\
         Rules:\n\
         - names match [a-zA-Z_:][a-zA-Z0-9_:]* and carry a prefix for the target system\n\
         - every metric has a non-empty description and a realistic sample_value\n\
         - type is one of: gauge, counter, histogram\n\
         - cover queue, agent and contact statistics relevant to {target}"
    )
}

/// Extension-mode research: report metrics already exported and propose new
/// ones, each tagged with a status field.
pub fn extension_research(
    target: &str,
    existing: &BTreeMap<String, String>,
    structure: &StructureAnalysis,
) -> String {
    let mut prompt = format!(
        "An exporter for {target} already exists. Identify the metrics it currently exposes \
         and propose additional metrics worth adding.\n\nStructure:\n{}",
        structure_summary(structure)
    );
    prompt.push_str("\nExisting sources (truncated):\n");
    for (path, content) in existing {
        let _ = writeln!(
            prompt,
            "--- {path} ---\n{}",
            truncate_chars(content, PREVIEW_LIMIT)
        );
    }
    prompt.push_str(
        "\nRespond with JSON only, in this shape:\n\
         {\"metrics\": [{\"name\": \"...\", \"description\": \"...\", \
         \"sample_value\": \"...\", \"type\": \"gauge\", \"status\": \"existing\"}]}\n\
         \n\
         Rules:\n\
         - status is \"existing\" for metrics already in the code, \"new\" for proposals\n\
         - names match [a-zA-Z_:][a-zA-Z0-9_:]*\n\
         - every metric has a non-empty description\n\
         - type is one of: gauge, counter, histogram",
    );
    prompt
}

pub fn generate_exporter(metrics_json: &str) -> String {
    format!(
        "Write a complete Go Prometheus exporter for these metrics:\n\
         \n\
         {metrics_json}\n\
         \n\
         Requirements:\n\
         - register collectors with github.com/prometheus/client_golang/prometheus and serve \
         /metrics with promhttp\n\
         - fetch live values from AWS Connect using github.com/aws/aws-sdk-go\n\
         - parse command-line flags with gopkg.in/alecthomas/kingpin.v2\n\
         - put the entry point in cmd/main.go and collectors in their own files\n\
         - emit each file as a fenced code block annotated with its relative path"
    )
}

pub fn extend_exporter(
    new_metrics_json: &str,
    structure: &StructureAnalysis,
    existing: &BTreeMap<String, String>,
) -> String {
    let mut prompt = format!(
        "Extend an existing Go Prometheus exporter with these new metrics:\n\
         \n\
         {new_metrics_json}\n\
         \n\
         Structure of the current code:\n{}",
        structure_summary(structure)
    );
    prompt.push_str("\nCurrent sources:\n");
    for (path, content) in existing {
        let _ = writeln!(prompt, "--- {path} ---\n{content}");
    }
    prompt.push_str(
        "\nAdd collectors for the new metrics, registering them alongside the existing ones. \
         Respond only with the files that change, each as a fenced code block annotated with \
         its relative path. Unchanged files must not appear in the response.",
    );
    prompt
}

pub fn generate_tests() -> String {
    "Write Go table-driven tests for the exporter you just generated. Cover collector \
     registration, metric name constants and the /metrics HTTP handler. Every test function \
     name starts with Test. Respond with a single test file."
        .to_string()
}

pub fn fix_code(errors: &[String], code: &str) -> String {
    let mut prompt = String::from("Fix the following validation errors:\n\n");
    for error in errors {
        let _ = writeln!(prompt, "- {error}");
    }
    let _ = write!(
        prompt,
        "\nCurrent code:\n\n{code}\n\nRespond with the corrected Go source only."
    );
    prompt
}

pub fn diagnose_failure(output: &str, code: &str) -> String {
    format!(
        "Tests failed with output: {output}\n\
         Analyze the test failures and suggest fixes for the following code:\n\
         {code}"
    )
}

pub fn dashboard(metrics_json: &str) -> String {
    format!(
        "Design a Grafana dashboard for the following Prometheus metrics:\n\
         \n\
         {metrics_json}\n\
         \n\
         Describe each panel with its title, PromQL query, visualization type and thresholds, \
         and suggest a row layout grouping related panels."
    )
}

pub fn alerts(metrics_json: &str) -> String {
    format!(
        "Suggest Prometheus alerting rules for the following metrics:\n\
         \n\
         {metrics_json}\n\
         \n\
         For each alert give the rule name, PromQL expression, for-duration, severity label \
         and a summary annotation. Format the result as a Prometheus rules file."
    )
}

fn structure_summary(structure: &StructureAnalysis) -> String {
    let mut summary = String::new();
    if let Some(main) = &structure.main_file {
        let _ = writeln!(summary, "entry point: {main}");
    }
    if let Some(package) = &structure.package_name {
        let _ = writeln!(summary, "package: {package}");
    }
    if !structure.collector_files.is_empty() {
        let _ = writeln!(
            summary,
            "collector files: {}",
            structure.collector_files.join(", ")
        );
    }
    if !structure.imports.is_empty() {
        let imports: Vec<&str> = structure.imports.iter().map(String::as_str).collect();
        let _ = writeln!(summary, "imports: {}", imports.join(", "));
    }
    summary
}

/// Truncate to at most `limit` characters, respecting char boundaries.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
