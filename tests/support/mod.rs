//! Scripted LLM backend and configuration fixtures shared by the
//! integration suites.
//!
//! [`MockBackend`] answers each request by matching a needle phrase against
//! the user prompt, so one backend can play every pipeline role without the
//! tests depending on full prompt text.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use promforge::config::{Config, ToolSpec, ToolchainConfig};
use promforge::error::LlmError;
use promforge::llm::{AgentRole, ChatRequest, Completion, LlmBackend, Role};

pub const RESEARCH_NEEDLE: &str = "Research the metrics a Prometheus exporter";
pub const EXTENSION_RESEARCH_NEEDLE: &str = "already exists. Identify the metrics";
pub const GENERATE_NEEDLE: &str = "Write a complete Go Prometheus exporter";
pub const EXTEND_NEEDLE: &str = "Extend an existing Go Prometheus exporter";
pub const TESTS_NEEDLE: &str = "Write Go table-driven tests";
pub const FIX_NEEDLE: &str = "Fix the following validation errors:";
pub const DIAGNOSE_NEEDLE: &str = "Tests failed with output:";
pub const DASHBOARD_NEEDLE: &str = "Design a Grafana dashboard";
pub const ALERTS_NEEDLE: &str = "Suggest Prometheus alerting rules";

const RESEARCH_JSON: &str = r#"```json
{
  "metrics": [
    {
      "name": "aws_connect_queue_length",
      "description": "Number of calls waiting in queue",
      "type": "gauge",
      "sample_value": "10"
    },
    {
      "name": "aws_connect_agents_available",
      "description": "Agents available to take contacts",
      "type": "gauge",
      "sample_value": "4"
    }
  ]
}
```"#;

const EXTENSION_RESEARCH_JSON: &str = r#"{
  "metrics": [
    {
      "name": "aws_connect_queue_length",
      "description": "Number of calls waiting in queue",
      "type": "gauge",
      "status": "existing"
    },
    {
      "name": "aws_connect_missed_calls_total",
      "description": "Calls dropped before an agent answered",
      "type": "counter",
      "status": "new"
    }
  ]
}"#;

/// Extension research reporting nothing new to add.
pub const EXISTING_ONLY_RESEARCH_JSON: &str = r#"{
  "metrics": [
    {
      "name": "aws_connect_queue_length",
      "description": "Number of calls waiting in queue",
      "type": "gauge",
      "status": "existing"
    }
  ]
}"#;

const CODE_RESPONSE: &str = r#"Here is the exporter split into an entry point and a collector file.

```go cmd/main.go
package main

import (
	"net/http"

	"github.com/prometheus/client_golang/prometheus/promhttp"
)

func main() {
	http.Handle("/metrics", promhttp.Handler())
	http.ListenAndServe(":9100", nil)
}
```

```go collectors/queues.go
package collectors

import "github.com/prometheus/client_golang/prometheus"

var QueueLength = prometheus.NewGauge(prometheus.GaugeOpts{
	Name: "aws_connect_queue_length",
	Help: "Number of calls waiting in queue",
})
```
"#;

const EXTEND_RESPONSE: &str = r#"Added the missed-calls counter to the collector file.

```go collectors/queues.go
package collectors

import "github.com/prometheus/client_golang/prometheus"

var QueueLength = prometheus.NewGauge(prometheus.GaugeOpts{})

var MissedCalls = prometheus.NewCounter(prometheus.CounterOpts{
	Name: "aws_connect_missed_calls_total",
	Help: "Calls dropped before an agent answered",
})
```
"#;

const TESTS_RESPONSE: &str = r#"```go
package main

import "testing"

func TestQueueLengthGauge(t *testing.T) {
	t.Log("collector registered")
}
```"#;

const FIX_RESPONSE: &str = r#"```go
package main

func main() {}
```"#;

const DIAGNOSE_RESPONSE: &str =
    "The test file references a collector that is never registered; add it to init().";

pub const DASHBOARD_RESPONSE: &str =
    "Grafana dashboard: stat panel on aws_connect_queue_length, one gauge row per queue.";

pub const ALERTS_RESPONSE: &str = "\
groups:
- name: aws-connect
  rules:
  - alert: QueueBacklog
    expr: aws_connect_queue_length > 20
    for: 5m
";

struct Script {
    needle: &'static str,
    response: String,
    delay: Duration,
}

/// One backend invocation, recorded after any scripted delay. Push order in
/// the call log therefore reflects completion order.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub role: AgentRole,
    pub user_prompt: String,
    pub completed_at: Instant,
}

/// Backend double answering each request with the first script whose needle
/// occurs in the user prompt. An unmatched prompt panics, which keeps the
/// suites honest about which phases actually ran.
pub struct MockBackend {
    scripts: Vec<Script>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockBackend {
    /// Scripts covering every prompt of a full pipeline run.
    pub fn pipeline() -> Self {
        let scripts = [
            (EXTENSION_RESEARCH_NEEDLE, EXTENSION_RESEARCH_JSON),
            (RESEARCH_NEEDLE, RESEARCH_JSON),
            (GENERATE_NEEDLE, CODE_RESPONSE),
            (EXTEND_NEEDLE, EXTEND_RESPONSE),
            (TESTS_NEEDLE, TESTS_RESPONSE),
            (FIX_NEEDLE, FIX_RESPONSE),
            (DIAGNOSE_NEEDLE, DIAGNOSE_RESPONSE),
            (DASHBOARD_NEEDLE, DASHBOARD_RESPONSE),
            (ALERTS_NEEDLE, ALERTS_RESPONSE),
        ]
        .into_iter()
        .map(|(needle, response)| Script {
            needle,
            response: response.to_string(),
            delay: Duration::ZERO,
        })
        .collect();
        Self {
            scripts,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replace the canned response for one needle.
    #[must_use]
    pub fn with_response(mut self, needle: &'static str, response: &str) -> Self {
        match self.scripts.iter_mut().find(|s| s.needle == needle) {
            Some(script) => script.response = response.to_string(),
            None => self.scripts.insert(
                0,
                Script {
                    needle,
                    response: response.to_string(),
                    delay: Duration::ZERO,
                },
            ),
        }
        self
    }

    /// Delay the response for one needle, leaving its content untouched.
    #[must_use]
    pub fn with_delay(mut self, needle: &'static str, delay: Duration) -> Self {
        if let Some(script) = self.scripts.iter_mut().find(|s| s.needle == needle) {
            script.delay = delay;
        }
        self
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of requests whose user prompt contained `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.recorded()
            .iter()
            .filter(|call| call.user_prompt.contains(needle))
            .count()
    }

    /// The first recorded prompt containing `needle`.
    pub fn prompt_matching(&self, needle: &str) -> Option<String> {
        self.recorded()
            .into_iter()
            .find(|call| call.user_prompt.contains(needle))
            .map(|call| call.user_prompt)
    }

    /// Completion-order index of the first request matching `needle`.
    pub fn call_order(&self, needle: &str) -> Option<usize> {
        self.recorded()
            .iter()
            .position(|call| call.user_prompt.contains(needle))
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, request: ChatRequest) -> Result<Completion, LlmError> {
        let prompt = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let script = self
            .scripts
            .iter()
            .find(|s| prompt.contains(s.needle))
            .unwrap_or_else(|| {
                let head: String = prompt.chars().take(120).collect();
                panic!("no scripted response for prompt: {head}");
            });
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        self.calls.lock().unwrap().push(RecordedCall {
            role: request.role,
            user_prompt: prompt,
            completed_at: Instant::now(),
        });
        Ok(Completion::new(script.response.clone(), "mock", "mock-model"))
    }
}

/// Toolchain where every external command is the `true` binary, so the
/// format/vet/lint/security/test sequence always passes instantly.
pub fn passing_toolchain() -> ToolchainConfig {
    ToolchainConfig {
        go: "true".to_string(),
        deps: Vec::new(),
        format: ToolSpec::new("true", &[]),
        vet: ToolSpec::new("true", &[]),
        lint: ToolSpec::new("true", &[]),
        security: ToolSpec::new("true", &[]),
        test: ToolSpec::new("true", &[]),
        ..ToolchainConfig::default()
    }
}

/// A create-mode configuration writing into `root`.
pub fn test_config(root: &Path) -> Config {
    Config {
        output_dir: root.to_path_buf(),
        toolchain: passing_toolchain(),
        ..Config::default()
    }
}
