//! Anthropic messages-API backend.
//!
//! Anthropic takes the system prompt as a top-level `system` field rather
//! than as a message, so conversion splits system messages out and joins
//! them with blank lines.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LlmError;
use crate::llm::RequestParams;
use crate::llm::http_client::HttpClient;
use crate::llm::types::{ChatRequest, Completion, LlmBackend, Message, Role};

const PROVIDER_NAME: &str = "anthropic";

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

pub(crate) struct AnthropicBackend {
    client: Arc<HttpClient>,
    endpoint: String,
    api_key: String,
    default_model: String,
    default_params: RequestParams,
    default_timeout: Duration,
}

impl AnthropicBackend {
    /// # Errors
    ///
    /// Returns [`LlmError::Misconfiguration`] if the HTTP client cannot be
    /// constructed.
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        default_model: String,
        default_params: RequestParams,
        default_timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = HttpClient::new()?;
        let base = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client: Arc::new(client),
            endpoint: format!("{}/v1/messages", base.trim_end_matches('/')),
            api_key,
            default_model,
            default_params,
            default_timeout,
        })
    }

    fn resolve_params(&self, request: &ChatRequest) -> (String, RequestParams, Duration) {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let params = RequestParams {
            max_tokens: request.max_tokens.unwrap_or(self.default_params.max_tokens),
            temperature: request
                .temperature
                .unwrap_or(self.default_params.temperature),
        };
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        (model, params, timeout)
    }

    /// Split system messages out into the top-level `system` field.
    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<WireMessage<'_>>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut wire = Vec::new();

        for message in messages {
            match message.role {
                Role::System => system_parts.push(&message.content),
                Role::User => wire.push(WireMessage {
                    role: "user",
                    content: &message.content,
                }),
                Role::Assistant => wire.push(WireMessage {
                    role: "assistant",
                    content: &message.content,
                }),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, wire)
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn complete(&self, request: ChatRequest) -> Result<Completion, LlmError> {
        let (model, params, timeout) = self.resolve_params(&request);
        let (system, messages) = Self::convert_messages(&request.messages);

        debug!(
            provider = PROVIDER_NAME,
            role = %request.role,
            model = %model,
            max_tokens = params.max_tokens,
            "sending messages request"
        );

        let body = AnthropicRequest {
            model: &model,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system,
            messages,
        };

        let builder = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body);

        let response = self
            .client
            .execute_with_retry(builder, timeout, PROVIDER_NAME)
            .await?;

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to parse Anthropic response: {e}")))?;

        let content = parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| {
                LlmError::Transport("Anthropic response has no text content".to_string())
            })?;

        let (tokens_input, tokens_output) = match parsed.usage {
            Some(usage) => (Some(usage.input_tokens), Some(usage.output_tokens)),
            None => (None, None),
        };

        Ok(Completion::new(content, PROVIDER_NAME, model).with_usage(tokens_input, tokens_output))
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}
