//! OpenAI chat-completions backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LlmError;
use crate::llm::RequestParams;
use crate::llm::http_client::HttpClient;
use crate::llm::types::{ChatRequest, Completion, LlmBackend, Message};

const PROVIDER_NAME: &str = "openai";

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub(crate) struct OpenAiBackend {
    client: Arc<HttpClient>,
    endpoint: String,
    api_key: String,
    default_model: String,
    default_params: RequestParams,
    default_timeout: Duration,
}

impl OpenAiBackend {
    /// # Errors
    ///
    /// Returns [`LlmError::Misconfiguration`] if the HTTP client cannot be
    /// constructed. Key resolution happens in the backend factory, so
    /// `api_key` is already known to be non-empty here.
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
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key,
            default_model,
            default_params,
            default_timeout,
        })
    }

    /// Per-request overrides win over backend defaults.
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
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, request: ChatRequest) -> Result<Completion, LlmError> {
        let (model, params, timeout) = self.resolve_params(&request);

        debug!(
            provider = PROVIDER_NAME,
            role = %request.role,
            model = %model,
            max_tokens = params.max_tokens,
            temperature = params.temperature,
            "sending chat completion request"
        );

        let body = OpenAiRequest {
            model: &model,
            messages: &request.messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let builder = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body);

        let response = self
            .client
            .execute_with_retry(builder, timeout, PROVIDER_NAME)
            .await?;

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to parse OpenAI response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Transport("OpenAI response has no choices".to_string()))?;
        let content = choice.message.content.ok_or_else(|| {
            LlmError::Transport("OpenAI response choice has no content".to_string())
        })?;

        let (tokens_input, tokens_output) = match parsed.usage {
            Some(usage) => (Some(usage.prompt_tokens), Some(usage.completion_tokens)),
            None => (None, None),
        };

        debug!(
            provider = PROVIDER_NAME,
            tokens_input = ?tokens_input,
            tokens_output = ?tokens_output,
            "chat completion received"
        );

        Ok(Completion::new(content, PROVIDER_NAME, model).with_usage(tokens_input, tokens_output))
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
