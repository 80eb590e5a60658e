//! Request and response types shared by every LLM backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The pipeline role a request is issued on behalf of.
///
/// Each role can be routed to a different provider and model through the
/// `[llm.roles]` configuration table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentRole {
    Research,
    Coding,
    Testing,
    Dashboard,
    Alert,
}

/// A provider-agnostic completion request.
///
/// `model`, `temperature`, `max_tokens` and `timeout` are per-request
/// overrides; `None` defers to the backend's configured defaults.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub role: AgentRole,
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<Duration>,
}

impl ChatRequest {
    pub fn new(role: AgentRole, messages: Vec<Message>) -> Self {
        Self {
            role,
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
            timeout: None,
        }
    }

    /// The common two-message shape: one system prompt, one user prompt.
    pub fn from_prompts(
        role: AgentRole,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self::new(role, vec![Message::system(system), Message::user(user)])
    }
}

/// A completed LLM response with provenance and token accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    pub provider: String,
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
}

impl Completion {
    pub fn new(
        content: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
        }
    }

    #[must_use]
    pub fn with_usage(mut self, tokens_input: Option<u64>, tokens_output: Option<u64>) -> Self {
        self.tokens_input = tokens_input;
        self.tokens_output = tokens_output;
        self
    }
}

/// A chat completion provider.
///
/// Implementations are cheap to clone behind `Arc` and safe to share across
/// the concurrent phases of a run.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<Completion, LlmError>;
}
