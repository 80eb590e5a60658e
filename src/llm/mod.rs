//! Provider selection and per-role routing for LLM backends.
//!
//! Each pipeline role (research, coding, testing, dashboard, alert) resolves
//! to a configured provider/model pair. Backends are constructed up front so
//! a missing API key fails the run before any phase starts.

mod anthropic;
mod cache;
mod http_client;
mod openai;
pub mod types;

pub use types::{AgentRole, ChatRequest, Completion, LlmBackend, Message, Role};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{Config, RoleLlmConfig};
use crate::error::ForgeError;
use anthropic::AnthropicBackend;
use cache::CachedBackend;
use openai::OpenAiBackend;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";

/// Supported chat-completion providers.
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
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    /// Environment variable consulted for the API key when the config does
    /// not name one.
    #[must_use]
    pub fn default_key_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_OPENAI_MODEL,
            Self::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        }
    }
}

/// Sampling parameters shared by the HTTP backends.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RequestParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RequestParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.0,
        }
    }
}

/// Resolve the API key for a role's provider from the environment.
fn resolve_api_key(role_cfg: &RoleLlmConfig) -> Result<String, ForgeError> {
    let env_var = role_cfg
        .api_key_env
        .clone()
        .unwrap_or_else(|| role_cfg.provider.default_key_env().to_string());
    match std::env::var(&env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ForgeError::ApiKey {
            provider: role_cfg.provider.to_string(),
            env_var,
        }),
    }
}

fn build_backend(
    role_cfg: &RoleLlmConfig,
    request_timeout: Duration,
    cache: bool,
) -> Result<Arc<dyn LlmBackend>, ForgeError> {
    let api_key = resolve_api_key(role_cfg)?;
    let model = role_cfg
        .model
        .clone()
        .unwrap_or_else(|| role_cfg.provider.default_model().to_string());
    let params = RequestParams {
        max_tokens: role_cfg.max_tokens,
        temperature: role_cfg.temperature,
    };

    let backend: Arc<dyn LlmBackend> = match role_cfg.provider {
        Provider::OpenAi => Arc::new(OpenAiBackend::new(
            api_key,
            role_cfg.base_url.clone(),
            model,
            params,
            request_timeout,
        )?),
        Provider::Anthropic => Arc::new(AnthropicBackend::new(
            api_key,
            role_cfg.base_url.clone(),
            model,
            params,
            request_timeout,
        )?),
    };

    Ok(if cache {
        Arc::new(CachedBackend::new(backend))
    } else {
        backend
    })
}

/// Maps each pipeline role to its configured backend.
pub struct LlmRouter {
    research: Arc<dyn LlmBackend>,
    coding: Arc<dyn LlmBackend>,
    testing: Arc<dyn LlmBackend>,
    dashboard: Arc<dyn LlmBackend>,
    alert: Arc<dyn LlmBackend>,
}

impl LlmRouter {
    /// Build one backend per role from the `[llm]` configuration.
    ///
    /// # Errors
    ///
    /// Fails with [`ForgeError::ApiKey`] when a required key variable is
    /// unset or blank, before any pipeline work starts.
    pub fn from_config(config: &Config) -> Result<Self, ForgeError> {
        let llm = &config.llm;
        let build = |role| build_backend(&llm.for_role(role), llm.request_timeout, llm.cache);
        Ok(Self {
            research: build(AgentRole::Research)?,
            coding: build(AgentRole::Coding)?,
            testing: build(AgentRole::Testing)?,
            dashboard: build(AgentRole::Dashboard)?,
            alert: build(AgentRole::Alert)?,
        })
    }

    /// Route every role to the same backend.
    #[must_use]
    pub fn uniform(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            research: Arc::clone(&backend),
            coding: Arc::clone(&backend),
            testing: Arc::clone(&backend),
            dashboard: Arc::clone(&backend),
            alert: backend,
        }
    }

    #[must_use]
    pub fn backend(&self, role: AgentRole) -> Arc<dyn LlmBackend> {
        match role {
            AgentRole::Research => Arc::clone(&self.research),
            AgentRole::Coding => Arc::clone(&self.coding),
            AgentRole::Testing => Arc::clone(&self.testing),
            AgentRole::Dashboard => Arc::clone(&self.dashboard),
            AgentRole::Alert => Arc::clone(&self.alert),
        }
    }
}
