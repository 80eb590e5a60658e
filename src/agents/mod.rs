//! Phase agents: one per pipeline stage, each owning its prompt shapes and
//! response handling, all speaking to providers through [`crate::llm`].

mod coding;
mod monitors;
mod research;
mod testing;
mod validation;

pub use coding::CodingAgent;
pub use monitors::{AlertAgent, DashboardAgent};
pub use research::ResearchAgent;
pub use testing::TestingAgent;
pub use validation::ValidationAgent;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::error::LlmError;
    use crate::llm::{ChatRequest, Completion, LlmBackend, Role};

    /// Backend returning one canned response, recording every request.
    pub struct CannedBackend {
        content: String,
        pub calls: Mutex<Vec<ChatRequest>>,
    }

    impl CannedBackend {
        pub fn new(content: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                content: content.into(),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn last_request(&self) -> ChatRequest {
            self.calls
                .lock()
                .unwrap()
                .last()
                .cloned()
                .expect("no requests recorded")
        }

        pub fn last_user_prompt(&self) -> String {
            self.last_request()
                .messages
                .iter()
                .rev()
                .find(|m| matches!(m.role, Role::User))
                .map(|m| m.content.clone())
                .expect("no user message recorded")
        }
    }

    #[async_trait]
    impl LlmBackend for CannedBackend {
        async fn complete(&self, request: ChatRequest) -> Result<Completion, LlmError> {
            self.calls.lock().unwrap().push(request);
            Ok(Completion::new(self.content.clone(), "test", "test-model"))
        }
    }

    /// Backend that always fails with a provider outage.
    pub struct FailingBackend;

    #[async_trait]
    impl LlmBackend for FailingBackend {
        async fn complete(&self, _request: ChatRequest) -> Result<Completion, LlmError> {
            Err(LlmError::ProviderOutage("canned outage".to_string()))
        }
    }
}
