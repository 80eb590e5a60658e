//! In-memory response cache for LLM backends.
//!
//! Re-running a pipeline repeats most prompts verbatim (research retries,
//! unchanged generation inputs), so identical requests short-circuit to the
//! previous completion. Keyed on model override plus the full message list;
//! bounded by insertion-order eviction. The lock is only held for map access,
//! never across the inner await, so concurrent phases sharing one backend do
//! not serialize on the cache.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::error::LlmError;
use crate::llm::types::{ChatRequest, Completion, LlmBackend};

const MAX_ENTRIES: usize = 100;

struct CacheState {
    entries: HashMap<String, Completion>,
    order: VecDeque<String>,
}

/// Wraps any backend with request-level caching.
pub(crate) struct CachedBackend {
    inner: Arc<dyn LlmBackend>,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedBackend {
    pub fn new(inner: Arc<dyn LlmBackend>) -> Self {
        Self {
            inner,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Lifetime hit and miss counts.
    #[allow(dead_code)]
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    fn lookup(&self, key: &str) -> Option<Completion> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.get(key).cloned()
    }

    fn store(&self, key: String, completion: Completion) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.entries.insert(key.clone(), completion).is_none() {
            state.order.push_back(key);
        }
        while state.entries.len() > MAX_ENTRIES {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

fn cache_key(request: &ChatRequest) -> String {
    let mut key = String::new();
    if let Some(model) = &request.model {
        key.push_str(model);
    }
    key.push('\n');
    for message in &request.messages {
        let _ = writeln!(key, "{:?}:{}", message.role, message.content);
    }
    key
}

#[async_trait]
impl LlmBackend for CachedBackend {
    async fn complete(&self, request: ChatRequest) -> Result<Completion, LlmError> {
        let key = cache_key(&request);

        if let Some(cached) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(role = %request.role, "LLM cache hit");
            return Ok(cached);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let completion = self.inner.complete(request).await?;
        self.store(key, completion.clone());
        Ok(completion)
    }
}
