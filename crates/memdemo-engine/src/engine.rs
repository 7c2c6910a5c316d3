use async_trait::async_trait;
use memdemo_core::{DemoResult, Dialogue};
use std::sync::Arc;

/// Credential used to reach the LLM provider backing an engine.
#[derive(Clone)]
pub struct EngineCredential {
    /// Provider API key.
    pub api_key: String,
    /// Optional OpenAI-compatible base URL override.
    pub base_url: Option<String>,
}

impl EngineCredential {
    /// Creates a credential for the default provider endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
        }
    }

    /// Sets a custom OpenAI-compatible base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

// Keep the key out of logs.
impl std::fmt::Debug for EngineCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineCredential")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// A bootstrapped memory/retrieval engine instance.
///
/// One engine backs exactly one session; the session record owns the
/// handle and releases it when the session is removed.
#[async_trait]
pub trait MemoryEngine: Send + Sync {
    /// Answers a message against the engine's memory. Failures are
    /// surfaced to the caller and never consume a session turn.
    async fn ask(&self, message: &str) -> DemoResult<String>;

    /// Releases any resources held by the engine. Best-effort: this
    /// never fails observably.
    async fn release(&self);
}

/// Builds [`MemoryEngine`] instances from bootstrap context.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Bootstraps a fresh engine seeded with the given dialogues.
    ///
    /// Treated as atomic by the session core: on error no engine
    /// exists and nothing needs releasing.
    async fn bootstrap(
        &self,
        credential: &EngineCredential,
        dialogues: Vec<Dialogue>,
    ) -> DemoResult<Arc<dyn MemoryEngine>>;
}
