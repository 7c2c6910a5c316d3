use crate::engine::{EngineCredential, EngineFactory, MemoryEngine};
use async_trait::async_trait;
use memdemo_core::{DemoError, DemoResult, Dialogue};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Memory engine backed by the OpenAI chat completions API.
///
/// The bootstrap dialogues are rendered into a system prompt once at
/// construction; each `ask` is a single completion request grounded in
/// that context. Works with OpenAI or any OpenAI-compatible provider
/// via the credential's base URL override.
pub struct OpenAiChatEngine {
    credential: EngineCredential,
    model: String,
    system_prompt: String,
    http: reqwest::Client,
}

impl OpenAiChatEngine {
    fn new(credential: EngineCredential, model: String, dialogues: &[Dialogue]) -> Self {
        Self {
            credential,
            model,
            system_prompt: render_system_prompt(dialogues),
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        let base = self
            .credential
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_BASE_URL);
        format!("{base}/v1/chat/completions")
    }
}

fn render_system_prompt(dialogues: &[Dialogue]) -> String {
    let mut prompt = String::from(
        "You are a helpful assistant with memory of a prior conversation. \
         Answer questions using only the conversation below.\n\n",
    );
    for d in dialogues {
        prompt.push_str(&format!("[{}] {}: {}\n", d.dialogue_id, d.speaker, d.content));
    }
    prompt
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl MemoryEngine for OpenAiChatEngine {
    async fn ask(&self, message: &str) -> DemoResult<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": self.system_prompt},
                {"role": "user", "content": message},
            ],
        });

        let resp = self
            .http
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.credential.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| DemoError::Engine(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DemoError::Engine(format!(
                "chat API returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| DemoError::Engine(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DemoError::Engine("chat API returned no choices".to_string()))
    }

    async fn release(&self) {
        // Nothing external to tear down; the HTTP client drops with us.
        debug!(model = %self.model, "Released chat engine");
    }
}

/// Builds [`OpenAiChatEngine`] instances for new sessions.
pub struct OpenAiEngineFactory {
    model: String,
}

impl OpenAiEngineFactory {
    /// Creates a factory producing engines on the given chat model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl Default for OpenAiEngineFactory {
    fn default() -> Self {
        Self::new(DEFAULT_CHAT_MODEL)
    }
}

#[async_trait]
impl EngineFactory for OpenAiEngineFactory {
    async fn bootstrap(
        &self,
        credential: &EngineCredential,
        dialogues: Vec<Dialogue>,
    ) -> DemoResult<Arc<dyn MemoryEngine>> {
        if dialogues.is_empty() {
            return Err(DemoError::InvalidRequest(
                "context text produced no dialogues".to_string(),
            ));
        }
        debug!(dialogues = dialogues.len(), "Bootstrapping chat engine");
        Ok(Arc::new(OpenAiChatEngine::new(
            credential.clone(),
            self.model.clone(),
            &dialogues,
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn engine_for(server: &MockServer) -> Arc<dyn MemoryEngine> {
        let credential = EngineCredential::new("test-key").with_base_url(server.uri());
        OpenAiEngineFactory::new("test-model")
            .bootstrap(&credential, vec![Dialogue::new(1, "Alice", "I live in Lima")])
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ask_returns_completion_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "Alice lives in Lima."}}]
            })))
            .mount(&server)
            .await;

        let engine = engine_for(&server).await;
        let answer = engine.ask("Where does Alice live?").await.unwrap();
        assert_eq!(answer, "Alice lives in Lima.");
    }

    #[tokio::test]
    async fn test_ask_api_failure_is_engine_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let engine = engine_for(&server).await;
        let err = engine.ask("anything").await.unwrap_err();
        assert!(matches!(err, DemoError::Engine(_)));
    }

    #[tokio::test]
    async fn test_ask_empty_choices_is_engine_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&server)
            .await;

        let engine = engine_for(&server).await;
        assert!(engine.ask("anything").await.is_err());
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_empty_context() {
        let credential = EngineCredential::new("test-key");
        let err = OpenAiEngineFactory::default()
            .bootstrap(&credential, vec![])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DemoError::InvalidRequest(_)));
    }

    #[test]
    fn test_system_prompt_contains_dialogues() {
        let prompt = render_system_prompt(&[
            Dialogue::new(1, "Alice", "hello"),
            Dialogue::new(3, "Bob", "hi"),
        ]);
        assert!(prompt.contains("[1] Alice: hello"));
        assert!(prompt.contains("[3] Bob: hi"));
    }
}
