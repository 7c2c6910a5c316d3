use crate::engine::EngineCredential;
use async_trait::async_trait;
use memdemo_core::{DemoError, DemoResult};
use serde::Deserialize;

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Trait for computing text embeddings (vector representations).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute embeddings for a batch of texts, one vector per text.
    async fn embed_batch(&self, texts: &[&str]) -> DemoResult<Vec<Vec<f32>>>;

    /// Compute the embedding vector for a single text.
    async fn embed(&self, text: &str) -> DemoResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| DemoError::Engine("embedding API returned no vectors".to_string()))
    }

    /// Dimension of the embedding vectors produced by this provider.
    fn dimension(&self) -> usize;
}

/// Embedding provider backed by the OpenAI embeddings API.
///
/// Works with OpenAI or any provider implementing the same endpoint
/// via the credential's base URL override.
pub struct OpenAiEmbedding {
    credential: EngineCredential,
    model: String,
    dimension: usize,
    http: reqwest::Client,
}

impl OpenAiEmbedding {
    /// Creates a provider using `text-embedding-3-small` (1536 dims).
    pub fn new(credential: EngineCredential) -> Self {
        Self {
            credential,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            http: reqwest::Client::new(),
        }
    }

    /// Overrides the embedding model and its output dimension.
    pub fn with_model(mut self, model: impl Into<String>, dimension: usize) -> Self {
        self.model = model.into();
        self.dimension = dimension;
        self
    }

    fn endpoint(&self) -> String {
        let base = self
            .credential
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_BASE_URL);
        format!("{base}/v1/embeddings")
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed_batch(&self, texts: &[&str]) -> DemoResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(DemoError::InvalidRequest(
                "cannot embed an empty batch".to_string(),
            ));
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let resp = self
            .http
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.credential.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| DemoError::Engine(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DemoError::Engine(format!(
                "embeddings API returned {status}: {text}"
            )));
        }

        let parsed: EmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| DemoError::Engine(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(DemoError::Engine(format!(
                "embeddings API returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiEmbedding {
        let credential =
            EngineCredential::new("test-key").with_base_url(server.uri());
        OpenAiEmbedding::new(credential).with_model("test-embed", 3)
    }

    #[tokio::test]
    async fn test_embed_batch_parses_vectors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"embedding": [0.1, 0.2, 0.3]},
                    {"embedding": [0.4, 0.5, 0.6]},
                ]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let vectors = provider.embed_batch(&["hello", "world"]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(provider.dimension(), 3);
    }

    #[tokio::test]
    async fn test_embed_single_uses_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [1.0, 0.0, 0.0]}]
            })))
            .mount(&server)
            .await;

        let vector = provider_for(&server).embed("hello").await.unwrap();
        assert_eq!(vector, vec![1.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_embed_batch_api_error_is_engine_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .embed_batch(&["hello"])
            .await
            .unwrap_err();
        assert!(matches!(err, DemoError::Engine(_)));
    }

    #[tokio::test]
    async fn test_embed_batch_count_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.5]}]
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .embed_batch(&["a", "b"])
            .await
            .unwrap_err();
        assert!(matches!(err, DemoError::Engine(_)));
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let server = MockServer::start().await;
        let err = provider_for(&server).embed_batch(&[]).await.unwrap_err();
        assert!(matches!(err, DemoError::InvalidRequest(_)));
    }
}
