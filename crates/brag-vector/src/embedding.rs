//! Embedding client for generating vector representations
//!
//! Calls Amazon Titan text embedding models through the Bedrock runtime.
//! Failures surface from `try_embed`; the fail-soft `embed` provided by
//! [`EmbeddingClient`] turns them into empty vectors.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use brag_core::{
    BedrockConfig, BedrockRuntime, EmbeddingClient, EmbeddingVector, RagError, Result,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Titan Embedding Client
// ============================================================================

/// Bedrock Titan embedding client
pub struct TitanEmbedding {
    runtime: BedrockRuntime,
    model_id: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanEmbeddingRequest<'a> {
    input_text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitanEmbeddingResponse {
    embedding: Vec<f32>,
    #[serde(default)]
    input_text_token_count: Option<u32>,
}

impl TitanEmbedding {
    /// Create a new Titan embedding client
    pub fn new(runtime: BedrockRuntime, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        let dimension = match model_id.as_str() {
            "amazon.titan-embed-text-v1" => 1536,
            "amazon.titan-embed-text-v2:0" => 1024,
            "amazon.titan-embed-image-v1" => 1024,
            _ => 1536, // Default
        };

        Self {
            runtime,
            model_id,
            dimension,
        }
    }

    /// Create from config
    pub fn from_config(config: &BedrockConfig) -> Result<Self> {
        let runtime = BedrockRuntime::from_config(config)?;
        Ok(Self::new(runtime, config.embedding_model_id.clone()))
    }
}

#[async_trait]
impl EmbeddingClient for TitanEmbedding {
    async fn try_embed(&self, text: &str) -> Result<EmbeddingVector> {
        tracing::debug!(model = %self.model_id, "creating embedding");

        let body = serde_json::to_value(TitanEmbeddingRequest { input_text: text })?;
        let raw = self
            .runtime
            .invoke_model(&self.model_id, &body)
            .await
            .map_err(|e| RagError::EmbeddingError(format!("Embedding request failed: {e}")))?;

        let response: TitanEmbeddingResponse = serde_json::from_str(&raw).map_err(|e| {
            RagError::EmbeddingError(format!("Failed to parse embedding response: {e}"))
        })?;

        tracing::debug!(
            dimension = response.embedding.len(),
            tokens = ?response.input_text_token_count,
            "embedding created"
        );
        Ok(response.embedding)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an embedding client from config
pub fn create_embedding_client(config: &BedrockConfig) -> Result<Box<dyn EmbeddingClient>> {
    if config.embedding_model_id.starts_with("amazon.titan-embed") {
        Ok(Box::new(TitanEmbedding::from_config(config)?))
    } else {
        Err(RagError::UnsupportedModel(format!(
            "No embedding client for model {}",
            config.embedding_model_id
        )))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_titan_dimension() {
        let client = TitanEmbedding::new(BedrockRuntime::new("http://localhost"), "amazon.titan-embed-text-v1");
        assert_eq!(client.dimension(), 1536);

        let client = TitanEmbedding::new(BedrockRuntime::new("http://localhost"), "amazon.titan-embed-text-v2:0");
        assert_eq!(client.dimension(), 1024);
    }

    #[test]
    fn test_factory_rejects_unknown_model() {
        let config = BedrockConfig {
            embedding_model_id: "cohere.embed-english-v3".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_embedding_client(&config),
            Err(RagError::UnsupportedModel(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/model/amazon.titan-embed-text-v1/invoke"))
            .and(body_json(json!({"inputText": "What is Bedrock?"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embedding": [0.25, -0.5, 1.0],
                "inputTextTokenCount": 4
            })))
            .mount(&server)
            .await;

        let client = TitanEmbedding::new(BedrockRuntime::new(server.uri()), "amazon.titan-embed-text-v1");
        let embedding = client.embed("What is Bedrock?").await;

        assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_embed_provider_error_is_soft() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("ServiceUnavailable"))
            .mount(&server)
            .await;

        let client = TitanEmbedding::new(BedrockRuntime::new(server.uri()), "amazon.titan-embed-text-v1");

        assert!(client.try_embed("hello").await.is_err());
        assert!(client.embed("hello").await.is_empty());
    }

    #[tokio::test]
    async fn test_embed_malformed_response_is_soft() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
            .mount(&server)
            .await;

        let client = TitanEmbedding::new(BedrockRuntime::new(server.uri()), "amazon.titan-embed-text-v1");
        let texts = vec!["a".to_string(), "b".to_string()];
        let embeddings = client.embed_batch(&texts).await;

        assert_eq!(embeddings.len(), 2);
        assert!(embeddings.iter().all(|e| e.is_empty()));
    }
}
