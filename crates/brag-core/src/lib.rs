//! Bedrock RAG Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the service:
//! - Documents, indexed records and search results
//! - The error taxonomy shared by every pipeline stage
//! - Adapter traits for embedding, generation and vector storage
//! - Configuration management
//! - The Bedrock runtime invoker used by the model adapters
//!
//! Author: hephaex@gmail.com

pub mod bedrock;
pub mod config;

pub use bedrock::{BedrockRuntime, InvokeError};
pub use config::{
    AppConfig, BedrockConfig, ConfigError, LoggingConfig, OpenSearchAuth, OpenSearchConfig,
    RagConfig, ServerConfig,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Default generation budget when the caller does not override it
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Default sampling temperature when the caller does not override it
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

// ============================================================================
// Error Types
// ============================================================================

/// Error taxonomy for every pipeline stage
#[derive(Error, Debug)]
pub enum RagError {
    /// Client supplied a request the pipeline cannot serve
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Embedding provider failure. The embedding adapter absorbs these.
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    /// No wire format is registered for the configured model identifier
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(String),

    #[error("Generation error: {0}")]
    GenerationError(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Errors caused by the caller's input (HTTP 400)
    pub fn is_client_error(&self) -> bool {
        matches!(self, RagError::InvalidInput(_))
    }

    /// Errors caused by a remote dependency that may succeed on another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::VectorStoreError(_)
                | RagError::GenerationError(_)
                | RagError::EmbeddingError(_)
                | RagError::Timeout(_)
        )
    }
}

impl From<ConfigError> for RagError {
    fn from(err: ConfigError) -> Self {
        RagError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

// ============================================================================
// Documents and Records
// ============================================================================

/// Semantic embedding of a text. An empty vector means "no usable embedding".
pub type EmbeddingVector = Vec<f32>;

/// Freeform document metadata
pub type Metadata = Map<String, Value>;

/// A document supplied by the caller of the indexing pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Externally assigned unique identifier
    pub id: String,

    /// Text content used for embedding and prompt context
    #[serde(default)]
    pub content: String,

    /// Freeform metadata stored alongside the content
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a new document without metadata
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A document together with its embedding, as persisted in the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    #[serde(flatten)]
    pub document: Document,

    pub embedding: EmbeddingVector,
}

impl IndexedRecord {
    pub fn new(document: Document, embedding: EmbeddingVector) -> Self {
        Self {
            document,
            embedding,
        }
    }

    pub fn id(&self) -> &str {
        &self.document.id
    }

    /// Fail unless the embedding has exactly `expected` components
    pub fn check_dimension(&self, expected: usize) -> Result<()> {
        if self.embedding.len() == expected {
            Ok(())
        } else {
            Err(RagError::DimensionMismatch {
                expected,
                actual: self.embedding.len(),
            })
        }
    }

    /// Pair documents with their embeddings by position.
    ///
    /// Fails without producing any record when the counts differ.
    pub fn pair(documents: &[Document], embeddings: Vec<EmbeddingVector>) -> Result<Vec<Self>> {
        if documents.len() != embeddings.len() {
            return Err(RagError::InvalidInput(format!(
                "Number of documents ({}) and embeddings ({}) do not match",
                documents.len(),
                embeddings.len()
            )));
        }

        Ok(documents
            .iter()
            .cloned()
            .zip(embeddings)
            .map(|(document, embedding)| Self::new(document, embedding))
            .collect())
    }
}

// ============================================================================
// Search and Generation Types
// ============================================================================

/// A k-NN hit returned by the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,

    pub content: String,

    #[serde(default)]
    pub metadata: Metadata,

    /// Engine-defined similarity (higher is more similar, not normalized)
    pub score: f32,
}

/// Parameters for one generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,

    pub max_tokens: u32,

    pub temperature: f64,
}

impl GenerationRequest {
    /// Create a request with the default generation parameters
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Check `max_tokens > 0` and `temperature` in [0, 1]
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(RagError::InvalidInput(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(RagError::InvalidInput(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Per-item failure reported by a batch upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub id: String,
    pub reason: String,
}

/// Outcome of a batch upsert.
///
/// The store engine reports failures per item; `all_succeeded` reduces them
/// to the single flag callers branch on while keeping the list for logging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Records submitted in the batch
    pub attempted: usize,

    /// Records the store acknowledged
    pub written: usize,

    pub failures: Vec<ItemFailure>,
}

impl BatchOutcome {
    /// Every record was written
    pub fn success(attempted: usize) -> Self {
        Self {
            attempted,
            written: attempted,
            failures: Vec::new(),
        }
    }

    /// No record was written; every one fails with the same reason
    pub fn rejected(records: &[IndexedRecord], reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            attempted: records.len(),
            written: 0,
            failures: records
                .iter()
                .map(|r| ItemFailure {
                    id: r.id().to_string(),
                    reason: reason.clone(),
                })
                .collect(),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty() && self.written == self.attempted
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for embedding providers.
///
/// Implementors provide [`EmbeddingClient::try_embed`]; the provided
/// [`EmbeddingClient::embed`] applies the fail-soft policy so that a provider
/// error degrades to an empty vector instead of aborting the caller.
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed one text, surfacing provider failures
    async fn try_embed(&self, text: &str) -> Result<EmbeddingVector>;

    /// Model identifier used for logging
    fn model_id(&self) -> &str;

    /// Number of components in every embedding this model produces
    fn dimension(&self) -> usize;

    /// Embed one text; an empty vector signals "no usable embedding"
    async fn embed(&self, text: &str) -> EmbeddingVector {
        match self.try_embed(text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(model = self.model_id(), error = %e, "embedding failed, returning empty vector");
                Vec::new()
            }
        }
    }

    /// Embed texts sequentially; each item degrades independently
    async fn embed_batch(&self, texts: &[String]) -> Vec<EmbeddingVector> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await);
        }
        embeddings
    }
}

/// Fail at startup when the embedding model and the index disagree on vector size
pub fn check_embedding_dimension(
    embedder: &dyn EmbeddingClient,
    index_dimension: usize,
) -> Result<()> {
    if embedder.dimension() == index_dimension {
        Ok(())
    } else {
        Err(RagError::ConfigError(format!(
            "embedding model {} produces {} dimensions but the index expects {}",
            embedder.model_id(),
            embedder.dimension(),
            index_dimension
        )))
    }
}

/// Trait for generative model providers
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for the request.
    ///
    /// Configuration and transport failures are errors. A response that
    /// cannot be interpreted is returned as text describing the problem.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Trait for the vector index holding [`IndexedRecord`]s
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the index this store reads and writes
    fn index_name(&self) -> &str;

    /// Create the index if absent. Existing indexes are left untouched.
    async fn ensure_index(&self, name: &str) -> Result<()>;

    /// Insert or replace one record; `false` marks a non-fatal failure
    async fn upsert(&self, record: &IndexedRecord) -> bool;

    /// Insert or replace a batch of records
    async fn batch_upsert(&self, records: &[IndexedRecord]) -> BatchOutcome;

    /// Return at most `k` records most similar to `embedding`, best first.
    ///
    /// An absent index or an empty query vector yields no results.
    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchResult>>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyEmbedding;

    #[async_trait::async_trait]
    impl EmbeddingClient for FlakyEmbedding {
        async fn try_embed(&self, text: &str) -> Result<EmbeddingVector> {
            if text.contains("fail") {
                Err(RagError::EmbeddingError("provider unavailable".to_string()))
            } else {
                Ok(vec![text.len() as f32])
            }
        }

        fn model_id(&self) -> &str {
            "flaky"
        }

        fn dimension(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_embed_failure_is_soft() {
        let client = FlakyEmbedding;
        assert_eq!(tokio_test::block_on(client.embed("hello")), vec![5.0]);
        assert!(tokio_test::block_on(client.embed("please fail")).is_empty());
    }

    #[test]
    fn test_embed_batch_degrades_per_item() {
        let client = FlakyEmbedding;
        let texts = vec!["ab".to_string(), "fail".to_string(), "abc".to_string()];
        let embeddings = tokio_test::block_on(client.embed_batch(&texts));

        assert_eq!(embeddings.len(), 3);
        assert_eq!(embeddings[0], vec![2.0]);
        assert!(embeddings[1].is_empty());
        assert_eq!(embeddings[2], vec![3.0]);
    }

    #[test]
    fn test_embedding_dimension_must_match_index() {
        assert!(check_embedding_dimension(&FlakyEmbedding, 1).is_ok());

        let err = check_embedding_dimension(&FlakyEmbedding, 1536).unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
        assert!(err.to_string().contains("flaky produces 1 dimensions"));
    }

    #[test]
    fn test_pair_rejects_count_mismatch() {
        let docs = vec![Document::new("a", "x"), Document::new("b", "y")];
        let err = IndexedRecord::pair(&docs, vec![vec![0.1]]).unwrap_err();
        assert!(err.is_client_error());

        let records = IndexedRecord::pair(&docs, vec![vec![0.1], vec![0.2]]).unwrap();
        assert_eq!(records[1].id(), "b");
        assert_eq!(records[1].embedding, vec![0.2]);
    }

    #[test]
    fn test_check_dimension() {
        let record = IndexedRecord::new(Document::new("a", "x"), vec![0.0; 4]);
        assert!(record.check_dimension(4).is_ok());
        assert!(matches!(
            record.check_dimension(8),
            Err(RagError::DimensionMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_indexed_record_serializes_flat() {
        let record = IndexedRecord::new(
            Document::new("doc1", "hello").with_metadata("topic", "greeting"),
            vec![0.5],
        );
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["id"], "doc1");
        assert_eq!(value["content"], "hello");
        assert_eq!(value["metadata"]["topic"], "greeting");
        assert_eq!(value["embedding"][0], 0.5);
    }

    #[test]
    fn test_generation_request_validation() {
        assert!(GenerationRequest::new("p").validate().is_ok());
        assert!(GenerationRequest::new("p")
            .with_max_tokens(0)
            .validate()
            .is_err());
        assert!(GenerationRequest::new("p")
            .with_temperature(1.5)
            .validate()
            .is_err());
        assert!(GenerationRequest::new("p")
            .with_temperature(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_batch_outcome() {
        assert!(BatchOutcome::success(3).all_succeeded());

        let records = vec![IndexedRecord::new(Document::new("a", "x"), vec![])];
        let outcome = BatchOutcome::rejected(&records, "dimension mismatch");
        assert!(!outcome.all_succeeded());
        assert_eq!(outcome.written, 0);
        assert_eq!(outcome.failures[0].id, "a");
    }

    #[test]
    fn test_error_classification() {
        assert!(RagError::InvalidInput("x".into()).is_client_error());
        assert!(!RagError::UnsupportedModel("x".into()).is_retryable());
        assert!(RagError::VectorStoreError("x".into()).is_retryable());
    }
}
