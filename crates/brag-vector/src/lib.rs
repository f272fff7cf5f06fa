//! Bedrock RAG Vector - embedding and vector store adapters
//!
//! Provides the embedding client backed by Bedrock Titan models and the
//! vector store clients (OpenSearch k-NN, in-memory) that hold
//! document records and answer similarity queries.

pub mod embedding;
pub mod memory_store;
pub mod opensearch_store;

pub use embedding::{create_embedding_client, TitanEmbedding};
pub use memory_store::InMemoryStore;
pub use opensearch_store::{
    BasicCredentials, CredentialProvider, EnvCredentials, OpenSearchStore, StaticCredentials,
};
