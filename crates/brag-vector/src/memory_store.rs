//! In-memory vector store
//!
//! Brute-force cosine search over records held in process memory. Used for
//! dry runs and tests; scores follow the OpenSearch `cosinesimil` scale so
//! results are comparable with the remote store.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use brag_core::{BatchOutcome, IndexedRecord, RagError, Result, SearchResult, VectorStore};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory vector store keyed by index name, then document id
pub struct InMemoryStore {
    index: String,
    dimension: usize,
    indexes: RwLock<HashMap<String, HashMap<String, IndexedRecord>>>,
}

impl InMemoryStore {
    pub fn new(index: impl Into<String>, dimension: usize) -> Self {
        Self {
            index: index.into(),
            dimension,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexes created so far
    pub async fn index_count(&self) -> usize {
        self.indexes.read().await.len()
    }

    /// Number of records in the configured index
    pub async fn len(&self) -> usize {
        self.indexes
            .read()
            .await
            .get(&self.index)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Fetch a record by id from the configured index
    pub async fn get(&self, id: &str) -> Option<IndexedRecord> {
        self.indexes
            .read()
            .await
            .get(&self.index)
            .and_then(|records| records.get(id))
            .cloned()
    }

    async fn insert(&self, records: &[IndexedRecord]) {
        let mut indexes = self.indexes.write().await;
        let index = indexes.entry(self.index.clone()).or_default();
        for record in records {
            index.insert(record.id().to_string(), record.clone());
        }
    }
}

/// Cosine similarity of two equal-length vectors; 0 for zero vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Map cosine similarity in [-1, 1] to the `cosinesimil` score `1 / (2 - cos)`
fn knn_score(cosine: f32) -> f32 {
    1.0 / (2.0 - cosine)
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn index_name(&self) -> &str {
        &self.index
    }

    async fn ensure_index(&self, name: &str) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        if !indexes.contains_key(name) {
            tracing::info!(index = name, "creating in-memory index");
            indexes.insert(name.to_string(), HashMap::new());
        }
        Ok(())
    }

    async fn upsert(&self, record: &IndexedRecord) -> bool {
        if let Err(e) = record.check_dimension(self.dimension) {
            tracing::error!(id = record.id(), error = %e, "error indexing document");
            return false;
        }
        self.insert(std::slice::from_ref(record)).await;
        true
    }

    async fn batch_upsert(&self, records: &[IndexedRecord]) -> BatchOutcome {
        if records.is_empty() {
            return BatchOutcome::success(0);
        }
        if let Err(e) = records
            .iter()
            .try_for_each(|r| r.check_dimension(self.dimension))
        {
            tracing::error!(error = %e, records = records.len(), "rejecting batch before write");
            return BatchOutcome::rejected(records, e.to_string());
        }

        self.insert(records).await;
        BatchOutcome::success(records.len())
    }

    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidInput("k must be a positive integer".to_string()));
        }
        if embedding.is_empty() {
            return Ok(Vec::new());
        }
        if embedding.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        let indexes = self.indexes.read().await;
        let Some(records) = indexes.get(&self.index) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<SearchResult> = records
            .values()
            .map(|record| SearchResult {
                id: record.document.id.clone(),
                content: record.document.content.clone(),
                metadata: record.document.metadata.clone(),
                score: knn_score(cosine_similarity(embedding, &record.embedding)),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(k);

        Ok(results)
    }
}
