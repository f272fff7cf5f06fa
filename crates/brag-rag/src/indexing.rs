//! Indexing pipeline
//!
//! Splits documents into consecutive batches, embeds each batch and writes
//! it with one bulk upsert. A failed batch is logged and reported; the
//! remaining batches still run. Failed batches are not retried.
//!
//! Author: hephaex@gmail.com

use brag_core::{
    BatchOutcome, Document, EmbeddingClient, EmbeddingVector, IndexedRecord, ItemFailure,
    RagError, Result, VectorStore,
};
use serde::Serialize;
use std::sync::Arc;

/// Result of indexing one batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// 1-based batch number
    pub batch: usize,

    /// Documents in the batch
    pub documents: usize,

    pub succeeded: bool,

    pub failures: Vec<ItemFailure>,
}

/// Result of one indexing run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexReport {
    pub total_documents: usize,

    pub batches: Vec<BatchReport>,
}

impl IndexReport {
    pub fn succeeded_batches(&self) -> usize {
        self.batches.iter().filter(|b| b.succeeded).count()
    }

    pub fn failed_batches(&self) -> usize {
        self.batches.len() - self.succeeded_batches()
    }

    pub fn all_succeeded(&self) -> bool {
        self.batches.iter().all(|b| b.succeeded)
    }
}

/// Batch indexer over an embedding client and a vector store
pub struct Indexer {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn EmbeddingClient>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Index all documents in batches of `batch_size`.
    ///
    /// Only a zero batch size is an error; batch failures are reported in
    /// the returned [`IndexReport`].
    pub async fn index_all(&self, documents: &[Document], batch_size: usize) -> Result<IndexReport> {
        if batch_size == 0 {
            return Err(RagError::InvalidInput(
                "batch size must be greater than zero".to_string(),
            ));
        }

        let mut report = IndexReport {
            total_documents: documents.len(),
            batches: Vec::new(),
        };
        if documents.is_empty() {
            tracing::warn!("no documents to index");
            return Ok(report);
        }

        let total_batches = documents.len().div_ceil(batch_size);
        tracing::info!(
            documents = documents.len(),
            batches = total_batches,
            index = self.store.index_name(),
            "indexing documents"
        );

        for (i, chunk) in documents.chunks(batch_size).enumerate() {
            let batch = i + 1;
            tracing::info!("Processing batch {batch}/{total_batches}");

            let texts: Vec<String> = chunk.iter().map(|d| d.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await;
            let outcome = self.upsert_batch(chunk, embeddings).await;

            if outcome.all_succeeded() {
                tracing::info!(batch, documents = chunk.len(), "batch indexed");
            } else {
                tracing::error!(
                    batch,
                    documents = chunk.len(),
                    failed = outcome.failures.len(),
                    "failed to index batch"
                );
            }

            report.batches.push(BatchReport {
                batch,
                documents: chunk.len(),
                succeeded: outcome.all_succeeded(),
                failures: outcome.failures,
            });
        }

        tracing::info!(
            succeeded = report.succeeded_batches(),
            failed = report.failed_batches(),
            "indexing finished"
        );
        Ok(report)
    }

    /// Pair documents with embeddings and write them as one batch.
    ///
    /// A count mismatch fails the whole batch before any write.
    pub async fn upsert_batch(
        &self,
        documents: &[Document],
        embeddings: Vec<EmbeddingVector>,
    ) -> BatchOutcome {
        match IndexedRecord::pair(documents, embeddings) {
            Ok(records) => self.store.batch_upsert(&records).await,
            Err(e) => {
                tracing::error!(error = %e, "skipping batch");
                BatchOutcome {
                    attempted: documents.len(),
                    written: 0,
                    failures: documents
                        .iter()
                        .map(|d| ItemFailure {
                            id: d.id.clone(),
                            reason: e.to_string(),
                        })
                        .collect(),
                }
            }
        }
    }
}
