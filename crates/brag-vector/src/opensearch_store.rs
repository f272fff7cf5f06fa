//! OpenSearch implementation for vector storage
//!
//! Talks to the OpenSearch REST API with a k-NN enabled index. A fresh
//! connection, with credentials resolved again, is built for every logical
//! operation so rotated credentials are picked up without a restart.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use brag_core::{
    BatchOutcome, IndexedRecord, ItemFailure, Metadata, OpenSearchAuth, OpenSearchConfig,
    RagError, Result, SearchResult, VectorStore,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Credentials
// ============================================================================

/// Username and password for HTTP basic auth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Source of OpenSearch credentials, consulted on every operation
pub trait CredentialProvider: Send + Sync {
    fn credentials(&self) -> Result<Option<BasicCredentials>>;
}

/// Fixed credentials (or none)
pub struct StaticCredentials(pub Option<BasicCredentials>);

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> Result<Option<BasicCredentials>> {
        Ok(self.0.clone())
    }
}

/// Credentials read from `OPENSEARCH_USERNAME` / `OPENSEARCH_PASSWORD` at call time
pub struct EnvCredentials {
    fallback: Option<BasicCredentials>,
}

impl EnvCredentials {
    pub fn new(fallback: Option<BasicCredentials>) -> Self {
        Self { fallback }
    }
}

impl CredentialProvider for EnvCredentials {
    fn credentials(&self) -> Result<Option<BasicCredentials>> {
        match (
            std::env::var("OPENSEARCH_USERNAME"),
            std::env::var("OPENSEARCH_PASSWORD"),
        ) {
            (Ok(username), Ok(password)) if !username.is_empty() => Ok(Some(BasicCredentials {
                username,
                password,
            })),
            _ => self.fallback.clone().map(Some).ok_or_else(|| {
                RagError::ConfigError("OpenSearch basic auth credentials not available".to_string())
            }),
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// One resolved connection: HTTP client, base URL and credentials
struct Connection {
    client: Client,
    base_url: String,
    credentials: Option<BasicCredentials>,
}

impl Connection {
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, format!("{}/{}", self.base_url, path.trim_start_matches('/')));
        match &self.credentials {
            Some(c) => request.basic_auth(&c.username, Some(&c.password)),
            None => request,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    status: u16,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f32>,
    #[serde(rename = "_source", default)]
    source: HitSource,
}

#[derive(Debug, Default, Deserialize)]
struct HitSource {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    metadata: Metadata,
}

// ============================================================================
// Store
// ============================================================================

/// OpenSearch vector store implementation
pub struct OpenSearchStore {
    config: OpenSearchConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl OpenSearchStore {
    /// Create a store with an explicit credential source
    pub fn new(config: OpenSearchConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// Create from config; basic auth reads the environment on every operation
    pub fn from_config(config: &OpenSearchConfig) -> Self {
        let credentials: Arc<dyn CredentialProvider> = match config.auth {
            OpenSearchAuth::None => Arc::new(StaticCredentials(None)),
            OpenSearchAuth::Basic => {
                let fallback = config
                    .username
                    .clone()
                    .zip(config.password.clone())
                    .map(|(username, password)| BasicCredentials { username, password });
                Arc::new(EnvCredentials::new(fallback))
            }
        };
        Self::new(config.clone(), credentials)
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn connect(&self) -> Result<Connection> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .danger_accept_invalid_certs(!self.config.verify_certs)
            .build()
            .map_err(|e| RagError::VectorStoreError(format!("OpenSearch connection failed: {e}")))?;

        Ok(Connection {
            client,
            base_url: self.config.base_url(),
            credentials: self.credentials.credentials()?,
        })
    }

    /// Index settings and mapping for k-NN search over `embedding`
    fn index_body(&self) -> Value {
        json!({
            "settings": {
                "index": {
                    "number_of_shards": self.config.shards,
                    "number_of_replicas": self.config.replicas,
                    "knn": true
                }
            },
            "mappings": {
                "properties": {
                    "id": {"type": "keyword"},
                    "content": {"type": "text"},
                    "metadata": {"type": "object"},
                    "embedding": {
                        "type": "knn_vector",
                        "dimension": self.config.dimension,
                        "method": {
                            "name": "hnsw",
                            "space_type": "cosinesimil",
                            "engine": "nmslib"
                        }
                    }
                }
            }
        })
    }

    async fn index_exists(&self, conn: &Connection, name: &str) -> Result<bool> {
        let response = conn
            .request(Method::HEAD, &urlencoding::encode(name))
            .send()
            .await
            .map_err(|e| RagError::VectorStoreError(format!("Index check failed: {e}")))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(RagError::VectorStoreError(format!(
                "Index check for {name} returned HTTP {status}"
            ))),
        }
    }

    async fn create_index_if_absent(&self, conn: &Connection, name: &str) -> Result<()> {
        if self.index_exists(conn, name).await? {
            tracing::debug!(index = name, "index already exists");
            return Ok(());
        }

        tracing::info!(index = name, dimension = self.config.dimension, "creating index");
        let response = conn
            .request(Method::PUT, &urlencoding::encode(name))
            .json(&self.index_body())
            .send()
            .await
            .map_err(|e| RagError::VectorStoreError(format!("Failed to create index: {e}")))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(index = name, "index created");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        // Lost a creation race with another writer
        if status == StatusCode::BAD_REQUEST && body.contains("resource_already_exists_exception") {
            tracing::debug!(index = name, "index created concurrently");
            return Ok(());
        }

        Err(RagError::VectorStoreError(format!(
            "Failed to create index {name}: HTTP {status}: {body}"
        )))
    }

    fn check_dimensions(&self, records: &[IndexedRecord]) -> Result<()> {
        records
            .iter()
            .try_for_each(|r| r.check_dimension(self.config.dimension))
    }

    async fn try_upsert(&self, record: &IndexedRecord) -> Result<()> {
        record.check_dimension(self.config.dimension)?;

        let conn = self.connect()?;
        self.create_index_if_absent(&conn, &self.config.index).await?;

        let path = format!(
            "{}/_doc/{}?refresh=true",
            urlencoding::encode(&self.config.index),
            urlencoding::encode(record.id())
        );
        let response = conn
            .request(Method::PUT, &path)
            .json(record)
            .send()
            .await
            .map_err(|e| RagError::VectorStoreError(format!("Failed to index document: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::VectorStoreError(format!(
                "Indexing {} returned HTTP {status}: {body}",
                record.id()
            )));
        }

        Ok(())
    }

    /// Serialize records as bulk `index` actions (NDJSON)
    fn bulk_body(&self, records: &[IndexedRecord]) -> Result<String> {
        let mut body = String::new();
        for record in records {
            let action = json!({"index": {"_index": self.config.index, "_id": record.id()}});
            body.push_str(&serde_json::to_string(&action)?);
            body.push('\n');
            body.push_str(&serde_json::to_string(record)?);
            body.push('\n');
        }
        Ok(body)
    }

    async fn try_batch_upsert(&self, records: &[IndexedRecord]) -> Result<BatchOutcome> {
        let conn = self.connect()?;
        self.create_index_if_absent(&conn, &self.config.index).await?;

        let response = conn
            .request(Method::POST, "_bulk?refresh=true")
            .header("Content-Type", "application/x-ndjson")
            .body(self.bulk_body(records)?)
            .send()
            .await
            .map_err(|e| RagError::VectorStoreError(format!("Bulk request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::VectorStoreError(format!(
                "Bulk request returned HTTP {status}: {body}"
            )));
        }

        let bulk: BulkResponse = response
            .json()
            .await
            .map_err(|e| RagError::VectorStoreError(format!("Failed to parse bulk response: {e}")))?;

        let mut outcome = BatchOutcome {
            attempted: records.len(),
            ..Default::default()
        };
        for (position, item) in bulk.items.into_iter().enumerate() {
            let Some(result) = item.into_values().next() else {
                continue;
            };
            let id = result
                .id
                .or_else(|| records.get(position).map(|r| r.id().to_string()))
                .unwrap_or_default();

            if result.status < 300 && result.error.is_none() {
                outcome.written += 1;
            } else {
                let reason = result
                    .error
                    .as_ref()
                    .and_then(|e| e.get("reason").or_else(|| e.get("type")))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {}", result.status));
                outcome.failures.push(ItemFailure { id, reason });
            }
        }

        Ok(outcome)
    }
}

#[async_trait]
impl VectorStore for OpenSearchStore {
    fn index_name(&self) -> &str {
        &self.config.index
    }

    async fn ensure_index(&self, name: &str) -> Result<()> {
        let conn = self.connect()?;
        self.create_index_if_absent(&conn, name).await
    }

    async fn upsert(&self, record: &IndexedRecord) -> bool {
        match self.try_upsert(record).await {
            Ok(()) => {
                tracing::info!(id = record.id(), "indexed document");
                true
            }
            Err(e) => {
                tracing::error!(id = record.id(), error = %e, "error indexing document");
                false
            }
        }
    }

    async fn batch_upsert(&self, records: &[IndexedRecord]) -> BatchOutcome {
        if records.is_empty() {
            return BatchOutcome::success(0);
        }

        if let Err(e) = self.check_dimensions(records) {
            tracing::error!(error = %e, records = records.len(), "rejecting batch before write");
            return BatchOutcome::rejected(records, e.to_string());
        }

        match self.try_batch_upsert(records).await {
            Ok(outcome) => {
                tracing::info!(
                    written = outcome.written,
                    failed = outcome.failures.len(),
                    "bulk indexing completed"
                );
                for failure in &outcome.failures {
                    tracing::warn!(id = %failure.id, reason = %failure.reason, "bulk item failed");
                }
                outcome
            }
            Err(e) => {
                tracing::error!(error = %e, "error batch indexing documents");
                BatchOutcome::rejected(records, e.to_string())
            }
        }
    }

    async fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidInput("k must be a positive integer".to_string()));
        }
        if embedding.is_empty() {
            tracing::warn!("empty query embedding, skipping search");
            return Ok(Vec::new());
        }
        if embedding.len() != self.config.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.len(),
            });
        }

        let conn = self.connect()?;
        let index = &self.config.index;
        if !self.index_exists(&conn, index).await? {
            tracing::warn!(index = %index, "index does not exist");
            return Ok(Vec::new());
        }

        let query = json!({
            "size": k,
            "query": {
                "knn": {
                    "embedding": {
                        "vector": embedding,
                        "k": k
                    }
                }
            },
            "_source": ["id", "content", "metadata"]
        });

        let response = conn
            .request(Method::POST, &format!("{}/_search", urlencoding::encode(index)))
            .json(&query)
            .send()
            .await
            .map_err(|e| RagError::VectorStoreError(format!("Vector search failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::VectorStoreError(format!(
                "Vector search returned HTTP {status}: {body}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| RagError::VectorStoreError(format!("Failed to parse search response: {e}")))?;

        let results: Vec<SearchResult> = parsed
            .hits
            .hits
            .into_iter()
            .take(k)
            .map(|hit| SearchResult {
                id: hit.source.id.unwrap_or(hit.id),
                content: hit.source.content,
                metadata: hit.source.metadata,
                score: hit.score.unwrap_or_default(),
            })
            .collect();

        tracing::info!(results = results.len(), k, "search completed");
        Ok(results)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use brag_core::Document;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer, dimension: usize) -> OpenSearchStore {
        let address = server.address();
        let config = OpenSearchConfig {
            endpoint: address.ip().to_string(),
            port: address.port(),
            index: "rag-documents".to_string(),
            use_ssl: false,
            dimension,
            ..Default::default()
        };
        OpenSearchStore::from_config(&config)
    }

    fn record(id: &str, embedding: Vec<f32>) -> IndexedRecord {
        IndexedRecord::new(Document::new(id, format!("content of {id}")), embedding)
    }

    async fn mount_index_exists(server: &MockServer, exists: bool) {
        Mock::given(method("HEAD"))
            .and(path("/rag-documents"))
            .respond_with(ResponseTemplate::new(if exists { 200 } else { 404 }))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_ensure_index_creates_once() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/rag-documents"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/rag-documents"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/rag-documents"))
            .and(body_partial_json(json!({
                "settings": {"index": {"knn": true}},
                "mappings": {"properties": {"embedding": {"type": "knn_vector", "dimension": 3}}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server, 3);
        store.ensure_index("rag-documents").await.unwrap();
        store.ensure_index("rag-documents").await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_index_tolerates_creation_race() {
        let server = MockServer::start().await;
        mount_index_exists(&server, false).await;
        Mock::given(method("PUT"))
            .and(path("/rag-documents"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"type": "resource_already_exists_exception"},
                "status": 400
            })))
            .mount(&server)
            .await;

        let store = store_for(&server, 3);
        assert!(store.ensure_index("rag-documents").await.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_index_propagates_other_errors() {
        let server = MockServer::start().await;
        mount_index_exists(&server, false).await;
        Mock::given(method("PUT"))
            .and(path("/rag-documents"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let store = store_for(&server, 3);
        assert!(matches!(
            store.ensure_index("rag-documents").await,
            Err(RagError::VectorStoreError(_))
        ));
    }

    #[tokio::test]
    async fn test_upsert_single_document() {
        let server = MockServer::start().await;
        mount_index_exists(&server, true).await;
        Mock::given(method("PUT"))
            .and(path("/rag-documents/_doc/doc1"))
            .and(query_param("refresh", "true"))
            .and(body_partial_json(json!({"id": "doc1", "embedding": [0.1, 0.2, 0.3]})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "doc1", "result": "created"})))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server, 3);
        assert!(store.upsert(&record("doc1", vec![0.1, 0.2, 0.3])).await);
    }

    #[tokio::test]
    async fn test_upsert_encodes_document_id() {
        let server = MockServer::start().await;
        mount_index_exists(&server, true).await;
        Mock::given(method("PUT"))
            .and(path("/rag-documents/_doc/guide%201%2Fintro"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "updated"})))
            .expect(1)
            .mount(&server)
            .await;

        let store = store_for(&server, 1);
        assert!(store.upsert(&record("guide 1/intro", vec![0.4])).await);
    }

    #[tokio::test]
    async fn test_upsert_wrong_dimension_returns_false() {
        let server = MockServer::start().await;
        let store = store_for(&server, 3);

        assert!(!store.upsert(&record("doc1", vec![0.1])).await);
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_batch_upsert_dimension_mismatch_writes_nothing() {
        let server = MockServer::start().await;
        let store = store_for(&server, 3);

        let records = vec![record("a", vec![0.1, 0.2, 0.3]), record("b", vec![])];
        let outcome = store.batch_upsert(&records).await;

        assert!(!outcome.all_succeeded());
        assert_eq!(outcome.written, 0);
        assert_eq!(outcome.failures.len(), 2);
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_batch_upsert_reports_item_failures() {
        let server = MockServer::start().await;
        mount_index_exists(&server, true).await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .and(header("content-type", "application/x-ndjson"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "took": 5,
                "errors": true,
                "items": [
                    {"index": {"_id": "a", "status": 201}},
                    {"index": {"_id": "b", "status": 400, "error": {"type": "mapper_parsing_exception", "reason": "failed to parse"}}}
                ]
            })))
            .mount(&server)
            .await;

        let store = store_for(&server, 2);
        let outcome = store
            .batch_upsert(&[record("a", vec![0.1, 0.2]), record("b", vec![0.3, 0.4])])
            .await;

        assert!(!outcome.all_succeeded());
        assert_eq!(outcome.written, 1);
        assert_eq!(
            outcome.failures,
            vec![ItemFailure {
                id: "b".to_string(),
                reason: "failed to parse".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_batch_upsert_success() {
        let server = MockServer::start().await;
        mount_index_exists(&server, true).await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": false,
                "items": [
                    {"index": {"_id": "a", "status": 201}},
                    {"index": {"_id": "b", "status": 200}}
                ]
            })))
            .mount(&server)
            .await;

        let store = store_for(&server, 2);
        let records = [record("a", vec![0.1, 0.2]), record("b", vec![0.3, 0.4])];
        let outcome = store.batch_upsert(&records).await;
        assert!(outcome.all_succeeded());

        let requests = server.received_requests().await.unwrap_or_default();
        let bulk = requests.iter().find(|r| r.url.path() == "/_bulk").unwrap();
        let lines: Vec<&str> = std::str::from_utf8(&bulk.body).unwrap().lines().collect();
        assert_eq!(lines.len(), 4);
        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_id"], "a");
        assert_eq!(action["index"]["_index"], "rag-documents");
    }

    #[tokio::test]
    async fn test_search_absent_index_returns_empty() {
        let server = MockServer::start().await;
        mount_index_exists(&server, false).await;

        let store = store_for(&server, 2);
        let results = store.search(&[0.1, 0.2], 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_empty_embedding_skips_request() {
        let server = MockServer::start().await;
        let store = store_for(&server, 2);

        assert!(store.search(&[], 3).await.unwrap().is_empty());
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_search_parses_hits_and_bounds_k() {
        let server = MockServer::start().await;
        mount_index_exists(&server, true).await;
        Mock::given(method("POST"))
            .and(path("/rag-documents/_search"))
            .and(body_partial_json(json!({
                "size": 2,
                "query": {"knn": {"embedding": {"k": 2}}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {"hits": [
                    {"_id": "doc_a", "_score": 0.9, "_source": {"id": "doc_a", "content": "A", "metadata": {"topic": "a"}}},
                    {"_id": "doc_b", "_score": 0.7, "_source": {"id": "doc_b", "content": "B"}},
                    {"_id": "doc_c", "_score": 0.5, "_source": {"id": "doc_c", "content": "C"}}
                ]}
            })))
            .mount(&server)
            .await;

        let store = store_for(&server, 2);
        let results = store.search(&[0.1, 0.2], 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "doc_a");
        assert_eq!(results[0].metadata["topic"], "a");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_search_rejects_zero_k() {
        let server = MockServer::start().await;
        let store = store_for(&server, 2);
        assert!(store.search(&[0.1, 0.2], 0).await.is_err());
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        let server = MockServer::start().await;
        mount_index_exists(&server, true).await;
        Mock::given(method("POST"))
            .and(path("/rag-documents/_search"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let store = store_for(&server, 2);
        assert!(matches!(
            store.search(&[0.1, 0.2], 3).await,
            Err(RagError::VectorStoreError(_))
        ));
    }

    struct RotatingCredentials(std::sync::atomic::AtomicUsize);

    impl CredentialProvider for RotatingCredentials {
        fn credentials(&self) -> Result<Option<BasicCredentials>> {
            let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            Ok(Some(BasicCredentials {
                username: format!("rotor-{n}"),
                password: "pw".to_string(),
            }))
        }
    }

    #[tokio::test]
    async fn test_credentials_resolved_per_operation() {
        let server = MockServer::start().await;
        mount_index_exists(&server, true).await;
        for encoded in ["cm90b3ItMTpwdw==", "cm90b3ItMjpwdw=="] {
            Mock::given(method("POST"))
                .and(path("/rag-documents/_search"))
                .and(header("authorization", format!("Basic {encoded}").as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": {"hits": []}})))
                .expect(1)
                .mount(&server)
                .await;
        }

        let mut config = store_for(&server, 2).config;
        config.auth = OpenSearchAuth::Basic;
        let store = OpenSearchStore::new(
            config,
            Arc::new(RotatingCredentials(std::sync::atomic::AtomicUsize::new(0))),
        );

        assert!(store.search(&[0.1, 0.2], 3).await.unwrap().is_empty());
        assert!(store.search(&[0.1, 0.2], 3).await.unwrap().is_empty());
    }

    #[test]
    fn test_static_credentials() {
        let creds = StaticCredentials(Some(BasicCredentials {
            username: "admin".to_string(),
            password: "secret".to_string(),
        }));
        assert_eq!(creds.credentials().unwrap().unwrap().username, "admin");
        assert!(StaticCredentials(None).credentials().unwrap().is_none());
    }
}
