//! Sample documents and JSON document files

use anyhow::Context;
use brag_core::Document;
use serde_json::json;
use std::path::Path;

/// Built-in documents about the services this pipeline runs on
pub fn sample_documents() -> Vec<Document> {
    let entries = [
        (
            "doc1",
            "Amazon Bedrock is a fully managed service that offers a choice of high-performing foundation models (FMs) from leading AI companies like AI21 Labs, Anthropic, Cohere, Meta, Stability AI, and Amazon via a single API, along with a broad set of capabilities to build generative AI applications with security, privacy, and responsible AI.",
            "aws",
            "bedrock",
        ),
        (
            "doc2",
            "Amazon OpenSearch Service is a managed service that makes it easy to deploy, operate, and scale OpenSearch clusters in the AWS Cloud. OpenSearch is a fully open-source search and analytics engine for use cases such as log analytics, real-time application monitoring, and clickstream analysis.",
            "aws",
            "opensearch",
        ),
        (
            "doc3",
            "AWS Lambda is a serverless compute service that lets you run code without provisioning or managing servers, creating workload-aware cluster scaling logic, maintaining event integrations, or managing runtimes. With Lambda, you can run code for virtually any type of application or backend service - all with zero administration.",
            "aws",
            "lambda",
        ),
        (
            "doc4",
            "Amazon API Gateway is a fully managed service that makes it easy for developers to create, publish, maintain, monitor, and secure APIs at any scale. APIs act as the 'front door' for applications to access data, business logic, or functionality from your backend services.",
            "aws",
            "api-gateway",
        ),
        (
            "doc5",
            "Retrieval-Augmented Generation (RAG) is a technique used in natural language processing where an LLM retrieves facts from an external knowledge source to ground its responses in reliable, up-to-date information. This helps reduce hallucinations and provides source attribution.",
            "concept",
            "rag",
        ),
    ];

    entries
        .into_iter()
        .map(|(id, content, category, topic)| {
            Document::new(id, content)
                .with_metadata("source", "sample")
                .with_metadata("category", category)
                .with_metadata("topic", topic)
        })
        .collect()
}

/// Read a JSON array of documents
pub fn load_documents(path: &Path) -> anyhow::Result<Vec<Document>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let documents: Vec<Document> = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse documents in {}", path.display()))?;

    tracing::info!(documents = documents.len(), path = %path.display(), "loaded documents");
    Ok(documents)
}

/// Write documents as a pretty-printed JSON array
pub fn save_documents(documents: &[Document], path: &Path) -> anyhow::Result<()> {
    let data = serde_json::to_string_pretty(documents)?;
    std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(documents = documents.len(), path = %path.display(), "saved documents");
    Ok(())
}

/// Request event for a local pipeline run
pub fn query_event(prompt: &str) -> serde_json::Value {
    json!({ "body": { "prompt": prompt } })
}
