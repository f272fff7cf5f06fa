//! Bedrock RAG - Retrieval-Augmented Generation pipelines
//!
//! This crate implements the two pipelines of the service:
//! - The request pipeline ([`RagHandler`]): validate, embed the question,
//!   retrieve the top-k documents, build a grounded prompt, generate
//! - The indexing pipeline ([`Indexer`]): batch, embed, bulk upsert
//!
//! Adapters are injected as trait objects, so every stage can be replaced
//! with a stub in tests.
//!
//! Author: hephaex@gmail.com

use brag_core::{
    check_embedding_dimension, AppConfig, EmbeddingClient, GenerationRequest, RagConfig, RagError, Result, SearchResult,
    TextGenerator, VectorStore,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod generation;
pub mod indexing;

pub use generation::{
    create_text_generator, BedrockGenerator, FormatRegistry, ModelSource, WireFormat,
    GENERATION_MODEL_ENV,
};
pub use indexing::{BatchReport, IndexReport, Indexer};

/// Message returned when the request carries no usable prompt
pub const NO_PROMPT: &str = "No prompt provided";

/// Headers attached to every pipeline response
pub const RESPONSE_HEADERS: [(&str, &str); 4] = [
    ("Content-Type", "application/json"),
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

// ============================================================================
// Configuration
// ============================================================================

/// Request pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of documents retrieved per question
    pub top_k: usize,

    pub max_tokens: u32,

    pub temperature: f64,

    /// Bound on one invocation after validation
    pub timeout: Duration,

    /// Put the error message in 500 bodies instead of an opaque message
    pub expose_error_details: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&RagConfig::default())
    }
}

impl From<&RagConfig> for PipelineConfig {
    fn from(config: &RagConfig) -> Self {
        Self {
            top_k: config.top_k,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.pipeline_timeout_secs),
            expose_error_details: config.expose_error_details,
        }
    }
}

// ============================================================================
// Pipeline Response
// ============================================================================

/// Request pipeline states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Embedded,
    Retrieved,
    PromptBuilt,
    Generated,
    Responded,
    Errored,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Embedded => "embedded",
            Stage::Retrieved => "retrieved",
            Stage::PromptBuilt => "prompt_built",
            Stage::Generated => "generated",
            Stage::Responded => "responded",
            Stage::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Body of a pipeline response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Answer {
        response: String,
        context_retrieved: bool,
    },
    Error {
        error: String,
    },
}

/// Status code, headers and JSON body produced by one invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,

    pub headers: BTreeMap<String, String>,

    pub body: ResponseBody,
}

impl PipelineResponse {
    fn new(status_code: u16, body: ResponseBody) -> Self {
        Self {
            status_code,
            headers: RESPONSE_HEADERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body,
        }
    }

    pub fn answer(response: String, context_retrieved: bool) -> Self {
        Self::new(
            200,
            ResponseBody::Answer {
                response,
                context_retrieved,
            },
        )
    }

    pub fn error(status_code: u16, error: impl Into<String>) -> Self {
        Self::new(
            status_code,
            ResponseBody::Error {
                error: error.into(),
            },
        )
    }
}

// ============================================================================
// RAG Handler
// ============================================================================

/// Request pipeline
pub struct RagHandler {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn TextGenerator>,
    config: PipelineConfig,
}

impl RagHandler {
    /// Create a new handler
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn TextGenerator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            config,
        }
    }

    /// Build a handler backed by Bedrock and OpenSearch
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingClient> =
            Arc::from(brag_vector::create_embedding_client(&config.bedrock)?);
        check_embedding_dimension(embedder.as_ref(), config.opensearch.dimension)?;
        let store: Arc<dyn VectorStore> =
            Arc::new(brag_vector::OpenSearchStore::from_config(&config.opensearch));
        let generator: Arc<dyn TextGenerator> =
            Arc::from(create_text_generator(&config.bedrock)?);

        Ok(Self::new(
            embedder,
            store,
            generator,
            PipelineConfig::from(&config.rag),
        ))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Handle an event whose `body` is a JSON string, a JSON object or absent
    pub async fn handle(&self, event: &Value) -> PipelineResponse {
        tracing::info!(stage = %Stage::Received, "processing incoming request");

        let payload = match event.get("body") {
            Some(Value::String(raw)) => serde_json::from_str::<Value>(raw).map_err(RagError::from),
            Some(Value::Null) | None => Ok(Value::Object(Map::new())),
            Some(other) => Ok(other.clone()),
        };

        match payload {
            Ok(payload) => self.handle_payload(&payload).await,
            Err(e) => self.fail(e),
        }
    }

    /// Handle a raw request body
    pub async fn handle_raw(&self, body: &str) -> PipelineResponse {
        self.handle(&serde_json::json!({ "body": body })).await
    }

    /// Handle request body bytes; a body that is not UTF-8 fails like unparseable JSON
    pub async fn handle_bytes(&self, body: &[u8]) -> PipelineResponse {
        match std::str::from_utf8(body) {
            Ok(raw) => self.handle_raw(raw).await,
            Err(e) => {
                tracing::info!(stage = %Stage::Received, "processing incoming request");
                self.fail(RagError::Other(anyhow::anyhow!(
                    "request body is not valid UTF-8: {e}"
                )))
            }
        }
    }

    async fn handle_payload(&self, payload: &Value) -> PipelineResponse {
        let prompt = match extract_prompt(payload) {
            Ok(prompt) => prompt,
            Err(RagError::InvalidInput(message)) => return self.reject(message),
            Err(e) => return self.fail(e),
        };
        tracing::info!(stage = %Stage::Validated, chars = prompt.len(), "prompt accepted");

        let started = Instant::now();
        let result = tokio::time::timeout(self.config.timeout, self.answer(prompt)).await;

        match result {
            Ok(Ok((response, context_retrieved))) => {
                tracing::info!(
                    stage = %Stage::Responded,
                    context_retrieved,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "request completed"
                );
                PipelineResponse::answer(response, context_retrieved)
            }
            Ok(Err(e)) => self.fail(e),
            Err(_) => self.fail(RagError::Timeout(self.config.timeout.as_secs())),
        }
    }

    /// Embed, retrieve, build the prompt and generate
    async fn answer(&self, prompt: &str) -> Result<(String, bool)> {
        let embedding = self.embedder.embed(prompt).await;
        tracing::info!(stage = %Stage::Embedded, dimension = embedding.len(), "prompt embedded");

        let results = if embedding.is_empty() {
            tracing::warn!("no usable embedding, continuing without context");
            Vec::new()
        } else {
            self.store.search(&embedding, self.config.top_k).await?
        };
        tracing::info!(stage = %Stage::Retrieved, results = results.len(), k = self.config.top_k, "context retrieved");

        let builder = PromptBuilder::grounded().question(prompt).with_results(&results);
        let context_retrieved = builder.has_context();
        let enriched = builder.build();
        tracing::info!(stage = %Stage::PromptBuilt, chars = enriched.len(), "prompt built");

        let request = GenerationRequest::new(enriched)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature);
        let response = self.generator.generate(&request).await?;
        tracing::info!(stage = %Stage::Generated, chars = response.len(), "response generated");

        Ok((response, context_retrieved))
    }

    /// Client error: the request carried no usable prompt
    fn reject(&self, message: String) -> PipelineResponse {
        tracing::warn!(stage = %Stage::Errored, error = %message, "rejected request");
        PipelineResponse::error(400, message)
    }

    /// Server error, whatever kind of `RagError` a later stage raised
    fn fail(&self, error: RagError) -> PipelineResponse {
        tracing::error!(stage = %Stage::Errored, error = %error, "error processing request");
        if self.config.expose_error_details {
            PipelineResponse::error(500, format!("Internal server error: {error}"))
        } else {
            PipelineResponse::error(500, "Internal server error")
        }
    }
}

/// Pull a non-empty `prompt` string out of the request payload
fn extract_prompt(payload: &Value) -> Result<&str> {
    let Some(fields) = payload.as_object() else {
        return Err(RagError::Other(anyhow::anyhow!(
            "request body must be a JSON object"
        )));
    };

    match fields.get("prompt").and_then(Value::as_str) {
        Some(prompt) if !prompt.is_empty() => Ok(prompt),
        _ => Err(RagError::InvalidInput(NO_PROMPT.to_string())),
    }
}

// ============================================================================
// Prompt Builder
// ============================================================================

/// Builder for context-enriched prompts
pub struct PromptBuilder {
    system_instruction: String,
    context_sections: Vec<String>,
    question_lead: String,
    question: String,
    instructions: Vec<String>,
}

impl PromptBuilder {
    /// Create an empty prompt builder
    pub fn new() -> Self {
        Self {
            system_instruction: String::new(),
            context_sections: Vec::new(),
            question_lead: String::new(),
            question: String::new(),
            instructions: Vec::new(),
        }
    }

    /// Builder preloaded with the answer-only-from-context template
    pub fn grounded() -> Self {
        Self::new()
            .system("You are a helpful assistant with access to the following information:")
            .question_lead("Based on this information, please answer the following question:")
            .add_instruction("If the information provided doesn't contain the answer, please say so.")
            .add_instruction("Only use the information provided to construct your answer.")
    }

    /// Set system instruction
    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Add a context section
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context_sections.push(context.into());
        self
    }

    /// Add the content of each search result, in the given order
    pub fn with_results(self, results: &[SearchResult]) -> Self {
        results
            .iter()
            .fold(self, |builder, r| builder.add_context(r.content.as_str()))
    }

    /// Line introducing the question
    pub fn question_lead(mut self, lead: impl Into<String>) -> Self {
        self.question_lead = lead.into();
        self
    }

    /// Set the question
    pub fn question(mut self, q: impl Into<String>) -> Self {
        self.question = q.into();
        self
    }

    /// Add an instruction
    pub fn add_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Context sections joined by blank lines
    pub fn context(&self) -> String {
        self.context_sections.join("\n\n")
    }

    pub fn has_context(&self) -> bool {
        !self.context().is_empty()
    }

    /// Build the final prompt
    pub fn build(self) -> String {
        let question = if self.question_lead.is_empty() {
            self.question.clone()
        } else {
            format!("{}\n{}", self.question_lead, self.question)
        };

        [
            self.system_instruction.clone(),
            self.context(),
            question,
            self.instructions.join(" "),
        ]
        .join("\n\n")
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
