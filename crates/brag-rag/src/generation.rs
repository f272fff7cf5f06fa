//! Generation client for Bedrock text models
//!
//! Each Bedrock model family speaks its own request and response JSON. The
//! [`FormatRegistry`] maps a model identifier to the [`WireFormat`] that
//! serializes requests and extracts the generated text for that family, so
//! a new family is a `register` call rather than another branch.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use brag_core::{
    BedrockConfig, BedrockRuntime, GenerationRequest, RagError, Result, TextGenerator,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Environment variable consulted on every call for the generation model
pub const GENERATION_MODEL_ENV: &str = "GENERATION_MODEL_ID";

// ============================================================================
// Wire formats
// ============================================================================

/// Serializes a generation request into a model family's request body
pub type BuildRequest = fn(&GenerationRequest) -> Value;

/// Extracts the generated text from a model family's response body
pub type ParseResponse = fn(&Value) -> String;

/// Request/response rules for one model family
#[derive(Clone)]
pub struct WireFormat {
    name: String,
    matches: Arc<dyn Fn(&str) -> bool + Send + Sync>,
    build_request: BuildRequest,
    parse_response: ParseResponse,
}

impl std::fmt::Debug for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireFormat").field("name", &self.name).finish()
    }
}

impl WireFormat {
    /// Create a format selected by an arbitrary predicate on the model id
    pub fn new(
        name: impl Into<String>,
        matches: impl Fn(&str) -> bool + Send + Sync + 'static,
        build_request: BuildRequest,
        parse_response: ParseResponse,
    ) -> Self {
        Self {
            name: name.into(),
            matches: Arc::new(matches),
            build_request,
            parse_response,
        }
    }

    /// Create a format selected by model id prefix
    pub fn with_prefix(
        prefix: impl Into<String>,
        build_request: BuildRequest,
        parse_response: ParseResponse,
    ) -> Self {
        let prefix = prefix.into();
        let name = prefix.clone();
        Self::new(
            name,
            move |model_id: &str| model_id.starts_with(&prefix),
            build_request,
            parse_response,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, model_id: &str) -> bool {
        (self.matches)(model_id)
    }

    pub fn build_request(&self, request: &GenerationRequest) -> Value {
        (self.build_request)(request)
    }

    pub fn parse_response(&self, response: &Value) -> String {
        (self.parse_response)(response)
    }
}

/// Text at a JSON pointer; missing or non-string fields read as empty
fn text_at(response: &Value, pointer: &str) -> String {
    response
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn anthropic_request(request: &GenerationRequest) -> Value {
    json!({
        "anthropic_version": "bedrock-2023-05-31",
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "messages": [{
            "role": "user",
            "content": [{"type": "text", "text": request.prompt}]
        }]
    })
}

fn anthropic_response(response: &Value) -> String {
    text_at(response, "/content/0/text")
}

fn titan_request(request: &GenerationRequest) -> Value {
    json!({
        "inputText": request.prompt,
        "textGenerationConfig": {
            "maxTokenCount": request.max_tokens,
            "temperature": request.temperature,
            "topP": 0.9
        }
    })
}

fn titan_response(response: &Value) -> String {
    text_at(response, "/results/0/outputText")
}

fn ai21_request(request: &GenerationRequest) -> Value {
    json!({
        "prompt": request.prompt,
        "maxTokens": request.max_tokens,
        "temperature": request.temperature,
        "topP": 0.9
    })
}

fn ai21_response(response: &Value) -> String {
    text_at(response, "/completions/0/data/text")
}

fn cohere_request(request: &GenerationRequest) -> Value {
    json!({
        "prompt": request.prompt,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature
    })
}

fn cohere_response(response: &Value) -> String {
    text_at(response, "/generations/0/text")
}

fn llama_request(request: &GenerationRequest) -> Value {
    json!({
        "prompt": request.prompt,
        "max_gen_len": request.max_tokens,
        "temperature": request.temperature
    })
}

fn llama_response(response: &Value) -> String {
    text_at(response, "/generation")
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered set of wire formats; the first match wins
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: Vec<WireFormat>,
}

impl FormatRegistry {
    /// Registry with no formats
    pub fn empty() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Add a format after the existing ones
    pub fn register(mut self, format: WireFormat) -> Self {
        self.formats.push(format);
        self
    }

    /// Find the format for a model id
    pub fn resolve(&self, model_id: &str) -> Result<&WireFormat> {
        self.formats
            .iter()
            .find(|f| f.matches(model_id))
            .ok_or_else(|| RagError::UnsupportedModel(model_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl Default for FormatRegistry {
    /// Bedrock families: Anthropic Claude, Amazon Titan, AI21, Cohere, Meta Llama
    fn default() -> Self {
        Self::empty()
            .register(WireFormat::with_prefix(
                "anthropic.claude",
                anthropic_request,
                anthropic_response,
            ))
            .register(WireFormat::with_prefix(
                "amazon.titan",
                titan_request,
                titan_response,
            ))
            .register(WireFormat::with_prefix("ai21", ai21_request, ai21_response))
            .register(WireFormat::with_prefix(
                "cohere",
                cohere_request,
                cohere_response,
            ))
            .register(WireFormat::with_prefix(
                "meta.llama",
                llama_request,
                llama_response,
            ))
    }
}

// ============================================================================
// Bedrock Generator
// ============================================================================

/// Where the generation model identifier comes from
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// Always the same model
    Fixed(String),

    /// Read from an environment variable on every call
    Env { var: String, default: String },
}

impl ModelSource {
    /// Current model identifier, reading the process environment
    pub fn resolve(&self) -> String {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Current model identifier from an arbitrary key lookup
    pub fn resolve_with<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            ModelSource::Fixed(model_id) => model_id.clone(),
            ModelSource::Env { var, default } => lookup(var)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.clone()),
        }
    }
}

/// Bedrock text generation client
pub struct BedrockGenerator {
    runtime: BedrockRuntime,
    model: ModelSource,
    registry: FormatRegistry,
}

impl BedrockGenerator {
    /// Create a new generator with the default format registry
    pub fn new(runtime: BedrockRuntime, model: ModelSource) -> Self {
        Self {
            runtime,
            model,
            registry: FormatRegistry::default(),
        }
    }

    /// Create from config; the model id follows `GENERATION_MODEL_ID` at call time
    pub fn from_config(config: &BedrockConfig) -> Result<Self> {
        let runtime = BedrockRuntime::from_config(config)?;
        Ok(Self::new(
            runtime,
            ModelSource::Env {
                var: GENERATION_MODEL_ENV.to_string(),
                default: config.generation_model_id.clone(),
            },
        ))
    }

    /// Replace the format registry
    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }
}

#[async_trait]
impl TextGenerator for BedrockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        request.validate()?;

        let model_id = self.model.resolve();
        let format = self.registry.resolve(&model_id)?;
        tracing::info!(model = %model_id, family = format.name(), "generating response");

        let body = format.build_request(request);
        let raw = self
            .runtime
            .invoke_model(&model_id, &body)
            .await
            .map_err(|e| RagError::GenerationError(format!("{model_id}: {e}")))?;

        match serde_json::from_str::<Value>(&raw) {
            Ok(response) => {
                let text = format.parse_response(&response);
                tracing::info!(model = %model_id, chars = text.len(), "response generated");
                Ok(text)
            }
            Err(e) => {
                tracing::error!(model = %model_id, error = %e, "unparseable generation response");
                Ok(format!("Error generating response: {e}"))
            }
        }
    }
}

/// Create a generation client from config
pub fn create_text_generator(config: &BedrockConfig) -> Result<Box<dyn TextGenerator>> {
    Ok(Box::new(BedrockGenerator::from_config(config)?))
}

// ============================================================================
// Tests
// ============================================================================
