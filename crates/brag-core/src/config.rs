//! Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development. Variable names follow the
//! deployment environment of the Lambda-hosted service.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Bedrock runtime and model configuration
    pub bedrock: BedrockConfig,

    /// OpenSearch connection and index configuration
    pub opensearch: OpenSearchConfig,

    /// Request and indexing pipeline configuration
    pub rag: RagConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup, then validate
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(&lookup);

        // Server
        env.string("API_HOST", &mut self.server.host);
        env.parse("API_PORT", &mut self.server.port)?;
        env.string("API_ENDPOINT_PATH", &mut self.server.endpoint_path);

        // Bedrock
        env.string("AWS_REGION", &mut self.bedrock.region);
        env.optional("BEDROCK_ENDPOINT", &mut self.bedrock.endpoint);
        env.optional("AWS_BEARER_TOKEN_BEDROCK", &mut self.bedrock.bearer_token);
        env.parse("BEDROCK_TIMEOUT_SECS", &mut self.bedrock.timeout_secs)?;
        env.string("EMBEDDING_MODEL_ID", &mut self.bedrock.embedding_model_id);
        env.string("GENERATION_MODEL_ID", &mut self.bedrock.generation_model_id);

        // OpenSearch
        env.string("OPENSEARCH_ENDPOINT", &mut self.opensearch.endpoint);
        env.parse("OPENSEARCH_PORT", &mut self.opensearch.port)?;
        env.string("OPENSEARCH_INDEX", &mut self.opensearch.index);
        env.flag("OPENSEARCH_USE_SSL", &mut self.opensearch.use_ssl);
        env.flag("OPENSEARCH_VERIFY_CERTS", &mut self.opensearch.verify_certs);
        env.parse("OPENSEARCH_AUTH", &mut self.opensearch.auth)?;
        env.optional("OPENSEARCH_USERNAME", &mut self.opensearch.username);
        env.optional("OPENSEARCH_PASSWORD", &mut self.opensearch.password);
        env.parse("VECTOR_DIMENSION", &mut self.opensearch.dimension)?;
        env.parse("OPENSEARCH_SHARDS", &mut self.opensearch.shards)?;
        env.parse("OPENSEARCH_REPLICAS", &mut self.opensearch.replicas)?;
        env.parse("OPENSEARCH_TIMEOUT_SECS", &mut self.opensearch.timeout_secs)?;

        // RAG pipeline
        env.parse("MAX_SEARCH_RESULTS", &mut self.rag.top_k)?;
        env.parse("GENERATION_MAX_TOKENS", &mut self.rag.max_tokens)?;
        env.parse("GENERATION_TEMPERATURE", &mut self.rag.temperature)?;
        env.parse("PIPELINE_TIMEOUT_SECS", &mut self.rag.pipeline_timeout_secs)?;
        env.flag("EXPOSE_ERROR_DETAILS", &mut self.rag.expose_error_details);
        env.parse("INDEX_BATCH_SIZE", &mut self.rag.batch_size)?;

        // Logging
        env.string("LOG_LEVEL", &mut self.logging.level);
        env.flag("LOG_JSON", &mut self.logging.json_format);

        self.validate()?;
        Ok(self)
    }

    /// Reject values no component can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.opensearch.dimension == 0 {
            return Err(invalid("VECTOR_DIMENSION", self.opensearch.dimension));
        }
        if self.rag.top_k == 0 {
            return Err(invalid("MAX_SEARCH_RESULTS", self.rag.top_k));
        }
        if self.rag.max_tokens == 0 {
            return Err(invalid("GENERATION_MAX_TOKENS", self.rag.max_tokens));
        }
        if !(0.0..=1.0).contains(&self.rag.temperature) {
            return Err(invalid("GENERATION_TEMPERATURE", self.rag.temperature));
        }
        if self.rag.batch_size == 0 {
            return Err(invalid("INDEX_BATCH_SIZE", self.rag.batch_size));
        }
        if !self.server.endpoint_path.starts_with('/') {
            return Err(invalid("API_ENDPOINT_PATH", &self.server.endpoint_path));
        }
        if self.opensearch.auth == OpenSearchAuth::Basic
            && (self.opensearch.username.is_none() || self.opensearch.password.is_none())
        {
            return Err(ConfigError::MissingRequired(
                "OPENSEARCH_USERNAME and OPENSEARCH_PASSWORD for basic auth".to_string(),
            ));
        }
        Ok(())
    }
}

fn invalid(key: &str, value: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Typed accessors over a key lookup
struct Lookup<'a, F>(&'a F);

impl<F> Lookup<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str, target: &mut String) {
        if let Some(value) = (self.0)(key) {
            *target = value;
        }
    }

    fn optional(&self, key: &str, target: &mut Option<String>) {
        if let Some(value) = (self.0)(key).filter(|v| !v.is_empty()) {
            *target = Some(value);
        }
    }

    fn flag(&self, key: &str, target: &mut bool) {
        if let Some(value) = (self.0)(key) {
            *target = value.trim().eq_ignore_ascii_case("true");
        }
    }

    fn parse<T: FromStr>(&self, key: &str, target: &mut T) -> Result<(), ConfigError> {
        if let Some(value) = (self.0)(key) {
            *target = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            })?;
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path of the RAG endpoint
    pub endpoint_path: String,

    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            endpoint_path: "/rag".to_string(),
            max_body_size: 1024 * 1024,
        }
    }
}

/// Bedrock runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BedrockConfig {
    /// AWS region hosting the runtime
    pub region: String,

    /// Explicit runtime endpoint (defaults to the regional endpoint)
    pub endpoint: Option<String>,

    /// Bedrock API key, sent as a bearer token
    #[serde(skip_serializing)]
    pub bearer_token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Embedding model identifier
    pub embedding_model_id: String,

    /// Generation model identifier
    pub generation_model_id: String,
}

impl BedrockConfig {
    /// Base URL of the runtime API
    pub fn runtime_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", self.region))
    }
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            bearer_token: None,
            timeout_secs: 60,
            embedding_model_id: "amazon.titan-embed-text-v1".to_string(),
            generation_model_id: "anthropic.claude-3-sonnet-20240229-v1:0".to_string(),
        }
    }
}

/// OpenSearch connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSearchConfig {
    /// Host name of the cluster (a scheme prefix is tolerated)
    pub endpoint: String,

    pub port: u16,

    /// Index holding the document records
    pub index: String,

    /// Use HTTPS
    pub use_ssl: bool,

    /// Verify the server certificate
    pub verify_certs: bool,

    pub auth: OpenSearchAuth,

    pub username: Option<String>,

    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Vector dimension (must match embedding model)
    pub dimension: usize,

    pub shards: u32,

    pub replicas: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenSearchConfig {
    /// Base URL built from scheme, host and port
    pub fn base_url(&self) -> String {
        let host = self
            .endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{scheme}://{host}:{}", self.port)
    }
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "localhost".to_string(),
            port: 9200,
            index: "rag-documents".to_string(),
            use_ssl: true,
            verify_certs: true,
            auth: OpenSearchAuth::None,
            username: None,
            password: None,
            dimension: 1536, // amazon.titan-embed-text-v1
            shards: 2,
            replicas: 1,
            timeout_secs: 30,
        }
    }
}

/// OpenSearch authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OpenSearchAuth {
    #[default]
    None,
    /// HTTP basic auth with an internal user
    Basic,
}

impl FromStr for OpenSearchAuth {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "basic" => Ok(Self::Basic),
            _ => Err(invalid("OPENSEARCH_AUTH", s)),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Number of neighbors retrieved per query (k)
    pub top_k: usize,

    /// Default generation budget
    pub max_tokens: u32,

    /// Default sampling temperature
    pub temperature: f64,

    /// Bound on one request pipeline invocation
    pub pipeline_timeout_secs: u64,

    /// Include the error message in 500 responses
    pub expose_error_details: bool,

    /// Documents per indexing batch
    pub batch_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_tokens: crate::DEFAULT_MAX_TOKENS,
            temperature: crate::DEFAULT_TEMPERATURE,
            pipeline_timeout_secs: 120,
            expose_error_details: true,
            batch_size: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::default().with_overrides(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.endpoint_path, "/rag");
        assert_eq!(config.opensearch.dimension, 1536);
        assert_eq!(config.opensearch.index, "rag-documents");
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.rag.max_tokens, 1000);
        assert!((config.rag.temperature - 0.7).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("OPENSEARCH_ENDPOINT", "search.example.com"),
            ("OPENSEARCH_PORT", "443"),
            ("OPENSEARCH_USE_SSL", "True"),
            ("OPENSEARCH_VERIFY_CERTS", "false"),
            ("MAX_SEARCH_RESULTS", "5"),
            ("GENERATION_MODEL_ID", "amazon.titan-text-express-v1"),
        ])
        .unwrap();

        assert_eq!(config.opensearch.base_url(), "https://search.example.com:443");
        assert!(!config.opensearch.verify_certs);
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(
            config.bedrock.generation_model_id,
            "amazon.titan-text-express-v1"
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            load(&[("OPENSEARCH_PORT", "not-a-port")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(load(&[("GENERATION_TEMPERATURE", "1.5")]).is_err());
        assert!(load(&[("MAX_SEARCH_RESULTS", "0")]).is_err());
        assert!(load(&[("OPENSEARCH_AUTH", "kerberos")]).is_err());
    }

    #[test]
    fn test_basic_auth_requires_credentials() {
        assert!(matches!(
            load(&[("OPENSEARCH_AUTH", "basic")]),
            Err(ConfigError::MissingRequired(_))
        ));
        assert!(load(&[
            ("OPENSEARCH_AUTH", "basic"),
            ("OPENSEARCH_USERNAME", "admin"),
            ("OPENSEARCH_PASSWORD", "secret"),
        ])
        .is_ok());
    }

    #[test]
    fn test_base_url_strips_scheme() {
        let config = OpenSearchConfig {
            endpoint: "http://localhost/".to_string(),
            use_ssl: false,
            ..Default::default()
        };
        assert_eq!(config.base_url(), "http://localhost:9200");
    }

    #[test]
    fn test_runtime_endpoint() {
        let mut config = BedrockConfig::default();
        assert_eq!(
            config.runtime_endpoint(),
            "https://bedrock-runtime.us-east-1.amazonaws.com"
        );
        config.endpoint = Some("http://127.0.0.1:4566".to_string());
        assert_eq!(config.runtime_endpoint(), "http://127.0.0.1:4566");
    }

    #[test]
    fn test_toml_parse() {
        let config: AppConfig = toml::from_str(
            r#"
            [opensearch]
            index = "kb"
            dimension = 768

            [rag]
            top_k = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.opensearch.index, "kb");
        assert_eq!(config.opensearch.dimension, 768);
        assert_eq!(config.rag.top_k, 4);
        assert_eq!(config.rag.max_tokens, 1000);
    }

    #[test]
    fn test_auth_parse() {
        assert_eq!("basic".parse::<OpenSearchAuth>().unwrap(), OpenSearchAuth::Basic);
        assert_eq!("NONE".parse::<OpenSearchAuth>().unwrap(), OpenSearchAuth::None);
        assert!("sigv4".parse::<OpenSearchAuth>().is_err());
    }
}
