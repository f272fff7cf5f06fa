//! Bedrock runtime invoker
//!
//! Thin HTTP wrapper around the `InvokeModel` operation shared by the
//! embedding and generation adapters. Request and response bodies are
//! model-specific JSON documents; this module only moves bytes.
//!
//! Author: hephaex@gmail.com

use crate::config::BedrockConfig;
use crate::{RagError, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Failure of one `InvokeModel` call
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Bedrock runtime client
#[derive(Debug, Clone)]
pub struct BedrockRuntime {
    client: Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl BedrockRuntime {
    /// Create a runtime client for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            bearer_token: None,
        }
    }

    /// Create from config
    pub fn from_config(config: &BedrockConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.runtime_endpoint(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Authenticate with a Bedrock API key
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn invoke_url(&self, model_id: &str) -> String {
        format!(
            "{}/model/{}/invoke",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(model_id)
        )
    }

    /// Invoke a model and return the raw response body
    pub async fn invoke_model(
        &self,
        model_id: &str,
        body: &Value,
    ) -> std::result::Result<String, InvokeError> {
        let mut request = self
            .client
            .post(self.invoke_url(model_id))
            .header("Accept", "application/json")
            .json(body);

        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(InvokeError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_invoke_url() {
        let runtime = BedrockRuntime::new("https://bedrock-runtime.us-east-1.amazonaws.com/");
        assert_eq!(
            runtime.invoke_url("meta.llama3-8b-instruct-v1:0"),
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/meta.llama3-8b-instruct-v1%3A0/invoke"
        );
    }

    #[tokio::test]
    async fn test_invoke_model_posts_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/model/amazon.titan-embed-text-v1/invoke"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({"inputText": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"embedding":[0.1]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let runtime = BedrockRuntime::new(server.uri()).with_bearer_token("secret");
        let body = runtime
            .invoke_model("amazon.titan-embed-text-v1", &json!({"inputText": "hello"}))
            .await
            .unwrap();

        assert_eq!(body, r#"{"embedding":[0.1]}"#);
    }

    #[tokio::test]
    async fn test_invoke_model_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("AccessDeniedException"))
            .mount(&server)
            .await;

        let runtime = BedrockRuntime::new(server.uri());
        let err = runtime
            .invoke_model("amazon.titan-embed-text-v1", &json!({}))
            .await
            .unwrap_err();

        match err {
            InvokeError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "AccessDeniedException");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
