//! RAG endpoint handlers
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use brag_rag::PipelineResponse;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// RAG request body
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RagRequest {
    /// User's question
    #[schema(example = "What is Amazon Bedrock?")]
    pub prompt: String,
}

/// Successful RAG response body
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RagAnswer {
    /// Generated answer
    #[schema(example = "Amazon Bedrock is a fully managed service...")]
    pub response: String,

    /// Whether any indexed context was found for the question
    pub context_retrieved: bool,
}

/// Error response body of the RAG endpoint
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RagErrorBody {
    #[schema(example = "No prompt provided")]
    pub error: String,
}

/// Answer a question from indexed context
///
/// The body is handed to the pipeline unparsed; invalid UTF-8 or JSON is a
/// pipeline error and answers 500. Documented under `/rag`; [`crate::api_doc`]
/// moves it to the configured endpoint.
#[utoipa::path(
    post,
    path = "/rag",
    tag = "rag",
    request_body = RagRequest,
    responses(
        (status = 200, description = "Answer generated", body = RagAnswer),
        (status = 400, description = "No prompt provided", body = RagErrorBody),
        (status = 500, description = "Pipeline failure", body = RagErrorBody)
    )
)]
pub async fn rag_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    state.increment_requests();

    let response = state.handler.handle_bytes(&body).await;
    into_http(response)
}

/// CORS preflight for the RAG endpoint
#[utoipa::path(
    options,
    path = "/rag",
    tag = "rag",
    responses(
        (status = 200, description = "Preflight accepted")
    )
)]
pub async fn preflight_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Convert a pipeline response into an HTTP response
fn into_http(response: PipelineResponse) -> Result<Response, AppError> {
    let PipelineResponse {
        status_code,
        headers,
        body,
    } = response;

    let status = StatusCode::from_u16(status_code)
        .map_err(|e| AppError::Internal(format!("invalid status {status_code}: {e}")))?;
    let mut http = (status, Json(body)).into_response();

    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AppError::Internal(format!("invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(&value)
            .map_err(|e| AppError::Internal(format!("invalid header value {value}: {e}")))?;
        http.headers_mut().insert(name, value);
    }

    Ok(http)
}
