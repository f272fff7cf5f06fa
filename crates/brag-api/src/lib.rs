//! Bedrock RAG API - HTTP server
//!
//! Hosts the request pipeline behind `POST {endpoint}` with CORS headers on
//! every response, a liveness probe and the OpenAPI document.
//!
//! Author: hephaex@gmail.com

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use brag_core::AppConfig;
use brag_rag::RagHandler;
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document for the service
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::rag::rag_handler,
        handlers::rag::preflight_handler,
        handlers::health::health_check,
    ),
    components(schemas(
        handlers::rag::RagRequest,
        handlers::rag::RagAnswer,
        handlers::rag::RagErrorBody,
        handlers::health::HealthResponse,
        error::ApiError,
    )),
    tags(
        (name = "rag", description = "Retrieval-augmented question answering"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Path the RAG operations are documented under in [`ApiDoc`]
const DOCUMENTED_ENDPOINT: &str = "/rag";

/// OpenAPI document with the RAG operations under `endpoint_path`
pub fn api_doc(endpoint_path: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    if let Some(item) = doc.paths.paths.remove(DOCUMENTED_ENDPOINT) {
        doc.paths.paths.insert(endpoint_path.to_string(), item);
    }
    doc
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_body_size;
    let doc = api_doc(&state.config.server.endpoint_path);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(routes::api_routes(&state.config.server.endpoint_path))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc))
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn(middleware::cors_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router over an injected pipeline with default configuration
pub fn create_router_for_testing(handler: RagHandler) -> Router {
    create_router(Arc::new(AppState::new(
        AppConfig::default(),
        Arc::new(handler),
    )))
}
