//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::rag;
use crate::state::AppState;
use axum::{routing::post, Router};
use std::sync::Arc;

/// Routes serving the request pipeline at `endpoint_path`
pub fn api_routes(endpoint_path: &str) -> Router<Arc<AppState>> {
    Router::new().route(
        endpoint_path,
        post(rag::rag_handler).options(rag::preflight_handler),
    )
}
