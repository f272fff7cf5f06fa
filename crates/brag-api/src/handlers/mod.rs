//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod health;
pub mod rag;

use crate::error::AppError;
use axum::http::Uri;

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
