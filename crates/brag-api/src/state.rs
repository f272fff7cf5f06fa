//! Application state management
//!
//! Author: hephaex@gmail.com

use brag_core::AppConfig;
use brag_rag::RagHandler;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Request pipeline
    pub handler: Arc<RagHandler>,
    /// Server start time
    pub start_time: Instant,
    /// Pipeline invocations served
    pub request_count: AtomicU64,
}

impl AppState {
    /// Create new application state
    pub fn new(config: AppConfig, handler: Arc<RagHandler>) -> Self {
        Self {
            config,
            handler,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    /// Build state with Bedrock and OpenSearch adapters from config
    pub fn from_config(config: AppConfig) -> brag_core::Result<Self> {
        let handler = RagHandler::from_app_config(&config)?;
        Ok(Self::new(config, Arc::new(handler)))
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
