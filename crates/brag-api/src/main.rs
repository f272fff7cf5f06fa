//! Bedrock RAG API Server
//!
//! Serves the RAG request pipeline over HTTP.
//!
//! Author: hephaex@gmail.com

use brag_api::{create_router, state::AppState};
use brag_core::config::{AppConfig, LoggingConfig};
use std::sync::Arc;

/// Optional TOML file layered under the environment
const CONFIG_FILE_ENV: &str = "BRAG_CONFIG";

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var(CONFIG_FILE_ENV) {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_config()?;
    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let endpoint = config.server.endpoint_path.clone();
    tracing::info!(
        embedding_model = %config.bedrock.embedding_model_id,
        generation_model = %config.bedrock.generation_model_id,
        index = %config.opensearch.index,
        "configuration loaded"
    );

    // Create application state
    let state = Arc::new(AppState::from_config(config)?);

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Bedrock RAG API starting on http://{}", addr);
    tracing::info!("RAG endpoint at POST http://{}{}", addr, endpoint);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
