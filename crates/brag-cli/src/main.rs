//! Bedrock RAG CLI - Command-line interface
//!
//! Usage:
//!   brag index [--file <path> | --create [--output <path>]] [--batch-size <n>] [--dry-run]
//!   brag query --prompt <question>
//!   brag sample [--output <path>]

mod sample;

use anyhow::bail;
use brag_core::config::{AppConfig, LoggingConfig};
use brag_core::{check_embedding_dimension, EmbeddingClient, VectorStore};
use brag_rag::{Indexer, RagHandler};
use brag_vector::{create_embedding_client, InMemoryStore, OpenSearchStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "brag")]
#[command(about = "Bedrock RAG indexing and query CLI")]
#[command(version)]
struct Cli {
    /// Environment file loaded before reading configuration
    #[arg(short, long, global = true, default_value = ".env")]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed documents and index them into the vector store
    Index {
        /// JSON file holding an array of documents
        #[arg(short, long, conflicts_with = "create")]
        file: Option<PathBuf>,

        /// Create the sample documents, save them and index them
        #[arg(short, long)]
        create: bool,

        /// Where --create saves the sample documents
        #[arg(short, long, default_value = "sample_data.json")]
        output: PathBuf,

        /// Documents per batch (defaults to INDEX_BATCH_SIZE)
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Index into an in-memory store instead of OpenSearch
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the request pipeline locally
    Query {
        /// Question to ask
        #[arg(short, long)]
        prompt: String,
    },
    /// Write the sample documents to a file
    Sample {
        #[arg(short, long, default_value = "sample_data.json")]
        output: PathBuf,
    },
}

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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_loaded = dotenvy::from_path(&cli.env_file);
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);

    if let Err(e) = env_loaded {
        tracing::warn!(path = %cli.env_file.display(), error = %e, "environment file not loaded");
    }

    match cli.command {
        Commands::Index {
            file,
            create,
            output,
            batch_size,
            dry_run,
        } => {
            let documents = if create {
                tracing::info!("Creating sample data");
                let documents = sample::sample_documents();
                sample::save_documents(&documents, &output)?;
                documents
            } else if let Some(path) = file {
                tracing::info!("Loading sample data from {}", path.display());
                sample::load_documents(&path)?
            } else {
                tracing::info!("Using default sample data");
                sample::sample_documents()
            };

            if documents.is_empty() {
                tracing::error!("No documents to index");
                bail!("no documents to index");
            }

            let embedder: Arc<dyn EmbeddingClient> =
                Arc::from(create_embedding_client(&config.bedrock)?);
            check_embedding_dimension(embedder.as_ref(), config.opensearch.dimension)?;
            let store: Arc<dyn VectorStore> = if dry_run {
                Arc::new(InMemoryStore::new(
                    config.opensearch.index.clone(),
                    config.opensearch.dimension,
                ))
            } else {
                Arc::new(OpenSearchStore::from_config(&config.opensearch))
            };

            let batch_size = batch_size.unwrap_or(config.rag.batch_size);
            let report = Indexer::new(embedder, store)
                .index_all(&documents, batch_size)
                .await?;

            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.all_succeeded() {
                tracing::warn!(
                    failed = report.failed_batches(),
                    "some batches were not indexed"
                );
            }
        }
        Commands::Query { prompt } => {
            let handler = RagHandler::from_app_config(&config)?;
            let response = handler.handle(&sample::query_event(&prompt)).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Sample { output } => {
            sample::save_documents(&sample::sample_documents(), &output)?;
            println!("Saved sample documents to {}", output.display());
        }
    }

    Ok(())
}
