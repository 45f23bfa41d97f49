mod cli;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use cli::{CliArgs, Command};
use newslens_api::{start_server, AppState};
use newslens_core::config::{EmbeddingConfig, NewslensConfig};
use newslens_core::error::NewslensError;
use newslens_ingest::{HttpFetcher, IngestionLoop};
use newslens_search::RateLimiter;
use newslens_storage::Database;
use newslens_vector::{DynEmbeddingService, MockEmbedding, OpenAiEmbedding, VectorStore};

/// How long shutdown waits for an in-flight ingestion cycle.
const INGEST_STOP_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Loading runs under a provisional subscriber so its warnings
    // (missing file, bad env values) are not lost before the configured
    // level is known.
    let config_file = args.resolve_config_path();
    let startup_filter = args.log_level.as_deref().unwrap_or("info");
    let startup_logger = tracing_subscriber::fmt()
        .with_env_filter(env_filter_or(startup_filter))
        .finish();
    let mut config = tracing::subscriber::with_default(startup_logger, || {
        let mut config = NewslensConfig::load_or_default(&config_file);
        config.apply_env();
        config
    });
    args.apply_to(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter_or(&config.general.log_level))
        .init();

    tracing::info!("Starting newslens v{}", env!("CARGO_PKG_VERSION"));
    config.validate()?;

    // Storage.
    let db_path =
        PathBuf::from(&config.storage.persist_directory).join(&config.storage.database_file);
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let embedder = build_embedder(&config.embedding)?;
    let store = Arc::new(VectorStore::open_dyn(db, embedder)?);
    tracing::info!(
        indexed = store.indexed(),
        dimensions = store.embedding_dimensions(),
        "Vector store ready"
    );

    if let Some(Command::ResetLimit { user_id }) = &args.command {
        RateLimiter::new(Arc::clone(&store), config.search.rate_limit)
            .reset(user_id)
            .await?;
        tracing::info!(user_id = %user_id, "Request counter reset");
        return Ok(());
    }

    // === Background ingestion ===
    let ingestion = if config.ingest.enabled {
        let fetcher = HttpFetcher::from_config(&config.ingest)?;
        let ingest = Arc::new(IngestionLoop::new(
            fetcher,
            Arc::clone(&store),
            &config.ingest,
        )?);
        let handle = Arc::clone(&ingest).spawn();
        Some((ingest, handle))
    } else {
        tracing::info!("Ingestion disabled");
        None
    };

    // === HTTP server (blocks until Ctrl-C) ===
    let state = AppState::new(config.clone(), store);
    let served = start_server(&config, state, shutdown_signal()).await;

    if let Some((ingest, handle)) = ingestion {
        ingest.shutdown();
        let abort = handle.abort_handle();
        match tokio::time::timeout(INGEST_STOP_GRACE, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Ingestion task ended abnormally"),
            Err(_) => {
                tracing::warn!("Ingestion cycle still running, aborting");
                abort.abort();
            }
        }
    }

    served?;
    tracing::info!("newslens stopped");
    Ok(())
}

/// Pick the embedding backend. Falls back to the offline mock when the
/// OpenAI provider has no credential.
fn build_embedder(
    config: &EmbeddingConfig,
) -> Result<Box<dyn DynEmbeddingService>, NewslensError> {
    match config.provider.as_str() {
        "mock" => {
            tracing::info!("Using mock embeddings");
            Ok(Box::new(MockEmbedding::new()))
        }
        "openai" if config.api_key.is_none() => {
            tracing::warn!("OPENAI_API_KEY not set, falling back to mock embeddings");
            Ok(Box::new(MockEmbedding::new()))
        }
        "openai" => {
            let service = OpenAiEmbedding::from_config(config)?;
            tracing::info!(model = %config.model, "Using OpenAI embeddings");
            Ok(Box::new(service))
        }
        other => Err(NewslensError::Config(format!(
            "Unknown embedding provider '{}'",
            other
        ))),
    }
}

/// `RUST_LOG` when set, otherwise `fallback`.
fn env_filter_or(fallback: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
