//! DocSense service binary.
//!
//! Configuration comes from the environment (see `docsense_core::settings`),
//! optionally preloaded from a `.env` file.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use docsense_core::logging;
use docsense_core::settings::{EmbeddingProvider, LlmProvider, Settings};
use docsense_rag::ollama::OllamaClient;
use docsense_rag::Pipeline;
use docsense_service::api::build_router;
use docsense_service::AppState;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "docsense", about = "Retrieval-augmented question answering over indexed documents")]
struct CliArgs {
    /// Port to listen on (overrides RAG_PORT)
    #[arg(long, short)]
    port: Option<u16>,

    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    match &args.env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    let settings = Settings::from_env()?;
    logging::init(&settings);

    let pipeline = Pipeline::from_settings(&settings)?;
    let ready = pipeline.clone();
    tokio::task::spawn_blocking(move || ready.ensure_ready()).await??;
    info!(
        collection = %pipeline.retriever().collection(),
        index = ?settings.index_backend,
        embeddings = ?settings.embedding_provider,
        llm = %settings.llm_provider,
        "pipeline ready"
    );

    if settings.embedding_provider == EmbeddingProvider::Ollama
        || settings.llm_provider == LlmProvider::Ollama
    {
        let client = OllamaClient::new(&settings.ollama_url)?;
        let health = tokio::task::spawn_blocking(move || client.health_check()).await?;
        if let Err(e) = health {
            warn!(code = %e.code, url = %settings.ollama_url, "ollama is not reachable yet");
        }
    }

    let app = build_router(AppState::new(pipeline));
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port.unwrap_or(settings.rag_port)));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, env = ?settings.rag_env, "docsense listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("docsense shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
