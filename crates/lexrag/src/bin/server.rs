//! lexrag server binary
//!
//! Run with: cargo run -p lexrag --bin lexrag-server -- --config lexrag.toml

use clap::Parser;
use lexrag::{config::RagConfig, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "lexrag-server", version, about = "Legal document RAG server")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "LEXRAG_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lexrag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                          lexrag                           ║
║        Legal Document Ingestion and Q&A over RAG          ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.llm.embed_model);
    tracing::info!("  - Embedding dimensions: {}", config.llm.dimensions);
    tracing::info!("  - Chat model: {}", config.llm.chat_model);
    tracing::info!("  - Chunk size: {} tokens", config.chunking.max_tokens);
    tracing::info!("  - Vector index: {:?}", config.vector_index.backend);

    if config.llm.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; embedding and chat calls will be rejected");
    }

    let server = RagServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/documents - Upload a document");
    println!("  POST /api/ingest    - Extract and chunk");
    println!("  POST /api/embed     - Embed chunks");
    println!("  POST /api/query     - Ask questions");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
