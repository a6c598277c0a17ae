use chrono::Utc;
use clap::{Parser, Subcommand};
use loa_search_core::{
    collection_stats, ChromaStore, ChunkType, GeminiEmbedder, IndexingPipeline, SearchFilters,
    SearchService, Section, VectorStore, EMBEDDING_DIMENSION, GEMINI_EMBEDDING_MODEL,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod server;

#[derive(Parser)]
#[command(name = "loa-search-api", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// ChromaDB base URL
    #[arg(long, default_value = "http://localhost:8000")]
    chroma_url: String,

    /// Chroma collection name
    #[arg(long, default_value = "loa_2026")]
    collection: String,

    /// Path to the LOA 2026 PDF
    #[arg(long, default_value = "LOA-2026-numerado.pdf")]
    pdf_path: PathBuf,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: String,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Bind address for the HTTP server.
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
    },
    /// Extract, embed, and store the configured PDF.
    Index,
    /// Run a semantic query from the command line.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of results to return.
        #[arg(long, default_value = "5")]
        top_k: usize,
        /// Restrict results to a budget section.
        #[arg(long)]
        section: Option<Section>,
        /// Restrict results to a chunk type.
        #[arg(long)]
        chunk_type: Option<ChunkType>,
    },
    /// Show collection statistics.
    Stats,
    /// Delete and recreate the collection.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "loa-search boot"
    );

    match cli.command {
        Command::Serve { bind } => {
            let state = server::AppState::new(
                &cli.chroma_url,
                &cli.collection,
                cli.gemini_api_key,
                cli.pdf_path,
            )?;
            server::run(state, bind).await?;
        }
        Command::Index => {
            let embedder = GeminiEmbedder::new(cli.gemini_api_key);
            let store = ChromaStore::new(&cli.chroma_url, &cli.collection, EMBEDDING_DIMENSION)?;
            let pipeline =
                IndexingPipeline::new(embedder, store).with_collection_name(&cli.collection);

            let report = pipeline.index_pdf(&cli.pdf_path).await?;
            println!(
                "{} of {} chunks indexed into {} ({} degraded embeddings)",
                report.total_inserted,
                report.total_chunks,
                report.collection_name,
                report.degraded_embeddings
            );
        }
        Command::Search {
            query,
            top_k,
            section,
            chunk_type,
        } => {
            let filters = SearchFilters {
                section,
                chunk_type,
                ..Default::default()
            };
            let service = SearchService::new(
                GeminiEmbedder::new(cli.gemini_api_key),
                ChromaStore::new(&cli.chroma_url, &cli.collection, EMBEDDING_DIMENSION)?,
            );

            let response = service
                .search(&query, top_k, (!filters.is_empty()).then_some(&filters))
                .await?;

            println!("query: {}", response.query);
            for hit in response.results {
                println!(
                    "[{}] score={:.4} page={} section={} type={}",
                    hit.rank,
                    hit.score,
                    hit.metadata.page,
                    hit.metadata.section,
                    hit.metadata.chunk_type
                );
                println!("  {}", hit.text);
            }
        }
        Command::Stats => {
            let store = ChromaStore::new(&cli.chroma_url, &cli.collection, EMBEDDING_DIMENSION)?;
            let stats = collection_stats(
                &store,
                &cli.collection,
                GEMINI_EMBEDDING_MODEL,
                EMBEDDING_DIMENSION,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Clear => {
            let store = ChromaStore::new(&cli.chroma_url, &cli.collection, EMBEDDING_DIMENSION)?;
            let deleted = store.reset().await?;
            println!("collection cleared, {deleted} documents deleted");
        }
    }

    Ok(())
}
