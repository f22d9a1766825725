//! Command-line companion for the RAG pipeline: build the vector store from
//! a corpus directory, run similarity queries against it, or ask a full
//! retrieval-augmented question.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ragserve::chunking::ChunkPolicy;
use ragserve::config::{self, Config};
use ragserve::embedding::build_embedding_client;
use ragserve::llm::GeminiClient;
use ragserve::loader::load_documents;
use ragserve::rag::RagSearch;
use ragserve::store::{BuildMode, VectorStore};

#[derive(Parser)]
#[command(name = "ragctl", about = "Build and query the ragserve vector store")]
struct Cli {
    /// Store directory override (defaults to STORE_DIR).
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build (or extend) the vector store from a corpus directory.
    Build {
        /// Corpus directory override (defaults to CORPUS_DIR).
        #[arg(long)]
        corpus: Option<PathBuf>,
        /// Append to the existing records instead of replacing them.
        #[arg(long)]
        append: bool,
    },
    /// Run a similarity query and print the ranked hits.
    Query {
        /// Query text.
        text: String,
        /// Number of hits to return.
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Answer a question with retrieval-augmented generation.
    Ask {
        /// Question text.
        text: String,
        /// Number of chunks retrieved as context.
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    config::init_config();
    ragserve::logging::init_tracing();
    let config = config::get_config();
    let cli = Cli::parse();

    let store_dir = cli.store.unwrap_or_else(|| config.store_dir.clone());
    let mut store = open_store(config, store_dir)?;

    match cli.command {
        Command::Build { corpus, append } => {
            let corpus_dir = corpus.unwrap_or_else(|| config.corpus_dir.clone());
            let documents = load_documents(&corpus_dir)
                .with_context(|| format!("loading corpus from {}", corpus_dir.display()))?;
            let mode = if append {
                // Appending to an existing store requires its records in memory.
                store.load().context("loading existing store for append")?;
                BuildMode::Append
            } else {
                BuildMode::Replace
            };
            let summary = store
                .build_from_documents(&documents, mode)
                .await
                .context("building vector store")?;
            store.persist().context("persisting vector store")?;
            println!(
                "indexed {} chunks from {} documents ({} duplicates skipped), {} records total",
                summary.chunks,
                summary.documents,
                summary.skipped_duplicates,
                store.len()
            );
        }
        Command::Query { text, top_k } => {
            store.load().context("loading vector store")?;
            let hits = store.query(&text, top_k).await.context("querying store")?;
            if hits.is_empty() {
                println!("no matches");
            }
            for (rank, hit) in hits.iter().enumerate() {
                println!(
                    "{:>2}. distance={:.4} source={}\n    {}",
                    rank + 1,
                    hit.distance,
                    hit.metadata.source,
                    first_line(&hit.metadata.text)
                );
            }
        }
        Command::Ask { text, top_k } => {
            let llm = Arc::new(GeminiClient::from_config(config)?);
            let rag = RagSearch::open_or_build(store, llm, &config.corpus_dir)
                .await
                .context("opening vector store")?;
            let outcome = rag
                .search_and_summarize(&text, top_k)
                .await
                .context("answering question")?;
            println!("{}", outcome.into_text());
        }
    }
    Ok(())
}

fn open_store(config: &Config, dir: PathBuf) -> Result<VectorStore> {
    let embedder = build_embedding_client(config).context("initializing embedding client")?;
    let policy = ChunkPolicy::for_model(
        &config.embedding_model,
        config.chunk_max_tokens,
        config.chunk_overlap,
    );
    Ok(VectorStore::new(
        dir,
        embedder,
        policy,
        config.embedding_model.clone(),
    ))
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
