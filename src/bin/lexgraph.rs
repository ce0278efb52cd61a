//! LexGraph CLI — statutory retrieval engine.
//!
//! Usage:
//!   lexgraph ingest <file.json> [--db path]
//!   lexgraph search <query> [--mode rne|ine] [--db path]
//!   lexgraph relations <query> [--db path]
//!   lexgraph rebalance [--db path]
//!   lexgraph stats [--db path]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lexgraph",
    version,
    about = "Graph-aware semantic retrieval over hierarchical statutes"
)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a parsed document (JSON: { law_name, units })
    Ingest {
        /// Path to the parsed-document JSON file
        file: PathBuf,
    },
    /// Search paragraphs
    Search {
        /// Natural-language query
        query: String,
        /// Retrieval mode: rne (range) or ine (k-nearest)
        #[arg(long, default_value = "rne")]
        mode: String,
        /// Semantic radius for rne
        #[arg(long)]
        threshold: Option<f32>,
        /// Result count for ine
        #[arg(long, default_value_t = 5)]
        k: usize,
    },
    /// Search relation contexts
    Relations {
        /// Natural-language query
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },
    /// Split, merge, and relink domains
    Rebalance,
    /// Print engine statistics as JSON
    Stats,
}

#[cfg(feature = "embeddings")]
fn database_path(db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexgraph")
            .join("lexgraph.db")
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let cli = Cli::parse();
    let code = run(cli).await;
    std::process::exit(code);
}

#[cfg(not(feature = "embeddings"))]
async fn run(_cli: Cli) -> i32 {
    eprintln!("error: this binary was built without the `embeddings` feature;");
    eprintln!("rebuild with `--features embeddings` to run the CLI");
    1
}

#[cfg(feature = "embeddings")]
async fn run(cli: Cli) -> i32 {
    use lexgraph::{
        Document, Embedder, EmbeddingProviders, FastEmbedEmbedder, LexGraphApi, LexGraphConfig,
        NoopNamer, OpenStore, RetryingStore, RouteMode, SearchRequest, SqliteStore,
    };
    use std::sync::Arc;
    use std::time::Duration;

    let mut config = match cli.config {
        Some(path) => {
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(err) => {
                    eprintln!("error: cannot read {}: {err}", path.display());
                    return 1;
                }
            };
            match serde_json::from_str::<LexGraphConfig>(&raw) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("error: malformed config: {err}");
                    return 1;
                }
            }
        }
        None => LexGraphConfig::default(),
    };

    let embedder = match FastEmbedEmbedder::default_model() {
        Ok(embedder) => Arc::new(embedder),
        Err(err) => {
            eprintln!("error: cannot load embedding model: {err}");
            return 1;
        }
    };
    // The CLI runs both providers off one local model; deployments with a
    // separate relation model inject their own providers through the library.
    config.node_embedding_dim = embedder.dimension();
    config.relation_embedding_dim = embedder.dimension();
    let providers = EmbeddingProviders::new(embedder.clone(), embedder);

    let store = match SqliteStore::open(database_path(cli.db)) {
        Ok(store) => Arc::new(RetryingStore::new(
            store,
            config.store_retry_attempts,
            Duration::from_millis(config.store_retry_base_ms),
        )),
        Err(err) => {
            eprintln!("error: cannot open store: {err}");
            return 1;
        }
    };

    // The constructor re-hydrates any partition a previous run mirrored
    // into the database, so routing state survives process restarts.
    let api = match LexGraphApi::new(config, store, providers, Arc::new(NoopNamer)).await {
        Ok(api) => api,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };

    let outcome = match cli.command {
        Commands::Ingest { file } => {
            let raw = match std::fs::read_to_string(&file) {
                Ok(raw) => raw,
                Err(err) => {
                    eprintln!("error: cannot read {}: {err}", file.display());
                    return 1;
                }
            };
            let document: Document = match serde_json::from_str(&raw) {
                Ok(document) => document,
                Err(err) => {
                    eprintln!("error: malformed document: {err}");
                    return 1;
                }
            };
            api.ingest(document).await.map(|report| {
                println!(
                    "ingested {}: {} units, {} paragraphs embedded, {} relations, rebalanced: {}",
                    report.law_name,
                    report.units_stored,
                    report.paragraphs_embedded,
                    report.relations_embedded,
                    report.rebalanced
                );
            })
        }
        Commands::Search {
            query,
            mode,
            threshold,
            k,
        } => {
            let result = match mode.as_str() {
                "rne" => {
                    api.search(
                        &query,
                        SearchRequest::Rne {
                            threshold,
                            initial_k: None,
                            max_results: None,
                        },
                    )
                    .await
                }
                "ine" => {
                    api.search(&query, SearchRequest::Ine { k, initial_k: None })
                        .await
                }
                "routed" => api
                    .search_routed(&query, RouteMode::Centroid { top_r: 3 }, k, None)
                    .await
                    .map(|outcome| outcome.hits),
                other => {
                    eprintln!("error: unknown mode '{other}' (expected rne, ine, or routed)");
                    return 1;
                }
            };
            result.map(|hits| {
                for hit in hits {
                    println!("{:.3}  {}  [{} {}]", hit.relevance, hit.full_id, hit.law, hit.article);
                }
            })
        }
        Commands::Relations { query, top_k } => {
            api.search_relations(&query, top_k).await.map(|hits| {
                for hit in hits {
                    println!("{:.3}  {} -> {}: {}", hit.similarity, hit.from_id, hit.to_id, hit.context_text);
                }
            })
        }
        Commands::Rebalance => api.rebalance().await.map(|report| {
            println!(
                "rebalanced: {} splits, {} merges, {} neighbor pairs",
                report.splits, report.merges, report.neighbor_pairs
            );
        }),
        Commands::Stats => match api.stats().await {
            Ok(stats) => {
                match serde_json::to_string_pretty(&stats) {
                    Ok(json) => println!("{json}"),
                    Err(err) => {
                        eprintln!("error: {err}");
                        return 1;
                    }
                }
                Ok(())
            }
            Err(err) => Err(err),
        },
    };

    match outcome {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}
