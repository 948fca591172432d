#[cfg(feature = "cli")]
use std::{io, sync::Arc};

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use medscout::{
    config::{Config, EmbeddingBackend},
    embedding::{Embedder, HashingEmbedder, LlamaEmbedder},
    interactive,
    label_source::OpenFdaClient,
    medication_db::MedicationDatabase,
    retrieval::{display, RetrievalOrchestrator},
    similarity_store::SimilarityStore,
    telemetry,
    utils::TextUtils,
};

#[cfg(feature = "cli")]
const DEMO_QUERIES: [&str; 3] = ["migraine", "drowsiness", "seasonal allergies"];

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "medscout")]
#[command(about = "Symptom-based medication lookup backed by a similarity cache of openFDA labels")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Start the interactive prompt (default)
    Interactive,
    /// Run one symptom query
    Search {
        /// Symptom description
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Show drug interaction notes from the label
    Interactions {
        /// Brand or generic name
        drug: String,
    },
    /// List past queries, newest first
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Rank past queries by similarity to this text instead
        #[arg(long)]
        like: Option<String>,
    },
    /// Show cache and history counts
    Stats,
    /// Run the example queries
    Demo,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".into());
    let _log_guard = telemetry::init_tracing(Some(std::path::Path::new(&log_dir)));

    let cfg = Config::from_env()?;
    cfg.print_config();

    let orchestrator = build_orchestrator(&cfg)?;

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Interactive => {
            let stdin = io::stdin();
            interactive::run_session(&orchestrator, stdin.lock(), io::stdout()).await?;
        }
        Commands::Search { query } => {
            let outcome = orchestrator.retrieve(&query.join(" ")).await;
            let mut out = io::stdout();
            display::write_outcome(&mut out, &outcome)?;
            display::write_disclaimer(&mut out)?;
        }
        Commands::Interactions { drug } => {
            let notes = orchestrator.interactions(&drug).await;
            display::write_interactions(&mut io::stdout(), &drug, &notes)?;
        }
        Commands::History { limit, like } => handle_history(orchestrator.store(), limit, like).await?,
        Commands::Stats => {
            let stats = orchestrator.store().stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Demo => {
            println!("Medical Assistant Started");
            println!("{}", "-".repeat(50));
            let mut out = io::stdout();
            for query in DEMO_QUERIES {
                println!("\nProcessing example query: '{}'", query);
                let outcome = orchestrator.retrieve(query).await;
                display::write_outcome(&mut out, &outcome)?;
            }
            display::write_disclaimer(&mut out)?;
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn build_orchestrator(cfg: &Config) -> Result<RetrievalOrchestrator> {
    let embedder: Arc<dyn Embedder> = match cfg.embedding_backend {
        EmbeddingBackend::Llama => Arc::new(LlamaEmbedder::new(
            &cfg.embedding_url,
            &cfg.embedding_model,
            cfg.embedding_dim,
            cfg.http_timeout(),
        )?),
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(cfg.embedding_dim)),
    };

    let database = Arc::new(
        MedicationDatabase::new(&cfg.db_path)
            .with_context(|| format!("Failed to open database at {}", cfg.db_path.display()))?,
    );
    let store = Arc::new(SimilarityStore::new(database, embedder, cfg.store_config())?);
    let label_source = Arc::new(OpenFdaClient::new(
        &cfg.fda_base_url,
        &cfg.fda_api_key,
        cfg.http_timeout(),
    )?);

    Ok(RetrievalOrchestrator::new(store, label_source, cfg.orchestrator_config()))
}

#[cfg(feature = "cli")]
async fn handle_history(store: &SimilarityStore, limit: usize, like: Option<String>) -> Result<()> {
    match like {
        Some(text) => {
            let similar = store.find_similar_queries(&text, limit).await?;
            if similar.is_empty() {
                println!("No past queries recorded.");
            }
            for query in similar {
                println!(
                    "{:.2}  {}  ({} results)",
                    query.similarity,
                    query.query_text,
                    query.results_count.unwrap_or(0)
                );
            }
        }
        None => {
            let events = store.recent_queries(limit)?;
            if events.is_empty() {
                println!("No past queries recorded.");
            }
            for event in events {
                println!(
                    "{}  {}  ({} results)",
                    event.created_at.format("%Y-%m-%d %H:%M:%S"),
                    TextUtils::truncate_chars(&event.query_text, 60),
                    event.results_count.unwrap_or(0)
                );
            }
        }
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
