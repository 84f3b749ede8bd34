use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use johari::api;
use johari::manager::{SelectionPolicy, SessionManager};
use johari::models::Vocabulary;
use johari::store::{DocumentStore, MemoryStore, SqliteStore};

#[derive(Parser)]
#[command(name = "johari")]
#[command(about = "Johari Window exercises over a shared descriptor vocabulary")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Johari server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// Path to the SQLite database (defaults to the platform data dir)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Keep all documents in memory instead of SQLite
        #[arg(long)]
        memory: bool,

        /// Load the descriptor vocabulary from a file, one term per line
        #[arg(long)]
        vocabulary: Option<PathBuf>,

        /// Cap the number of descriptors per submission
        #[arg(long)]
        max_selections: Option<usize>,
    },
    /// Print the descriptor vocabulary and exit
    Vocabulary {
        /// Load the vocabulary from a file instead of the built-in list
        #[arg(long)]
        vocabulary: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "johari=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_vocabulary(path: Option<PathBuf>) -> anyhow::Result<Vocabulary> {
    match path {
        Some(path) => Vocabulary::load(&path),
        None => Ok(Vocabulary::standard()),
    }
}

async fn serve(
    port: u16,
    db: Option<PathBuf>,
    memory: bool,
    vocabulary: Option<PathBuf>,
    max_selections: Option<usize>,
) -> anyhow::Result<()> {
    tracing::info!("Starting Johari server on port {}", port);

    let vocabulary = load_vocabulary(vocabulary)?;
    let policy = match max_selections {
        Some(limit) => SelectionPolicy::capped(limit),
        None => SelectionPolicy::from_env(),
    };

    let store: Arc<dyn DocumentStore> = if memory {
        Arc::new(MemoryStore::new())
    } else {
        let store = match db {
            Some(path) => SqliteStore::open(path)?,
            None => SqliteStore::open_default()?,
        };
        store.migrate()?;
        Arc::new(store)
    };

    let manager = SessionManager::new(store, vocabulary, policy);
    let app = api::create_router(manager);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Johari server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve {
            port,
            db,
            memory,
            vocabulary,
            max_selections,
        }) => {
            serve(port, db, memory, vocabulary, max_selections).await?;
        }
        Some(Commands::Vocabulary { vocabulary }) => {
            let vocabulary = load_vocabulary(vocabulary)?;
            for term in vocabulary.terms() {
                println!("{term}");
            }
        }
        None => {
            // Default: start server
            serve(4000, None, false, None, None).await?;
        }
    }

    Ok(())
}
