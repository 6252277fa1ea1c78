//! # Doc Annotator CLI (`annotator`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `annotator serve` | Start the webhook HTTP server |
//! | `annotator analyze --id N --path P` | Annotate one stored document now |
//! | `annotator prompt "<text>"` | Send a text-only prompt to the model |
//! | `annotator init` | Create the SQLite analyses table |
//!
//! ## Examples
//!
//! ```bash
//! annotator serve --config ./config/annotator.toml
//! annotator analyze --id 42 --path docs/w2.pdf
//! RUST_LOG=doc_annotator=debug annotator prompt "¿Qué es un formulario 1099-NEC?"
//! ```

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doc_annotator::config::{load_config, load_settings, PersistenceBackend};
use doc_annotator::models::IngestionEvent;
use doc_annotator::pipeline::Pipeline;
use doc_annotator::server::run_server;
use doc_annotator::store_sqlite::SqliteAnalysisStore;

/// Doc Annotator: annotate uploaded documents with a generative model.
///
/// Secrets (`GEMINI_API_KEY`, `SUPABASE_URL`, `SUPABASE_SERVICE_KEY`) are
/// read from the environment or a `.env` file.
#[derive(Parser)]
#[command(name = "annotator", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/annotator.toml` when it exists, otherwise
    /// built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook HTTP server.
    Serve,

    /// Annotate one stored document and print the analysis.
    Analyze {
        /// Document row id, stored as `document_id`.
        #[arg(long)]
        id: i64,

        /// Object path inside the configured bucket.
        #[arg(long)]
        path: String,

        #[arg(long)]
        client_id: Option<i64>,
    },

    /// Send a text-only prompt and print the completion.
    Prompt {
        text: String,
    },

    /// Create the SQLite analyses table (sqlite backend only).
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_annotator=info,annotator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve => {
            let config = load_config(config_path)?;
            run_server(&config).await?;
        }
        Commands::Analyze {
            id,
            path,
            client_id,
        } => {
            let config = load_config(config_path)?;
            let pipeline = Pipeline::from_config(&config).await?;
            let analysis = pipeline
                .analyze_document(&IngestionEvent {
                    record_id: id,
                    client_id,
                    storage_path: path,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Commands::Prompt { text } => {
            let config = load_config(config_path)?;
            let pipeline = Pipeline::from_config(&config).await?;
            println!("{}", pipeline.annotate_prompt(&text).await?);
        }
        Commands::Init => init(config_path).await?,
    }

    Ok(())
}

/// Secrets are not needed here, so only settings are loaded.
async fn init(config_path: Option<&Path>) -> Result<()> {
    let settings = load_settings(config_path)?;
    if settings.persistence.backend != PersistenceBackend::Sqlite {
        bail!("init only applies to persistence.backend = \"sqlite\"");
    }

    let store =
        SqliteAnalysisStore::open(&settings.persistence.sqlite_path, &settings.persistence.table)
            .await?;
    store.run_migrations().await?;

    println!(
        "Database initialized: {} ({})",
        settings.persistence.sqlite_path.display(),
        settings.persistence.table
    );
    Ok(())
}
