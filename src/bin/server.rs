//! REST server binary for the kanban task store.

use clap::Parser;
use kanban::config::DEFAULT_LOG_FILTER;
use kanban::{KanbanConfig, SqliteTaskStore, TaskServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Serve the kanban task API under `/api/tasks`.
#[derive(Parser)]
#[command(name = "kanban-server", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind host (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite database file (overrides config).
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(KanbanConfig::default_config_path);
    let mut config = KanbanConfig::load_or_default(&config_path)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(database) = cli.database {
        config.store.database_path = Some(database);
    }

    let db_path = config.store.effective_database_path();
    let store = Arc::new(SqliteTaskStore::open(&db_path)?);
    info!(path = %db_path.display(), "task store ready");

    let mut server = TaskServer::start(store, &config.server).await?;

    let interrupted = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            true
        }
        () = server.join() => false,
    };
    if interrupted {
        info!("received Ctrl+C, shutting down...");
        server.shutdown();
    }

    Ok(())
}
