use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use horror_calendar::catalog::{KNOWN_HORROR_TITLES, build_catalog};
use horror_calendar::middleware::{AppConfig, app_router};
use horror_calendar::{AuthClient, MemorySessionStore, MovieStore, OmdbClient};
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "horror-calendar", about = "Horror movie release calendar")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web application.
    Serve {
        #[arg(long, env = "HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, env = "PORT", default_value_t = 5000)]
        port: u16,

        /// Sessions idle longer than this are dropped.
        #[arg(long, env = "SESSION_IDLE_SECS", default_value_t = 8 * 3600)]
        session_idle_secs: i64,

        #[arg(long, env = "SESSION_PRUNE_INTERVAL_SECS", default_value_t = 300)]
        prune_interval_secs: u64,
    },

    /// Look up known horror titles on OMDb and write the movie file.
    FetchCatalog {
        /// Defaults to `MOVIE_FILE`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("invalid configuration")?;

    match cli.command {
        Command::Serve {
            host,
            port,
            session_idle_secs,
            prune_interval_secs,
        } => {
            let sessions = MemorySessionStore::new();
            spawn_session_pruner(
                sessions.clone(),
                time::Duration::seconds(session_idle_secs),
                std::time::Duration::from_secs(prune_interval_secs.max(1)),
            );

            let provider =
                AuthClient::new(config.oauth).with_timeout(config.settings.provider_timeout());
            let app = app_router(config.settings, provider, sessions);

            let addr: SocketAddr = format!("{host}:{port}").parse()?;
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(address = %addr, "listening");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            tracing::info!("Server stopped");
        }
        Command::FetchCatalog { output } => {
            let api_key = config
                .omdb_api_key
                .context("OMDB_API_KEY must be set to fetch the catalog")?;
            let path = output.unwrap_or_else(|| config.settings.movie_file().to_path_buf());
            let store = MovieStore::new(path);
            let today = OffsetDateTime::now_utc().date();

            let client = OmdbClient::new(api_key).with_timeout(config.settings.provider_timeout());
            let movies = build_catalog(&client, &store, KNOWN_HORROR_TITLES, today).await?;
            tracing::info!(count = movies.len(), path = %store.path().display(), "Catalog complete");
        }
    }
    Ok(())
}

fn spawn_session_pruner(
    sessions: MemorySessionStore,
    max_idle: time::Duration,
    every: std::time::Duration,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match sessions.prune_idle(max_idle) {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, remaining = sessions.len(), "Pruned idle sessions"),
                Err(e) => tracing::error!(error = %e, "Session pruning failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
