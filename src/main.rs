use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use agenda_api::config::{self, AppConfig};
use agenda_api::database::{DatabaseManager, PgStore, TokenBlacklist};
use agenda_api::throttle::MemoryCounterStore;
use agenda_api::AppState;

#[derive(Parser)]
#[command(name = "agenda-api")]
#[command(about = "Appointment scheduling API for medical professionals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overrides API_PORT")]
        port: Option<u16>,

        #[arg(long, help = "Use the in-process store instead of PostgreSQL")]
        memory: bool,
    },

    #[command(about = "Apply pending database migrations and exit")]
    Migrate,

    #[command(about = "Delete revoked refresh tokens that have already expired")]
    PurgeTokens,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and friends are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = config::config().clone();
    tracing::info!("Starting Agenda API in {:?} mode", config.environment);

    match cli.command.unwrap_or(Commands::Serve { port: None, memory: false }) {
        Commands::Serve { port, memory } => serve(config, port, memory).await,
        Commands::Migrate => migrate(&config).await,
        Commands::PurgeTokens => purge_tokens(&config).await,
    }
}

async fn serve(config: AppConfig, port: Option<u16>, memory: bool) -> anyhow::Result<()> {
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("SECURITY_JWT_SECRET must be set outside development");
    }

    let port = port.unwrap_or(config.api.port);
    let state = if memory {
        tracing::warn!("Using in-memory store; data is lost on restart");
        AppState::in_memory(config)
    } else {
        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::migrate(&pool).await?;
        AppState::new(
            config,
            Arc::new(PgStore::new(pool)),
            Arc::new(MemoryCounterStore::new()),
        )
    };

    let app = agenda_api::app(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Agenda API listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await?;
    tracing::info!("Migrations applied");
    Ok(())
}

async fn purge_tokens(config: &AppConfig) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database).await?;
    let purged = PgStore::new(pool)
        .purge_expired_tokens(chrono::Utc::now())
        .await?;
    tracing::info!("Purged {} expired blacklist entries", purged);
    Ok(())
}
