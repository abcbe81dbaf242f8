use anyhow::Result;
use clap::Parser;
use ctf_platform_api::{create_router, AppState};
use ctf_platform_config::{load_config, Environment};
use ctf_platform_events::EventHub;
use ctf_platform_instancer::{ExpirySweeper, InstanceService};
use ctf_platform_runtime::{HttpRuntimeClient, MemoryObjectStore};
use ctf_platform_scoring::SolveService;
use ctf_platform_storage::PostgresStorage;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CTF Platform Server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let environment = Environment::detect();
    info!(environment = %environment, "Starting CTF platform server");

    let config = load_config(&args.config)?;

    let storage = Arc::new(
        PostgresStorage::new(&config.database.url, config.database.max_connections).await?,
    );

    let runtime = Arc::new(HttpRuntimeClient::new(
        config.runtime.base_url.clone(),
        Duration::from_secs(config.runtime.connect_timeout_secs),
        Duration::from_secs(config.runtime.request_timeout_secs),
    )?);

    let events = Arc::new(EventHub::new(config.events.channel_capacity));
    let objects = Arc::new(MemoryObjectStore::new());

    let instancer = InstanceService::new(
        config.instancer.clone(),
        config.runtime.context_bucket.clone(),
        storage.clone(),
        storage.clone(),
        storage.clone(),
        runtime,
        objects,
        events.clone(),
    );
    let solver = SolveService::new(
        storage.clone(),
        storage.clone(),
        events.clone(),
        instancer.clone(),
    );

    let sweeper = ExpirySweeper::spawn(
        instancer.clone(),
        Duration::from_secs(config.instancer.sweep_interval_secs.max(1)),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(instancer, solver, events, Arc::new(config));
    let app = create_router(state);

    info!(addr = %addr, "Starting HTTP server");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    sweeper.shutdown().await;
    info!("Server stopped");
    Ok(())
}
