use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use claimer_core::{
    create_store_writer, load_config, validate_config, AccountOrchestrator, AccountRegistry,
    AccountStore, CommandJobExecutor, FixedJobSource, JobExecutor, JobSource, JsonAccountStore,
};
use claimer_server::api::create_router;
use claimer_server::state::ServerState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

const WRITER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("CLAIMER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let command = config
        .executor
        .command
        .clone()
        .context("executor.command must be configured")?;

    info!("Configuration loaded successfully");
    info!("Accounts path: {:?}", config.storage.accounts_path);
    info!("Job command: {:?}", command.program);

    // Load stored credentials
    let store: Arc<dyn AccountStore> =
        Arc::new(JsonAccountStore::new(config.storage.accounts_path.clone()));
    let accounts = store.load().context("Failed to load accounts")?;
    let registry =
        AccountRegistry::from_accounts(accounts).context("Stored accounts are invalid")?;
    info!("Loaded {} accounts", registry.len());

    // Start the credential writer
    let (store_handle, store_writer) = create_store_writer(Arc::clone(&store));
    let writer_handle = tokio::spawn(store_writer.run());

    // Create orchestrator
    let source: Arc<dyn JobSource> =
        Arc::new(FixedJobSource::new(config.executor.jobs_per_account));
    let executor: Arc<dyn JobExecutor> = Arc::new(CommandJobExecutor::new(command));
    let orchestrator = AccountOrchestrator::new(
        config.orchestrator.clone(),
        registry,
        source,
        executor,
        Some(store_handle),
    );

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(ServerState::new(config, orchestrator.clone()));
    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("claimer v{} listening on {}", VERSION, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown({
            let state = Arc::clone(&state);
            async move {
                shutdown_signal().await;
                info!("Shutdown signal received, closing WebSocket connections");
                state.begin_shutdown();
            }
        })
        .await
        .context("Server error")?;

    info!("Shutting down, stopping orchestrator");
    let final_state = orchestrator.stop().await;
    info!("Orchestrator stopped with {} jobs left", final_state.jobs_left);

    // WebSocket tasks only hold status receivers, so once the server state
    // and this handle are dropped the writer channel closes
    drop(state);
    drop(orchestrator);

    // Wait for writer to flush pending saves
    match tokio::time::timeout(WRITER_SHUTDOWN_TIMEOUT, writer_handle).await {
        Ok(_) => info!("Account writer stopped"),
        Err(_) => error!("Account writer did not stop in time, pending saves may be lost"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
