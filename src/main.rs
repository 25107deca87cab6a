//! stagepass host process.
//!
//! Composition root: loads configuration, wires the store, the lifecycle
//! service, and the durable mirror, and owns the expiry sweeper task.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use stagepass::config::CoreConfig;
use stagepass::domain::{AccountDirectory, EventCatalog, TransactionStore};
use stagepass::persistence::SettlementPersistence;
use stagepass::service::TransactionService;
use stagepass::sweeper::ExpirySweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = CoreConfig::from_env();
    tracing::info!(
        sweep_interval_secs = config.sweep_interval_secs,
        payment_window_mins = config.payment_window_mins,
        "starting stagepass settlement core"
    );

    // Build domain layer
    let directory = Arc::new(AccountDirectory::new());
    let catalog = Arc::new(EventCatalog::new());
    let store = Arc::new(TransactionStore::new());

    // Connect the durable mirror and rehydrate open transactions
    let persistence = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        sqlx::migrate!().run(&pool).await?;

        let persistence = SettlementPersistence::new(pool);
        let open = persistence.load_open().await?;
        let count = open.len();
        for tx in open {
            store.insert(tx).await?;
        }
        tracing::info!(count, "rehydrated open transactions");
        Some(persistence)
    } else {
        tracing::warn!("persistence disabled; transactions are in-memory only");
        None
    };

    // Build service layer; the request layer of the host process takes
    // this handle for create / pay / confirm calls.
    let _service = Arc::new(TransactionService::new(
        Arc::clone(&directory),
        Arc::clone(&catalog),
        Arc::clone(&store),
        persistence.clone(),
        chrono::Duration::minutes(config.payment_window_mins),
    ));

    // Spawn the sweeper as an explicit task owned by this composition root
    let sweeper = ExpirySweeper::new(
        Arc::clone(&store),
        persistence,
        Duration::from_secs(config.sweep_interval_secs),
    );
    tokio::spawn(sweeper.run());

    tracing::info!("settlement core running");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    Ok(())
}
