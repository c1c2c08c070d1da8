//! Quotaplane Server — application entry point.

use std::process::ExitCode;
use std::sync::Arc;

use quotaplane_db::repository::{SurrealProjectRepository, SurrealQuotaRepository};
use quotaplane_db::{DbConfig, DbManager};
use quotaplane_engine::{PollConfig, ProvisionWorker, QuotaLockManager};
use tracing_subscriber::EnvFilter;

mod noop_backend;

use noop_backend::NoopBackend;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("quotaplane=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Quotaplane server...");

    let config = DbConfig::from_env();
    let manager = match DbManager::connect(&config).await {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(error = %e, "Database connection failed");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = quotaplane_db::run_migrations(manager.client()).await {
        tracing::error!(error = %e, "Migrations failed");
        return ExitCode::FAILURE;
    }

    let db = manager.client().clone();
    let locks = Arc::new(QuotaLockManager::new());
    let (jobs_tx, jobs_rx) = tokio::sync::mpsc::unbounded_channel();
    let worker = ProvisionWorker::new(
        SurrealQuotaRepository::new(db.clone()),
        SurrealProjectRepository::new(db.clone()),
        NoopBackend,
        Arc::clone(&locks),
        PollConfig::default(),
    );
    let worker_handle = worker.spawn(jobs_rx);

    // TODO: mount the API surface once the transport layer lands; until
    // then the services are exercised by the engine's integration tests.
    tracing::info!("Quotaplane engine ready");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    drop(jobs_tx);
    let _ = worker_handle.await;
    tracing::info!("Quotaplane server stopped.");
    ExitCode::SUCCESS
}
