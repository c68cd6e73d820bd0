//! upwatch - HTTP uptime monitor
//!
//! Probes a list of endpoints every minute, stores pass/fail results, and
//! pushes the current state to connected viewers.

mod config;
mod db;
mod notifier;
mod probe;
mod scheduler;
mod uptime;
mod web;

use config::ServerConfig;
use db::{ResultStore, Store};
use notifier::Notifier;
use probe::{HttpClient, RetryPolicy};
use scheduler::Scheduler;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("upwatch=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting upwatch on port {}...", cfg.http_port);
    tracing::info!("Using database at {}", cfg.db_path);
    tracing::info!("Reading targets from {}", cfg.targets_path.display());

    // Initialize database
    let store: Arc<dyn ResultStore> = Arc::new(Store::new(&cfg.db_path)?);
    tracing::info!("Database initialized successfully");

    let notifier = Notifier::new(store);

    // Start scheduler
    let checker = Arc::new(HttpClient::new(cfg.request_timeout())?);
    let scheduler = Arc::new(Scheduler::new(
        notifier.clone(),
        checker,
        cfg.targets_path.clone(),
        cfg.probe_interval(),
        RetryPolicy::default(),
    ));
    scheduler.start();

    // Start web server
    let server = Server::new(cfg, notifier);
    server.start().await?;

    Ok(())
}
