use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod api;
mod booking;
mod config;
mod db;
mod error;
mod jobs;
#[cfg(test)]
mod test_support;

use api::AppState;
use booking::Dispatcher;
use config::Config;
use db::{CourseCatalog, Database};
use jobs::{JobRunner, JobStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open course catalog
    let db = Database::open(&config.database_path)?;
    info!("Course catalog opened: {}", config.database_path);

    if let Some(path) = &config.courses_file {
        let loaded = db.load_courses_file(path)?;
        info!("Loaded {} course(s) from {}", loaded, path.display());
    }

    let catalog: Arc<dyn CourseCatalog> = Arc::new(db);
    let settings = config.scraper_settings();
    info!(
        "Scraper: {} attempt(s), backoff step {:?}, jitter {:?}..={:?}",
        settings.retry.max_attempts,
        settings.retry.backoff_step,
        settings.retry.jitter_min,
        settings.retry.jitter_max
    );

    let dispatcher = Arc::new(Dispatcher::new(catalog.clone(), settings));
    let jobs = JobRunner::new(JobStore::new(), dispatcher.clone());

    let app = api::router(AppState {
        catalog,
        dispatcher,
        jobs,
    });
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Tee-time API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run API server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
