//! Report HTTP Server Binary
//!
//! Serves the generation trigger and the report read endpoints.
//!
//! # Usage
//!
//! ```bash
//! # File repository under data/reports (default)
//! cargo run --bin report-server
//!
//! # In-memory repository, explicit config file
//! REPOSITORY_TYPE=local cargo run --bin report-server -- --config report.toml
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `TEMPO_URL`: Trace backend base URL
//! - `REPOSITORY_TYPE` / `REPORT_DATA_DIR`: report storage
//! - `RUST_LOG`: Log filter (default: the configured level)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use trace_report::config::AppConfig;
use trace_report::db::RepositoryFactory;
use trace_report::http::{create_router, AppState};
use trace_report::logging;
use trace_report::services::ReportGenerator;
use trace_report::tempo::TempoClient;

#[derive(Debug, Parser)]
#[command(name = "report-server", version, about = "Trace report HTTP server")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    logging::init(&config.logging.level);

    info!("Starting trace report HTTP server");

    let repository = RepositoryFactory::from_settings(&config.repository)
        .await
        .context("failed to initialize report repository")?;
    info!(backend = repository.backend_name(), "Repository initialized successfully");

    let client = TempoClient::new(config.tempo.clone()).context("failed to create trace client")?;
    info!(backend_url = %config.tempo.backend_url, "Trace client configured");

    let generator = ReportGenerator::new(
        Arc::new(client),
        repository,
        &config.tempo,
        config.generation.clone(),
    );
    let app = create_router(AppState::new(Arc::new(generator)));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid bind address")?;

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
