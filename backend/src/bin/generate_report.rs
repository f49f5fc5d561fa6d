//! Scheduled report generation.
//!
//! Runs one generation to completion and reports the outcome through the exit
//! status, for use from cron or a Kubernetes CronJob:
//!
//! ```bash
//! generate-report daily
//! generate-report weekly --config /etc/trace-report/report.toml
//! ```
//!
//! Exit status is 0 when the report was stored as complete and 1 otherwise.
//! An unrecognized kind prints usage and exits with status 2.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use trace_report::config::AppConfig;
use trace_report::db::RepositoryFactory;
use trace_report::logging;
use trace_report::models::ReportKind;
use trace_report::services::ReportGenerator;
use trace_report::tempo::TempoClient;

#[derive(Debug, Parser)]
#[command(name = "generate-report", version, about = "Generate one trace report")]
struct Args {
    /// Report kind: daily, weekly or monthly
    kind: ReportKind,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // configuration errors surface before the configured subscriber exists
            logging::init("info");
            error!("report generation failed: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    logging::init(&config.logging.level);

    let repository = RepositoryFactory::from_settings(&config.repository)
        .await
        .context("failed to initialize report repository")?;
    let client = TempoClient::new(config.tempo.clone()).context("failed to create trace client")?;
    let generator = ReportGenerator::new(
        Arc::new(client),
        repository,
        &config.tempo,
        config.generation.clone(),
    );

    info!(kind = %args.kind, "generating report");
    let report = generator.generate(args.kind).await?;

    let traces = report.metrics.as_ref().map_or(0, |m| m.total_traces);
    info!(
        report_id = %report.id,
        kind = %report.kind,
        window_start = %report.window.start,
        window_end = %report.window.end,
        traces,
        "report stored"
    );
    Ok(())
}
