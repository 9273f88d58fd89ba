use anyhow::Context;
use std::path::Path;
use trend_runner::DailyRun;
use trends_core::{AppConfig, ErrorReporter, CONFIG_FILE_NAME};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "paper_trends=info,trend_runner=info,crossref_client=info,state_store=info,trends_core=info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("Starting Paper Trends daily run");

    let config = AppConfig::load_or_default(Path::new(CONFIG_FILE_NAME))
        .context("loading configuration")?;
    let run = DailyRun::from_config(config).context("setting up the Crossref client")?;

    let summary = match run.execute(chrono::Utc::now()).await {
        Ok(summary) => summary,
        Err(e) => {
            ErrorReporter::new().report_error(&e);
            return Err(e).context("daily run aborted");
        }
    };
    run.log_request_metrics().await;

    if !summary.failed_sources.is_empty() {
        tracing::warn!(
            "Skipped {} source(s) this run: {}",
            summary.failed_sources.len(),
            summary.failed_sources.join(", ")
        );
    }
    if summary.skipped {
        tracing::info!("No new papers; state and dashboard left untouched");
    } else {
        tracing::info!(
            "Dashboard updated: {} papers, {} new words",
            summary.papers,
            summary.new_words
        );
    }

    Ok(())
}
