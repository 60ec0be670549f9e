//! `capsnet-worker` binary.
//!
//! Exits with status 1 on invalid configuration or a batch-level failure.
//! Individual clip failures only appear in the report.

use capsnet_worker::DownloadConfig;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "capsnet_worker=info,capsnet_pipeline=info,capsnet_core=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DownloadConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    match capsnet_worker::run(&config).await {
        Ok(reports) => {
            for report in &reports {
                tracing::info!(
                    split = %report.split,
                    total = report.summary.total,
                    downloaded = report.summary.downloaded,
                    skipped = report.summary.skipped,
                    failed = report.summary.failed,
                    report = %report.report_path.display(),
                    "Split summary",
                );
            }
            tracing::info!("Download complete");
        }
        Err(e) => {
            tracing::error!(error = %e, "Download failed");
            std::process::exit(1);
        }
    }
}
