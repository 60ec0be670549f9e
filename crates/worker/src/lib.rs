//! `capsnet-worker` -- Kinetics-600 clip downloader.
//!
//! Extracts the split annotation archives, acquires every annotated clip
//! through the resolver and transcoder, and writes the per-split JSON
//! reports. Configuration comes from the environment; see
//! [`config::DownloadConfig::from_env`].

pub mod config;

use std::sync::Arc;

use capsnet_pipeline::{run_download, PipelineError, ProcessRunner, SplitReport};

pub use config::{ConfigError, DownloadConfig};

/// Run the full download with real child processes.
pub async fn run(config: &DownloadConfig) -> Result<Vec<SplitReport>, PipelineError> {
    let acquirer = Arc::new(config.acquirer(ProcessRunner));
    tracing::info!(
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        num_jobs = config.num_jobs,
        resolver = %config.resolver_bin,
        transcoder = %config.transcoder_bin,
        "Starting Kinetics-600 download",
    );
    run_download(&config.plan(), acquirer).await
}
