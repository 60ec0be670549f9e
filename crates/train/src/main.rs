//! `capsnet-stats` -- print normalization statistics for local datasets.
//!
//! Scans `CAPSNET_DATA_DIR` (default `data`) for each supported dataset,
//! loads its training split and prints one JSON line of per-channel mean
//! and standard deviation. Datasets not present on disk are skipped.
//!
//! Pass dataset names as arguments to restrict the scan.

use std::path::PathBuf;

use capsnet_train::registry::DatasetRegistry;
use capsnet_train::stats::channel_stats;
use capsnet_train::{sources, DatasetKind, Mode, TrainError};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "capsnet_train=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_root = std::env::var("CAPSNET_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));

    let registry = DatasetRegistry::standard();

    let kinds: Vec<DatasetKind> = match std::env::args()
        .skip(1)
        .map(|name| name.parse::<DatasetKind>())
        .collect::<Result<Vec<_>, TrainError>>()
    {
        Ok(kinds) if kinds.is_empty() => registry.iter().map(|entry| entry.kind).collect(),
        Ok(kinds) => kinds,
        Err(e) => {
            tracing::error!(error = %e, "Invalid dataset argument");
            std::process::exit(1);
        }
    };

    let mut failed = false;

    for kind in kinds {
        let Some(entry) = registry.get(kind) else {
            continue;
        };
        let samples = match sources::load_split(&data_root, entry, Mode::Train) {
            Ok(samples) => samples,
            Err(TrainError::NotFound(path)) => {
                tracing::info!(
                    dataset = %kind,
                    path = %path.display(),
                    "Dataset not found, skipping",
                );
                continue;
            }
            Err(e) => {
                tracing::error!(dataset = %kind, error = %e, "Failed to load dataset");
                failed = true;
                continue;
            }
        };

        match channel_stats(&samples) {
            Ok(stats) => {
                let line = serde_json::json!({ "dataset": kind.as_str(), "stats": stats });
                println!("{line}");
            }
            Err(e) => {
                tracing::error!(dataset = %kind, error = %e, "Failed to compute statistics");
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}
