use std::path::PathBuf;

use capsnet_core::CoreError;

/// Batch-level failures. These end the whole run; per-clip failures never
/// surface here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Annotation table {} missing after extracting {}", csv.display(), archive.display())]
    MissingAnnotations { archive: PathBuf, csv: PathBuf },

    #[error("Failed to remove scratch directory {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
}
