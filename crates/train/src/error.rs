use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("Unknown dataset: '{0}'")]
    UnknownDataset(String),

    #[error("Dataset file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Malformed dataset file {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Failed to build transform pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
