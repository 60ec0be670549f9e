//! Download report persistence.
//!
//! The report is a JSON array of `[clip_id, success, message]` entries,
//! one per annotation row of the split.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::CoreError;
use crate::status::ClipStatus;

/// Where each split's report goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportMode {
    /// Every split writes the same file; the last split processed wins.
    #[default]
    Overwrite,
    /// Each split writes `<stem>_<split>.<ext>` next to the configured path.
    PerSplit,
}

impl FromStr for ReportMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "per-split" | "per_split" => Ok(Self::PerSplit),
            other => Err(CoreError::Validation(format!(
                "Unknown report mode: '{other}'. Expected 'overwrite' or 'per-split'"
            ))),
        }
    }
}

/// Resolve the report file for `split` under `mode`.
pub fn report_path_for(base: &Path, split: &str, mode: ReportMode) -> PathBuf {
    match mode {
        ReportMode::Overwrite => base.to_path_buf(),
        ReportMode::PerSplit => {
            let stem = base
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "report".to_string());
            let name = match base.extension() {
                Some(ext) => format!("{stem}_{split}.{}", ext.to_string_lossy()),
                None => format!("{stem}_{split}"),
            };
            base.with_file_name(name)
        }
    }
}

/// Write `statuses` to `path`, replacing any previous content.
pub fn write_report(path: &Path, statuses: &[ClipStatus]) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec(statuses)?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), entries = statuses.len(), "Wrote download report");
    Ok(())
}

/// Read a report written by [`write_report`].
pub fn read_report(path: &Path) -> Result<Vec<ClipStatus>, CoreError> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
