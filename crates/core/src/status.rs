//! Per-clip acquisition outcomes.
//!
//! [`ClipOutcome`] is the typed result of acquiring one clip. It collapses
//! into a [`ClipStatus`], the `(clip_id, success, message)` tuple written to
//! the download report.

use serde::{Deserialize, Serialize};

/// Status message for a clip whose output already existed.
pub const MSG_EXISTS: &str = "Exists";

/// Status message after a transcoder run that exited zero.
///
/// Also used when the output turned out to be missing afterwards, which
/// keeps the report compatible with earlier runs.
pub const MSG_DOWNLOADED: &str = "Downloaded";

/// What happened when a single clip was acquired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipOutcome {
    /// Output file was already present; nothing was run.
    AlreadyExists,
    /// Resolved, transcoded and verified on disk.
    Downloaded,
    /// The resolver failed on every attempt (or a terminal failure stopped it).
    ResolutionFailed { attempts: u32, output: String },
    /// The transcoder exited non-zero or could not be run.
    TranscodeFailed { output: String },
    /// The transcoder exited zero but left no output file.
    OutputMissingAfterTranscode,
}

impl ClipOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::AlreadyExists | Self::Downloaded)
    }

    /// Report message for this outcome.
    pub fn message(&self) -> String {
        match self {
            Self::AlreadyExists => MSG_EXISTS.to_string(),
            Self::Downloaded | Self::OutputMissingAfterTranscode => MSG_DOWNLOADED.to_string(),
            Self::ResolutionFailed { output, .. } | Self::TranscodeFailed { output } => {
                output.clone()
            }
        }
    }

    pub fn into_status(self, clip_id: impl Into<String>) -> ClipStatus {
        ClipStatus {
            clip_id: clip_id.into(),
            success: self.is_success(),
            message: self.message(),
        }
    }
}

/// One report entry. Serializes as a 3-element JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, bool, String)", into = "(String, bool, String)")]
pub struct ClipStatus {
    pub clip_id: String,
    pub success: bool,
    pub message: String,
}

impl ClipStatus {
    pub fn failure(clip_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            clip_id: clip_id.into(),
            success: false,
            message: message.into(),
        }
    }
}

impl From<(String, bool, String)> for ClipStatus {
    fn from((clip_id, success, message): (String, bool, String)) -> Self {
        Self {
            clip_id,
            success,
            message,
        }
    }
}

impl From<ClipStatus> for (String, bool, String) {
    fn from(status: ClipStatus) -> Self {
        (status.clip_id, status.success, status.message)
    }
}

/// Aggregate counts over a batch of statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_statuses(statuses: &[ClipStatus]) -> Self {
        let mut summary = Self {
            total: statuses.len(),
            ..Self::default()
        };
        for status in statuses {
            match (status.success, status.message.as_str()) {
                (true, MSG_EXISTS) => summary.skipped += 1,
                (true, _) => summary.downloaded += 1,
                (false, _) => summary.failed += 1,
            }
        }
        summary
    }
}
