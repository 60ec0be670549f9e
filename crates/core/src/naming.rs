//! Clip file naming convention.
//!
//! Convention: `{video_id}_{start:06}_{end:06}.mp4`, where the times are
//! truncated to whole seconds and zero-padded to six digits. The clip id is
//! the file name without its extension.

use std::path::{Path, PathBuf};

use crate::annotation::AnnotationRecord;

/// Extension of every acquired clip.
pub const CLIP_EXTENSION: &str = "mp4";

/// Zero-pad width for the trimmed time range.
pub const TRIM_WIDTH: usize = 6;

/// Format a time offset the way the clip names expect (`10.7` → `"000010"`).
pub fn format_trim_time(seconds: f64) -> String {
    format!("{:0width$}", seconds.trunc() as i64, width = TRIM_WIDTH)
}

/// Clip id for a video and time range, e.g. `abc12345678_000010_000015`.
///
/// ```
/// use capsnet_core::naming::clip_id;
///
/// assert_eq!(clip_id("abc12345678", 10.0, 15.0), "abc12345678_000010_000015");
/// ```
pub fn clip_id(video_id: &str, start_time: f64, end_time: f64) -> String {
    format!(
        "{video_id}_{}_{}",
        format_trim_time(start_time),
        format_trim_time(end_time)
    )
}

/// Clip file name, e.g. `abc12345678_000010_000015.mp4`.
pub fn clip_filename(video_id: &str, start_time: f64, end_time: f64) -> String {
    format!("{}.{CLIP_EXTENSION}", clip_id(video_id, start_time, end_time))
}

/// One unit of acquisition work: an annotation row plus where its clip goes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipTask {
    pub record: AnnotationRecord,
    pub output_path: PathBuf,
    pub clip_id: String,
}

impl ClipTask {
    /// Build a task placing the clip inside `dir`.
    pub fn new(record: AnnotationRecord, dir: &Path) -> Self {
        let clip_id = clip_id(&record.video_id, record.start_time, record.end_time);
        let output_path = dir.join(format!("{clip_id}.{CLIP_EXTENSION}"));
        Self {
            record,
            output_path,
            clip_id,
        }
    }
}
