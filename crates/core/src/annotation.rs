//! Kinetics annotation table ingestion.
//!
//! Each split ships a CSV with the header columns `youtube_id`,
//! `time_start`, `time_end` and `label` (plus columns this crate ignores,
//! such as `split` or `is_cc`). Rows are read into [`AnnotationRecord`]s
//! under stable field names. The test split has no `label` column, so the
//! label is optional.
//!
//! Ingestion never drops a row because of its content. [`AnnotationRecord::validate`]
//! reports suspicious values for logging, and the row still flows on to the
//! acquisition step where the external tools reject it.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Length of a YouTube video identifier.
pub const VIDEO_ID_LEN: usize = 11;

/// One annotated clip from a split's CSV table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(rename(deserialize = "youtube_id", serialize = "video-id"))]
    pub video_id: String,
    #[serde(rename(deserialize = "time_start", serialize = "start-time"))]
    pub start_time: f64,
    #[serde(rename(deserialize = "time_end", serialize = "end-time"))]
    pub end_time: f64,
    #[serde(
        rename(deserialize = "label", serialize = "label-name"),
        default,
        deserialize_with = "empty_as_none"
    )]
    pub label_name: Option<String>,
}

impl AnnotationRecord {
    /// Clip duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Check the record for values the external tools are likely to reject.
    ///
    /// Returns one message per problem; an empty vector means the record
    /// looks sane. Callers log these and keep the row.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.video_id.trim().is_empty() {
            issues.push("video id is empty".to_string());
        } else if self.video_id.len() != VIDEO_ID_LEN {
            issues.push(format!(
                "video id '{}' is {} characters, expected {VIDEO_ID_LEN}",
                self.video_id,
                self.video_id.len()
            ));
        }

        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            issues.push("time range is not finite".to_string());
        } else {
            if self.start_time < 0.0 {
                issues.push(format!("start time {} is negative", self.start_time));
            }
            if self.end_time <= self.start_time {
                issues.push(format!(
                    "end time {} is not after start time {}",
                    self.end_time, self.start_time
                ));
            }
        }

        issues
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Parse an annotation table from any reader.
///
/// Every data row produces exactly one record, in file order. A row whose
/// times are not numeric fails the whole table.
pub fn parse_annotations_from_reader<R: Read>(
    reader: R,
) -> Result<Vec<AnnotationRecord>, CoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in rdr.deserialize::<AnnotationRecord>() {
        records.push(row?);
    }
    Ok(records)
}

/// Parse the annotation table at `path`.
pub fn parse_annotations(path: &Path) -> Result<Vec<AnnotationRecord>, CoreError> {
    if !path.exists() {
        return Err(CoreError::NotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    let records = parse_annotations_from_reader(file)?;

    let mut suspicious = 0usize;
    for (row, record) in records.iter().enumerate() {
        for issue in record.validate() {
            suspicious += 1;
            tracing::warn!(row, video_id = %record.video_id, "Suspicious annotation: {issue}");
        }
    }

    tracing::info!(
        path = %path.display(),
        rows = records.len(),
        suspicious,
        "Parsed annotation table",
    );
    Ok(records)
}
