//! Output directory layout for acquired clips.
//!
//! Clips land in `<output_root>/<split>/<label>/`. Unlabeled rows (the
//! test split) land directly in `<output_root>/<split>/`. All directories
//! are created before any clip is dispatched, so workers never race on
//! directory creation.
//!
//! The layout step also maintains the label list file: one label per line,
//! in first-seen order.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;

use crate::annotation::AnnotationRecord;
use crate::error::CoreError;
use crate::naming::ClipTask;

/// How the label list file is maintained across splits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelListMode {
    /// Write the file only when it does not exist yet. Whichever split is
    /// prepared first decides its content.
    #[default]
    FirstWriterWins,
    /// Append labels the file does not list yet, keeping existing order.
    Merge,
}

impl FromStr for LabelListMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first-writer-wins" | "first" => Ok(Self::FirstWriterWins),
            "merge" => Ok(Self::Merge),
            other => Err(CoreError::Validation(format!(
                "Unknown label list mode: '{other}'. Expected 'first-writer-wins' or 'merge'"
            ))),
        }
    }
}

/// Label → directory mapping for one split.
#[derive(Debug, Clone)]
pub struct LabelLayout {
    split_dir: PathBuf,
    dirs: IndexMap<String, PathBuf>,
}

impl LabelLayout {
    /// Directory holding the split's clips.
    pub fn split_dir(&self) -> &Path {
        &self.split_dir
    }

    /// Directory for `label`, if the split contains it.
    pub fn dir_for(&self, label: &str) -> Option<&Path> {
        self.dirs.get(label).map(PathBuf::as_path)
    }

    /// Distinct labels in first-seen order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.dirs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Build the acquisition task for `record`.
    ///
    /// A label not seen while preparing the layout falls back to its
    /// would-be directory under the split, so no row is ever dropped.
    pub fn task_for(&self, record: &AnnotationRecord) -> ClipTask {
        let dir = match record.label_name.as_deref() {
            Some(label) => self
                .dirs
                .get(label)
                .cloned()
                .unwrap_or_else(|| self.split_dir.join(label)),
            None => self.split_dir.clone(),
        };
        ClipTask::new(record.clone(), &dir)
    }

    /// Build tasks for every record, preserving input order.
    pub fn tasks_for(&self, records: &[AnnotationRecord]) -> Vec<ClipTask> {
        records.iter().map(|r| self.task_for(r)).collect()
    }
}

/// Distinct label names in first-seen order.
pub fn distinct_labels(records: &[AnnotationRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|r| r.label_name.as_deref())
        .filter(|label| seen.insert(*label))
        .map(str::to_string)
        .collect()
}

/// Create the split's label directories and maintain the label list file.
pub fn prepare_output_layout(
    records: &[AnnotationRecord],
    output_root: &Path,
    split: &str,
    labels_path: &Path,
    mode: LabelListMode,
) -> Result<LabelLayout, CoreError> {
    let split_dir = output_root.join(split);
    std::fs::create_dir_all(&split_dir)?;

    let labels = distinct_labels(records);
    let mut dirs = IndexMap::with_capacity(labels.len());
    for label in &labels {
        let dir = split_dir.join(label);
        std::fs::create_dir_all(&dir)?;
        dirs.insert(label.clone(), dir);
    }

    write_label_list(labels_path, &labels, mode)?;

    tracing::info!(
        split,
        labels = dirs.len(),
        dir = %split_dir.display(),
        "Prepared output layout",
    );

    Ok(LabelLayout { split_dir, dirs })
}

/// Write `labels` to the label list file according to `mode`.
///
/// Returns `true` when the file was written or extended.
pub fn write_label_list(
    path: &Path,
    labels: &[String],
    mode: LabelListMode,
) -> Result<bool, CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        let mut file = std::fs::File::create(path)?;
        for label in labels {
            writeln!(file, "{label}")?;
        }
        return Ok(true);
    }

    match mode {
        LabelListMode::FirstWriterWins => Ok(false),
        LabelListMode::Merge => {
            let existing = read_label_list(path)?;
            let known: HashSet<&str> = existing.iter().map(String::as_str).collect();
            let missing: Vec<&String> = labels
                .iter()
                .filter(|l| !known.contains(l.as_str()))
                .collect();
            if missing.is_empty() {
                return Ok(false);
            }
            let mut file = std::fs::OpenOptions::new().append(true).open(path)?;
            for label in missing {
                writeln!(file, "{label}")?;
            }
            Ok(true)
        }
    }
}

/// Read the label list file, one label per line.
pub fn read_label_list(path: &Path) -> Result<Vec<String>, CoreError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
