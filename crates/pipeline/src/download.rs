//! End-to-end acquisition run over the Kinetics-600 splits.
//!
//! Order of work:
//!
//! 1. Extract every split archive into the staging directory.
//! 2. Per split: parse annotations, prepare the output layout, dispatch all
//!    clip tasks, write the report.
//! 3. Remove the scratch directory.
//!
//! Any error here is batch-level and ends the run. Per-clip failures only
//! ever show up in the report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use capsnet_core::annotation::parse_annotations;
use capsnet_core::archive::extract_archive;
use capsnet_core::layout::{prepare_output_layout, LabelListMode};
use capsnet_core::report::{report_path_for, write_report, ReportMode};
use capsnet_core::status::BatchSummary;

use crate::acquire::ClipAcquirer;
use crate::dispatch::{dispatch_batch, DEFAULT_NUM_JOBS};
use crate::error::PipelineError;
use crate::runner::ToolRunner;

/// Subdirectory of the scratch directory archives are extracted into.
pub const STAGING_SUBDIR: &str = "kinetics600";

/// One split: its name, the archive holding its annotations, and the CSV
/// inside that archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSpec {
    pub name: String,
    pub archive: String,
    pub csv: String,
}

impl SplitSpec {
    pub fn new(
        name: impl Into<String>,
        archive: impl Into<String>,
        csv: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            archive: archive.into(),
            csv: csv.into(),
        }
    }
}

/// The three Kinetics-600 splits as distributed.
pub fn kinetics600_splits() -> Vec<SplitSpec> {
    vec![
        SplitSpec::new("train", "kinetics_600_train (1).zip", "kinetics_train.csv"),
        SplitSpec::new("val", "kinetics_600_val (1).zip", "kinetics_val.csv"),
        SplitSpec::new("test", "kinetics_600_test (2).zip", "kinetics_600_test.csv"),
    ]
}

/// Where everything lives for one run.
#[derive(Debug, Clone)]
pub struct DownloadPlan {
    /// Directory holding the split archives.
    pub data_dir: PathBuf,
    /// Removed in full once every split is done.
    pub scratch_dir: PathBuf,
    /// Root of the `<split>/<label>/` clip tree.
    pub output_dir: PathBuf,
    pub labels_path: PathBuf,
    pub report_path: PathBuf,
    pub report_mode: ReportMode,
    pub label_list_mode: LabelListMode,
    pub num_jobs: usize,
    pub splits: Vec<SplitSpec>,
}

impl Default for DownloadPlan {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            scratch_dir: PathBuf::from("data/temp"),
            output_dir: PathBuf::from("data/kinetics600"),
            labels_path: PathBuf::from("data/kinetics600_labels.txt"),
            report_path: PathBuf::from("kinetics600_download_report.json"),
            report_mode: ReportMode::default(),
            label_list_mode: LabelListMode::default(),
            num_jobs: DEFAULT_NUM_JOBS,
            splits: kinetics600_splits(),
        }
    }
}

impl DownloadPlan {
    /// Directory the annotation archives are extracted into.
    pub fn staging_dir(&self) -> PathBuf {
        self.scratch_dir.join(STAGING_SUBDIR)
    }
}

/// Result of one split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitReport {
    pub split: String,
    pub report_path: PathBuf,
    pub summary: BatchSummary,
}

/// Run the whole plan. Returns one [`SplitReport`] per split, in plan order.
pub async fn run_download<R>(
    plan: &DownloadPlan,
    acquirer: Arc<ClipAcquirer<R>>,
) -> Result<Vec<SplitReport>, PipelineError>
where
    R: ToolRunner + 'static,
{
    let staging = plan.staging_dir();
    for split in &plan.splits {
        extract_archive(&plan.data_dir.join(&split.archive), &staging)?;
    }

    let mut reports = Vec::with_capacity(plan.splits.len());
    for split in &plan.splits {
        let report = run_split(plan, split, &staging, Arc::clone(&acquirer)).await?;
        reports.push(report);
    }

    remove_scratch(&plan.scratch_dir)?;
    Ok(reports)
}

async fn run_split<R>(
    plan: &DownloadPlan,
    split: &SplitSpec,
    staging: &Path,
    acquirer: Arc<ClipAcquirer<R>>,
) -> Result<SplitReport, PipelineError>
where
    R: ToolRunner + 'static,
{
    let csv = staging.join(&split.csv);
    if !csv.exists() {
        return Err(PipelineError::MissingAnnotations {
            archive: plan.data_dir.join(&split.archive),
            csv,
        });
    }

    let records = parse_annotations(&csv)?;
    let layout = prepare_output_layout(
        &records,
        &plan.output_dir,
        &split.name,
        &plan.labels_path,
        plan.label_list_mode,
    )?;
    let tasks = layout.tasks_for(&records);

    tracing::info!(split = %split.name, clips = tasks.len(), "Starting split");
    let statuses = dispatch_batch(acquirer, tasks, plan.num_jobs).await;

    let report_path = report_path_for(&plan.report_path, &split.name, plan.report_mode);
    write_report(&report_path, &statuses)?;

    let summary = BatchSummary::from_statuses(&statuses);
    tracing::info!(
        split = %split.name,
        total = summary.total,
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        failed = summary.failed,
        report = %report_path.display(),
        "Split finished",
    );

    Ok(SplitReport {
        split: split.name.clone(),
        report_path,
        summary,
    })
}

fn remove_scratch(path: &Path) -> Result<(), PipelineError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Removed scratch directory");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PipelineError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use capsnet_core::report::read_report;
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::acquire::test_support::{FakeRunner, TranscodeBehavior};
    use crate::retry::RetryPolicy;
    use crate::tools::{ResolverConfig, TranscoderConfig};

    fn write_zip(path: &Path, name: &str, content: &str) {
        let file = std::fs::File::create(path).expect("create zip");
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file(name, SimpleFileOptions::default())
            .expect("start entry");
        zip.write_all(content.as_bytes()).expect("write entry");
        zip.finish().expect("finish zip");
    }

    fn plan(root: &Path) -> DownloadPlan {
        DownloadPlan {
            data_dir: root.join("data"),
            scratch_dir: root.join("data/temp"),
            output_dir: root.join("data/kinetics600"),
            labels_path: root.join("data/labels.txt"),
            report_path: root.join("report.json"),
            num_jobs: 2,
            splits: vec![SplitSpec::new("val", "val.zip", "val.csv")],
            ..DownloadPlan::default()
        }
    }

    fn acquirer(transcode: TranscodeBehavior) -> Arc<ClipAcquirer<FakeRunner>> {
        Arc::new(ClipAcquirer::new(
            FakeRunner::resolving(transcode),
            ResolverConfig::default(),
            TranscoderConfig::default(),
            RetryPolicy::default(),
        ))
    }

    #[test]
    fn default_plan_matches_kinetics_layout() {
        let plan = DownloadPlan::default();
        assert_eq!(plan.staging_dir(), PathBuf::from("data/temp/kinetics600"));
        assert_eq!(plan.num_jobs, 24);
        let names: Vec<&str> = plan.splits.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["train", "val", "test"]);
        assert_eq!(plan.splits[2].archive, "kinetics_600_test (2).zip");
    }

    #[tokio::test]
    async fn runs_split_writes_report_and_cleans_scratch() {
        let root = tempfile::tempdir().expect("temp dir");
        let plan = plan(root.path());
        std::fs::create_dir_all(&plan.data_dir).expect("data dir");
        write_zip(
            &plan.data_dir.join("val.zip"),
            "val.csv",
            "label,youtube_id,time_start,time_end,split\n\
             dancing,abc12345678,10,15,val\n\
             singing,xyz98765432,0,10,val\n",
        );

        let reports = run_download(&plan, acquirer(TranscodeBehavior::WriteOutput))
            .await
            .expect("run");

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].summary.total, 2);
        assert_eq!(reports[0].summary.downloaded, 2);
        assert!(plan
            .output_dir
            .join("val/dancing/abc12345678_000010_000015.mp4")
            .exists());
        assert_eq!(read_report(&plan.report_path).expect("report").len(), 2);
        assert!(!plan.scratch_dir.exists());
    }

    #[tokio::test]
    async fn missing_csv_in_archive_is_batch_error() {
        let root = tempfile::tempdir().expect("temp dir");
        let plan = plan(root.path());
        std::fs::create_dir_all(&plan.data_dir).expect("data dir");
        write_zip(&plan.data_dir.join("val.zip"), "other.csv", "x\n");

        let err = run_download(&plan, acquirer(TranscodeBehavior::WriteOutput))
            .await
            .expect_err("should fail");
        assert!(matches!(err, PipelineError::MissingAnnotations { .. }));
    }

    #[tokio::test]
    async fn missing_archive_is_batch_error() {
        let root = tempfile::tempdir().expect("temp dir");
        let plan = plan(root.path());

        let err = run_download(&plan, acquirer(TranscodeBehavior::WriteOutput))
            .await
            .expect_err("should fail");
        assert!(matches!(
            err,
            PipelineError::Core(capsnet_core::CoreError::NotFound(_))
        ));
    }
}
