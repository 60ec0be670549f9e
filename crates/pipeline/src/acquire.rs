//! Per-clip acquisition.
//!
//! Strictly sequential within a clip:
//!
//! 1. **Skip**: an existing output file is reported as `Exists` and no
//!    process runs. Re-running the pipeline therefore resumes.
//! 2. **Resolve**: the resolver is retried under the [`RetryPolicy`].
//! 3. **Transcode**: a single attempt.
//! 4. **Verify**: the output must exist even after a zero exit.
//!
//! Every path ends in a [`ClipStatus`]; nothing propagates to the batch.

use std::path::Path;

use capsnet_core::naming::ClipTask;
use capsnet_core::status::{ClipOutcome, ClipStatus};
use capsnet_core::subprocess::CommandError;

use crate::retry::{AttemptFailure, RetryPolicy};
use crate::runner::ToolRunner;
use crate::tools::{ResolverConfig, TranscoderConfig};

/// Acquires single clips through a [`ToolRunner`].
#[derive(Debug)]
pub struct ClipAcquirer<R> {
    runner: R,
    resolver: ResolverConfig,
    transcoder: TranscoderConfig,
    retry: RetryPolicy,
}

impl<R: ToolRunner> ClipAcquirer<R> {
    pub fn new(
        runner: R,
        resolver: ResolverConfig,
        transcoder: TranscoderConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            runner,
            resolver,
            transcoder,
            retry,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Acquire `task` and report its status.
    pub async fn acquire(&self, task: &ClipTask) -> ClipStatus {
        let outcome = self.acquire_outcome(task).await;
        match &outcome {
            ClipOutcome::AlreadyExists => {
                tracing::debug!(clip_id = %task.clip_id, "Clip already exists");
            }
            ClipOutcome::Downloaded => {
                tracing::info!(clip_id = %task.clip_id, "Clip downloaded");
            }
            ClipOutcome::OutputMissingAfterTranscode => {
                tracing::warn!(
                    clip_id = %task.clip_id,
                    path = %task.output_path.display(),
                    "Transcoder exited cleanly but produced no output",
                );
            }
            ClipOutcome::ResolutionFailed { attempts, .. } => {
                tracing::warn!(clip_id = %task.clip_id, attempts, "Clip resolution failed");
            }
            ClipOutcome::TranscodeFailed { .. } => {
                tracing::warn!(clip_id = %task.clip_id, "Clip transcode failed");
            }
        }
        outcome.into_status(task.clip_id.clone())
    }

    /// Run the four acquisition steps and return the typed outcome.
    pub async fn acquire_outcome(&self, task: &ClipTask) -> ClipOutcome {
        if output_exists(&task.output_path).await {
            return ClipOutcome::AlreadyExists;
        }

        let direct_url = match self.resolve(task).await {
            Ok(url) => url,
            Err(outcome) => return outcome,
        };

        let spec = self.transcoder.command(
            &direct_url,
            task.record.start_time,
            task.record.end_time,
            &task.output_path,
        );
        let failure = match self.runner.run(&spec).await {
            Ok(output) if output.success() => None,
            Ok(output) => {
                tracing::debug!(
                    clip_id = %task.clip_id,
                    exit_code = output.exit_code,
                    elapsed_ms = output.duration_ms,
                    "Transcoder exited non-zero",
                );
                Some(output.combined())
            }
            Err(e) => Some(e.to_string()),
        };
        if let Some(output) = failure {
            discard_partial(&task.output_path).await;
            return ClipOutcome::TranscodeFailed { output };
        }

        if output_exists(&task.output_path).await {
            ClipOutcome::Downloaded
        } else {
            ClipOutcome::OutputMissingAfterTranscode
        }
    }

    /// Resolve the direct media URL, retrying under the policy.
    async fn resolve(&self, task: &ClipTask) -> Result<String, ClipOutcome> {
        let spec = self.resolver.command(&task.record.video_id);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let failure = match self.runner.run(&spec).await {
                Ok(output) if output.success() => {
                    let url = output
                        .stdout
                        .lines()
                        .map(str::trim)
                        .find(|l| !l.is_empty())
                        .unwrap_or_default()
                        .to_string();
                    return Ok(url);
                }
                Ok(output) => AttemptFailure {
                    attempt,
                    exit_code: Some(output.exit_code),
                    timed_out: false,
                    message: output.combined(),
                },
                Err(e) => AttemptFailure {
                    attempt,
                    exit_code: None,
                    timed_out: matches!(e, CommandError::Timeout { .. }),
                    message: e.to_string(),
                },
            };

            tracing::debug!(
                clip_id = %task.clip_id,
                attempt,
                exit_code = ?failure.exit_code,
                timed_out = failure.timed_out,
                "Resolver attempt failed",
            );

            if !self.retry.should_retry(&failure) {
                return Err(ClipOutcome::ResolutionFailed {
                    attempts: attempt,
                    output: failure.message,
                });
            }
        }
    }
}

async fn output_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// A failed or killed transcode must not leave a file behind for the skip
/// check to accept on the next run.
async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed partial transcoder output");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove partial transcoder output",
            );
        }
    }
}


#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use capsnet_core::annotation::AnnotationRecord;
    use capsnet_core::status::{MSG_DOWNLOADED, MSG_EXISTS};

    use super::test_support::{FakeRunner, TranscodeBehavior};
    use super::*;
    use crate::retry::{AlwaysRetry, PermanentErrorPatterns};

    fn task_in(dir: &Path) -> ClipTask {
        let record = AnnotationRecord {
            video_id: "abc12345678".into(),
            start_time: 10.0,
            end_time: 15.0,
            label_name: Some("dancing".into()),
        };
        ClipTask::new(record, dir)
    }

    fn acquirer(runner: FakeRunner, retry: RetryPolicy) -> ClipAcquirer<FakeRunner> {
        ClipAcquirer::new(
            runner,
            ResolverConfig::default(),
            TranscoderConfig::default(),
            retry,
        )
    }

    #[tokio::test]
    async fn existing_output_is_skipped_without_processes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let task = task_in(dir.path());
        std::fs::write(&task.output_path, b"done").expect("seed clip");

        let acq = acquirer(
            FakeRunner::resolving(TranscodeBehavior::Fail),
            RetryPolicy::default(),
        );
        let status = acq.acquire(&task).await;

        assert_eq!(
            status,
            ClipStatus {
                clip_id: "abc12345678_000010_000015".into(),
                success: true,
                message: MSG_EXISTS.into(),
            }
        );
        assert_eq!(acq.runner().calls(), (0, 0));
    }

    #[tokio::test]
    async fn successful_clip_is_downloaded() {
        let dir = tempfile::tempdir().expect("temp dir");
        let task = task_in(dir.path());

        let acq = acquirer(
            FakeRunner::resolving(TranscodeBehavior::WriteOutput),
            RetryPolicy::default(),
        );
        let status = acq.acquire(&task).await;

        assert!(status.success);
        assert_eq!(status.message, MSG_DOWNLOADED);
        assert!(task.output_path.exists());
        assert_eq!(acq.runner().calls(), (1, 1));
    }

    #[tokio::test]
    async fn resolution_gives_up_after_five_attempts() {
        let dir = tempfile::tempdir().expect("temp dir");
        let task = task_in(dir.path());

        let acq = acquirer(
            FakeRunner::new(vec![], TranscodeBehavior::WriteOutput),
            RetryPolicy::default(),
        );
        let status = acq.acquire(&task).await;

        assert!(!status.success);
        assert_eq!(status.message, "ERROR: attempt 5 failed");
        assert_eq!(acq.runner().calls(), (5, 0));
    }

    #[tokio::test]
    async fn resolution_recovers_within_budget() {
        let dir = tempfile::tempdir().expect("temp dir");
        let task = task_in(dir.path());

        let script = vec![
            Err("HTTP Error 429".to_string()),
            Err("HTTP Error 429".to_string()),
            Ok("https://media.invalid/ok.mp4".to_string()),
        ];
        let acq = acquirer(
            FakeRunner::new(script, TranscodeBehavior::WriteOutput),
            RetryPolicy::new(5, AlwaysRetry),
        );
        let status = acq.acquire(&task).await;

        assert!(status.success);
        assert_eq!(acq.runner().calls(), (3, 1));
    }

    #[tokio::test]
    async fn permanent_resolution_error_stops_early() {
        let dir = tempfile::tempdir().expect("temp dir");
        let task = task_in(dir.path());

        let acq = acquirer(
            FakeRunner::new(
                vec![Err("ERROR: Private video".to_string())],
                TranscodeBehavior::WriteOutput,
            ),
            RetryPolicy::new(5, PermanentErrorPatterns::youtube()),
        );
        let outcome = acq.acquire_outcome(&task).await;

        assert_eq!(
            outcome,
            ClipOutcome::ResolutionFailed {
                attempts: 1,
                output: "ERROR: Private video".into(),
            }
        );
    }

    #[tokio::test]
    async fn transcode_failure_is_not_retried() {
        let dir = tempfile::tempdir().expect("temp dir");
        let task = task_in(dir.path());

        let acq = acquirer(
            FakeRunner::resolving(TranscodeBehavior::Fail),
            RetryPolicy::default(),
        );
        let status = acq.acquire(&task).await;

        assert!(!status.success);
        assert_eq!(status.message, "Invalid data found when processing input");
        assert_eq!(acq.runner().calls(), (1, 1));
    }

    #[tokio::test]
    async fn failed_transcode_leaves_no_output_to_skip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let task = task_in(dir.path());

        let acq = acquirer(
            FakeRunner::resolving(TranscodeBehavior::FailAfterPartialWrite),
            RetryPolicy::default(),
        );
        let first = acq.acquire(&task).await;
        assert!(!first.success);
        assert_eq!(first.message, "Conversion failed!");
        assert!(!task.output_path.exists());

        let second = acq.acquire(&task).await;
        assert!(!second.success);
        assert_ne!(second.message, MSG_EXISTS);
        assert_eq!(acq.runner().calls(), (2, 2));
    }

    #[tokio::test]
    async fn clean_exit_without_output_fails_with_downloaded_message() {
        let dir = tempfile::tempdir().expect("temp dir");
        let task = task_in(dir.path());

        let acq = acquirer(
            FakeRunner::resolving(TranscodeBehavior::ExitCleanly),
            RetryPolicy::default(),
        );
        let status = acq.acquire(&task).await;

        assert_eq!(
            status,
            ClipStatus {
                clip_id: task.clip_id.clone(),
                success: false,
                message: MSG_DOWNLOADED.into(),
            }
        );
    }

    #[tokio::test]
    async fn missing_label_dir_surfaces_as_missing_output() {
        let task = task_in(&PathBuf::from("/nonexistent/kinetics600/train/dancing"));
        let acq = acquirer(
            FakeRunner::resolving(TranscodeBehavior::ExitCleanly),
            RetryPolicy::default(),
        );
        let outcome = acq.acquire_outcome(&task).await;
        assert_eq!(outcome, ClipOutcome::OutputMissingAfterTranscode);
    }
}
