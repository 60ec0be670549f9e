//! Bounded concurrency over a split's clip tasks.
//!
//! Each clip runs in its own tokio task and a semaphore keeps at most
//! `num_jobs` of them in flight. Handles are awaited in input order, so the
//! returned statuses follow the task list and always number exactly as many
//! as the tasks. A panic is confined to the clip that raised it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use capsnet_core::naming::ClipTask;
use capsnet_core::status::ClipStatus;
use tokio::sync::Semaphore;

use crate::acquire::ClipAcquirer;
use crate::runner::ToolRunner;

/// Default number of clips acquired concurrently.
pub const DEFAULT_NUM_JOBS: usize = 24;

/// Completions between progress log lines.
const PROGRESS_EVERY: usize = 100;

/// Acquire every task with at most `num_jobs` clips in flight.
///
/// Never short-circuits: each task yields a status whether it succeeded or
/// not. A clip whose acquisition panics is reported as a failure and its
/// siblings still run.
pub async fn dispatch_batch<R>(
    acquirer: Arc<ClipAcquirer<R>>,
    tasks: Vec<ClipTask>,
    num_jobs: usize,
) -> Vec<ClipStatus>
where
    R: ToolRunner + 'static,
{
    let total = tasks.len();
    if total == 0 {
        return Vec::new();
    }

    let workers = num_jobs.clamp(1, total);
    let permits = Arc::new(Semaphore::new(workers));
    let done = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    tracing::info!(clips = total, workers, "Dispatching clip acquisition");

    let clip_ids: Vec<String> = tasks.iter().map(|t| t.clip_id.clone()).collect();
    let mut handles = Vec::with_capacity(total);
    for task in tasks {
        // The semaphore is never closed, so this only waits for a free slot.
        let permit = Arc::clone(&permits).acquire_owned().await.ok();
        let acquirer = Arc::clone(&acquirer);
        let done = Arc::clone(&done);
        let failed = Arc::clone(&failed);

        handles.push(tokio::spawn(async move {
            let _permit = permit;
            let status = acquirer.acquire(&task).await;
            let failed = if status.success {
                failed.load(Ordering::Relaxed)
            } else {
                failed.fetch_add(1, Ordering::Relaxed) + 1
            };
            let done = done.fetch_add(1, Ordering::Relaxed) + 1;
            if done % PROGRESS_EVERY == 0 {
                tracing::info!(done, total, failed, "Acquisition progress");
            }
            status
        }));
    }

    let mut statuses = Vec::with_capacity(total);
    for (handle, clip_id) in handles.into_iter().zip(clip_ids) {
        let status = match handle.await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(clip_id = %clip_id, error = %e, "Clip acquisition panicked");
                ClipStatus::failure(clip_id, format!("worker panicked: {e}"))
            }
        };
        statuses.push(status);
    }
    statuses
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use capsnet_core::annotation::AnnotationRecord;
    use capsnet_core::subprocess::{CommandError, CommandOutput, CommandSpec};

    use super::*;
    use crate::acquire::test_support::{FakeRunner, TranscodeBehavior};
    use crate::retry::RetryPolicy;
    use crate::tools::{ResolverConfig, TranscoderConfig};

    fn task(dir: &Path, video_id: &str, start: f64) -> ClipTask {
        let record = AnnotationRecord {
            video_id: video_id.to_string(),
            start_time: start,
            end_time: start + 10.0,
            label_name: Some("dancing".into()),
        };
        ClipTask::new(record, dir)
    }

    fn tasks(dir: &Path, n: usize) -> Vec<ClipTask> {
        (0..n)
            .map(|i| task(dir, &format!("vid{i:08}"), i as f64))
            .collect()
    }

    fn acquirer<R: ToolRunner>(runner: R) -> Arc<ClipAcquirer<R>> {
        Arc::new(ClipAcquirer::new(
            runner,
            ResolverConfig::default(),
            TranscoderConfig::default(),
            RetryPolicy::default(),
        ))
    }

    /// Panics while resolving any video whose id starts with `boom`.
    struct PanickyRunner(FakeRunner);

    impl ToolRunner for PanickyRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
            if spec
                .args
                .iter()
                .any(|a| a.to_string_lossy().contains("v=boom"))
            {
                panic!("resolver blew up");
            }
            self.0.run(spec).await
        }
    }

    #[tokio::test]
    async fn returns_one_status_per_task_in_input_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let tasks = tasks(dir.path(), 37);
        let expected: Vec<String> = tasks.iter().map(|t| t.clip_id.clone()).collect();

        let statuses = dispatch_batch(
            acquirer(FakeRunner::resolving(TranscodeBehavior::WriteOutput)),
            tasks,
            4,
        )
        .await;

        let ids: Vec<String> = statuses.iter().map(|s| s.clip_id.clone()).collect();
        assert_eq!(ids, expected);
        assert!(statuses.iter().all(|s| s.success));
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let dir = tempfile::tempdir().expect("temp dir");
        let tasks = tasks(dir.path(), 6);
        let acq = acquirer(FakeRunner::resolving(TranscodeBehavior::Fail));

        let statuses = dispatch_batch(Arc::clone(&acq), tasks, 3).await;

        assert_eq!(statuses.len(), 6);
        assert!(statuses.iter().all(|s| !s.success));
        assert_eq!(acq.runner().calls(), (6, 6));
    }

    #[tokio::test]
    async fn panicking_clip_does_not_take_siblings_down() {
        let dir = tempfile::tempdir().expect("temp dir");
        let tasks = vec![
            task(dir.path(), "aaa00000000", 0.0),
            task(dir.path(), "boom0000000", 0.0),
            task(dir.path(), "ccc00000000", 0.0),
        ];
        let acq = acquirer(PanickyRunner(FakeRunner::resolving(
            TranscodeBehavior::WriteOutput,
        )));

        let statuses = dispatch_batch(Arc::clone(&acq), tasks, 1).await;

        assert_eq!(statuses.len(), 3);
        assert!(statuses[0].success, "{:?}", statuses[0]);
        assert_eq!(statuses[1].clip_id, "boom0000000_000000_000010");
        assert!(!statuses[1].success);
        assert!(
            statuses[1].message.starts_with("worker panicked: "),
            "{}",
            statuses[1].message
        );
        assert!(statuses[2].success, "{:?}", statuses[2]);
        assert_eq!(acq.runner().0.calls(), (2, 2));
    }

    #[tokio::test]
    async fn empty_batch_returns_nothing() {
        let statuses = dispatch_batch(
            acquirer(FakeRunner::resolving(TranscodeBehavior::WriteOutput)),
            Vec::new(),
            24,
        )
        .await;
        assert!(statuses.is_empty());
    }

    #[tokio::test]
    async fn zero_jobs_still_makes_progress() {
        let dir = tempfile::tempdir().expect("temp dir");
        let statuses = dispatch_batch(
            acquirer(FakeRunner::resolving(TranscodeBehavior::WriteOutput)),
            tasks(dir.path(), 3),
            0,
        )
        .await;
        assert_eq!(statuses.len(), 3);
    }
}
