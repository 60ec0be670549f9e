//! Kinetics clip acquisition pipeline.
//!
//! - [`tools`]: resolver and transcoder command construction.
//! - [`runner`]: the [`runner::ToolRunner`] seam over process execution.
//! - [`retry`]: bounded resolution retries and the retry classifier.
//! - [`acquire`]: per-clip acquisition (skip, resolve, transcode, verify).
//! - [`dispatch`]: bounded worker pool over a split's clip tasks.
//! - [`download`]: archive staging, per-split runs, reports, cleanup.

pub mod acquire;
pub mod dispatch;
pub mod download;
pub mod error;
pub mod retry;
pub mod runner;
pub mod tools;

pub use acquire::ClipAcquirer;
pub use dispatch::dispatch_batch;
pub use download::{run_download, DownloadPlan, SplitReport, SplitSpec};
pub use error::PipelineError;
pub use runner::{ProcessRunner, ToolRunner};
