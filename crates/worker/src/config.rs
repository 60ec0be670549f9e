use std::path::PathBuf;
use std::time::Duration;

use capsnet_core::layout::LabelListMode;
use capsnet_core::report::ReportMode;
use capsnet_pipeline::dispatch::DEFAULT_NUM_JOBS;
use capsnet_pipeline::download::{kinetics600_splits, DownloadPlan};
use capsnet_pipeline::retry::{
    AlwaysRetry, PermanentErrorPatterns, RetryPolicy, DEFAULT_RESOLVE_ATTEMPTS,
};
use capsnet_pipeline::tools::{
    ResolverConfig, TranscoderConfig, DEFAULT_RESOLVER_BIN, DEFAULT_RESOLVE_TIMEOUT,
    DEFAULT_TRANSCODER_BIN, DEFAULT_TRANSCODE_TIMEOUT,
};
use capsnet_pipeline::{ClipAcquirer, ToolRunner};

/// An environment variable held a value that could not be used.
#[derive(Debug, thiserror::Error)]
#[error("{var}={value:?} is invalid: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Downloader configuration loaded from environment variables.
///
/// Every field has a default matching the standard Kinetics-600 layout, so
/// an empty environment is a valid configuration.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Directory holding the split archives (default: `data`).
    pub data_dir: PathBuf,
    /// Root of the clip tree (default: `data/kinetics600`).
    pub output_dir: PathBuf,
    /// Scratch directory removed after the run (default: `data/temp`).
    pub scratch_dir: PathBuf,
    pub labels_path: PathBuf,
    pub report_path: PathBuf,
    /// Clips in flight (default: `24`).
    pub num_jobs: usize,
    pub resolver_bin: String,
    pub transcoder_bin: String,
    pub resolve_attempts: u32,
    pub resolve_timeout: Duration,
    pub transcode_timeout: Duration,
    pub report_mode: ReportMode,
    pub label_list_mode: LabelListMode,
    /// Stop retrying on resolver errors that can never succeed.
    pub skip_permanent_errors: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("data/kinetics600"),
            scratch_dir: PathBuf::from("data/temp"),
            labels_path: PathBuf::from("data/kinetics600_labels.txt"),
            report_path: PathBuf::from("kinetics600_download_report.json"),
            num_jobs: DEFAULT_NUM_JOBS,
            resolver_bin: DEFAULT_RESOLVER_BIN.to_string(),
            transcoder_bin: DEFAULT_TRANSCODER_BIN.to_string(),
            resolve_attempts: DEFAULT_RESOLVE_ATTEMPTS,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            transcode_timeout: DEFAULT_TRANSCODE_TIMEOUT,
            report_mode: ReportMode::default(),
            label_list_mode: LabelListMode::default(),
            skip_permanent_errors: false,
        }
    }
}

impl DownloadConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                            | Default                             |
    /// |------------------------------------|-------------------------------------|
    /// | `KINETICS_DATA_DIR`                | `data`                              |
    /// | `KINETICS_OUTPUT_DIR`              | `data/kinetics600`                  |
    /// | `KINETICS_SCRATCH_DIR`             | `data/temp`                         |
    /// | `KINETICS_LABELS_PATH`             | `data/kinetics600_labels.txt`       |
    /// | `KINETICS_REPORT_PATH`             | `kinetics600_download_report.json`  |
    /// | `KINETICS_NUM_JOBS`                | `24`                                |
    /// | `KINETICS_RESOLVER_BIN`            | `youtube-dl`                        |
    /// | `KINETICS_TRANSCODER_BIN`          | `ffmpeg`                            |
    /// | `KINETICS_RESOLVE_ATTEMPTS`        | `5`                                 |
    /// | `KINETICS_RESOLVE_TIMEOUT_SECS`    | `60`                                |
    /// | `KINETICS_TRANSCODE_TIMEOUT_SECS`  | `600`                               |
    /// | `KINETICS_REPORT_MODE`             | `overwrite`                         |
    /// | `KINETICS_LABEL_LIST_MODE`         | `first-writer-wins`                 |
    /// | `KINETICS_SKIP_PERMANENT_ERRORS`   | `false`                             |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`. Unset and empty values fall back
    /// to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let path = |key: &str, default: PathBuf| get(key).map(PathBuf::from).unwrap_or(default);

        Ok(Self {
            data_dir: path("KINETICS_DATA_DIR", defaults.data_dir),
            output_dir: path("KINETICS_OUTPUT_DIR", defaults.output_dir),
            scratch_dir: path("KINETICS_SCRATCH_DIR", defaults.scratch_dir),
            labels_path: path("KINETICS_LABELS_PATH", defaults.labels_path),
            report_path: path("KINETICS_REPORT_PATH", defaults.report_path),
            num_jobs: parse(&get, "KINETICS_NUM_JOBS", defaults.num_jobs)?,
            resolver_bin: get("KINETICS_RESOLVER_BIN").unwrap_or(defaults.resolver_bin),
            transcoder_bin: get("KINETICS_TRANSCODER_BIN").unwrap_or(defaults.transcoder_bin),
            resolve_attempts: parse(&get, "KINETICS_RESOLVE_ATTEMPTS", defaults.resolve_attempts)?,
            resolve_timeout: Duration::from_secs(parse(
                &get,
                "KINETICS_RESOLVE_TIMEOUT_SECS",
                defaults.resolve_timeout.as_secs(),
            )?),
            transcode_timeout: Duration::from_secs(parse(
                &get,
                "KINETICS_TRANSCODE_TIMEOUT_SECS",
                defaults.transcode_timeout.as_secs(),
            )?),
            report_mode: parse(&get, "KINETICS_REPORT_MODE", defaults.report_mode)?,
            label_list_mode: parse(&get, "KINETICS_LABEL_LIST_MODE", defaults.label_list_mode)?,
            skip_permanent_errors: parse_bool(
                &get,
                "KINETICS_SKIP_PERMANENT_ERRORS",
                defaults.skip_permanent_errors,
            )?,
        })
    }

    /// The run plan over the three Kinetics-600 splits.
    pub fn plan(&self) -> DownloadPlan {
        DownloadPlan {
            data_dir: self.data_dir.clone(),
            scratch_dir: self.scratch_dir.clone(),
            output_dir: self.output_dir.clone(),
            labels_path: self.labels_path.clone(),
            report_path: self.report_path.clone(),
            report_mode: self.report_mode,
            label_list_mode: self.label_list_mode,
            num_jobs: self.num_jobs,
            splits: kinetics600_splits(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        if self.skip_permanent_errors {
            RetryPolicy::new(self.resolve_attempts, PermanentErrorPatterns::youtube())
        } else {
            RetryPolicy::new(self.resolve_attempts, AlwaysRetry)
        }
    }

    /// Build a clip acquirer running tools through `runner`.
    pub fn acquirer<R: ToolRunner>(&self, runner: R) -> ClipAcquirer<R> {
        ClipAcquirer::new(
            runner,
            ResolverConfig {
                program: self.resolver_bin.clone(),
                timeout: self.resolve_timeout,
                ..Default::default()
            },
            TranscoderConfig {
                program: self.transcoder_bin.clone(),
                timeout: self.transcode_timeout,
                ..Default::default()
            },
            self.retry_policy(),
        )
    }
}

fn parse<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError {
                var,
                reason: e.to_string(),
                value,
            })
        }
    }
}

fn parse_bool<G>(get: &G, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(value) = get(var) else {
        return Ok(default);
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError {
            var,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}
