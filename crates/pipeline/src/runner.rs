//! Process execution seam.
//!
//! [`ClipAcquirer`](crate::acquire::ClipAcquirer) talks to external tools
//! only through [`ToolRunner`], so tests can script resolver and transcoder
//! behavior without spawning processes.

use capsnet_core::subprocess::{self, CommandError, CommandOutput, CommandSpec};

/// Runs a fully specified external command.
pub trait ToolRunner: Send + Sync {
    fn run(
        &self,
        spec: &CommandSpec,
    ) -> impl std::future::Future<Output = Result<CommandOutput, CommandError>> + Send;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        tracing::debug!(command = %spec.display(), "Running external tool");
        subprocess::run_command(spec).await
    }
}
