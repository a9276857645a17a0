use super::{Executor, ExecutorError, SubmissionCommand, SubmissionRequest};
use std::ffi::OsString;
use tracing::debug;

/// Accepts every request without running anything
#[derive(Debug, Clone)]
pub struct DryRunExecutor {
    command: SubmissionCommand,
}

impl DryRunExecutor {
    pub fn new(command: SubmissionCommand) -> Self {
        Self { command }
    }
}

impl Executor for DryRunExecutor {
    fn command_line(&self, request: &SubmissionRequest) -> Vec<OsString> {
        self.command.argv(request)
    }

    fn submit(&mut self, request: &SubmissionRequest) -> Result<Option<u64>, ExecutorError> {
        debug!(label = %request.label, path = ?request.path, "Dry run, skipping submission");

        Ok(None)
    }
}
