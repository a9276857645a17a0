use super::{parse_job_id, Executor, ExecutorError, SubmissionCommand, SubmissionRequest};
use std::{
    ffi::OsString,
    process::{Command, Stdio},
};
use tracing::{debug, info, warn};

/// Submits every request through `sbatch` (or anything with the same calling convention)
#[derive(Debug, Clone)]
pub struct SbatchExecutor {
    command: SubmissionCommand,
}

impl SbatchExecutor {
    pub fn new(command: SubmissionCommand) -> Self {
        Self { command }
    }
}

impl Executor for SbatchExecutor {
    fn command_line(&self, request: &SubmissionRequest) -> Vec<OsString> {
        self.command.argv(request)
    }

    fn submit(&mut self, request: &SubmissionRequest) -> Result<Option<u64>, ExecutorError> {
        // only the enqueue acknowledgement is awaited, not the job itself
        let output = Command::new(&self.command.program)
            .arg(&self.command.script)
            .args(request.args())
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            // killed by a signal has no code
            let code = output.status.code().unwrap_or(1);
            warn!(label = %request.label, path = ?request.path, code, "Submission failed");

            return Err(ExecutorError::Status(code));
        }

        let job = parse_job_id(&stdout);

        match job {
            Some(job) => info!(job, label = %request.label, path = ?request.path, "Submitted batch job"),
            None => debug!(output = %stdout.trim(), "Submission acknowledged without a job id"),
        }

        Ok(job)
    }
}
