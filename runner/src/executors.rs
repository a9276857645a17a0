mod dry_run;
mod sbatch;

#[cfg(test)]
mod executors_test;

pub use dry_run::DryRunExecutor;
pub use sbatch::SbatchExecutor;

use itertools::Itertools;
use std::{
    ffi::{OsStr, OsString},
    io,
    iter::once,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Submission command exited with status {0}")]
    Status(i32),
    #[error("Failed to spawn submission command")]
    Spawn(#[from] io::Error),
}

impl ExecutorError {
    /// exit status as a shell would report it
    pub fn status(&self) -> i32 {
        match self {
            Self::Status(code) => *code,
            Self::Spawn(error) if error.kind() == io::ErrorKind::NotFound => 127,
            Self::Spawn(_) => 126,
        }
    }
}

/// One job: `(label, path, parameters...)` in exactly this order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub label: String,
    pub path: PathBuf,
    pub parameters: Vec<String>,
}

impl SubmissionRequest {
    pub fn new(label: &str, path: &Path, parameters: &[String]) -> Self {
        Self {
            label: label.to_string(),
            path: path.to_path_buf(),
            parameters: parameters.to_vec(),
        }
    }

    pub fn args(&self) -> impl Iterator<Item = &OsStr> {
        once(OsStr::new(&self.label))
            .chain(once(self.path.as_os_str()))
            .chain(self.parameters.iter().map(OsStr::new))
    }
}

/// The submission binary together with the batch script it is handed
#[derive(Debug, Clone)]
pub struct SubmissionCommand {
    pub program: PathBuf,
    pub script: PathBuf,
}

impl SubmissionCommand {
    pub fn new(program: PathBuf, script: PathBuf) -> Self {
        Self { program, script }
    }

    pub fn argv(&self, request: &SubmissionRequest) -> Vec<OsString> {
        once(self.program.as_os_str())
            .chain(once(self.script.as_os_str()))
            .chain(request.args())
            .map(OsStr::to_os_string)
            .collect_vec()
    }
}

pub trait Executor {
    /// the full command line a submission would run
    fn command_line(&self, request: &SubmissionRequest) -> Vec<OsString>;

    /// submit a job and wait for the acknowledgement, returns the job id if one was reported
    fn submit(&mut self, request: &SubmissionRequest) -> Result<Option<u64>, ExecutorError>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn command_line(&self, request: &SubmissionRequest) -> Vec<OsString> {
        (**self).command_line(request)
    }

    fn submit(&mut self, request: &SubmissionRequest) -> Result<Option<u64>, ExecutorError> {
        (**self).submit(request)
    }
}

#[derive(Debug, Clone)]
pub enum Executors {
    Sbatch(SbatchExecutor),
    DryRun(DryRunExecutor),
}

impl Executors {
    pub fn load(command: SubmissionCommand, dry_run: bool) -> Self {
        if dry_run {
            Self::DryRun(DryRunExecutor::new(command))
        } else {
            Self::Sbatch(SbatchExecutor::new(command))
        }
    }
}

impl Executor for Executors {
    fn command_line(&self, request: &SubmissionRequest) -> Vec<OsString> {
        match self {
            Self::Sbatch(executor) => executor.command_line(request),
            Self::DryRun(executor) => executor.command_line(request),
        }
    }

    fn submit(&mut self, request: &SubmissionRequest) -> Result<Option<u64>, ExecutorError> {
        match self {
            Self::Sbatch(executor) => executor.submit(request),
            Self::DryRun(executor) => executor.submit(request),
        }
    }
}

/// join arguments into a line that can be pasted into a shell
pub fn render_command_line(argv: &[OsString]) -> String {
    argv.iter()
        .map(|arg| quote(&arg.to_string_lossy()))
        .join(" ")
}

fn quote(arg: &str) -> String {
    let is_plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:+,@%".contains(c));

    if is_plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// extract the id from sbatch's `Submitted batch job <id>` acknowledgement
pub fn parse_job_id(stdout: &str) -> Option<u64> {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("Submitted batch job "))
        .and_then(|id| id.split_whitespace().next())
        .and_then(|id| id.parse().ok())
}
