use crate::{
    collector::{Collect, Collector},
    config::{ConfigErrors, DispatchConfig},
    executors::{render_command_line, Executor, SubmissionRequest},
};
use itertools::iproduct;
use std::{fmt, io::Write};
use thiserror::Error;
use tracing::{debug, error, info, instrument};

/// The external steps a run is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Traversal,
    Submission,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Traversal => write!(f, "traversal"),
            Self::Submission => write!(f, "submission"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("{script}: {step} failed with exit status {status}")]
    StepFailed {
        script: String,
        step: Step,
        status: i32,
    },
    #[error("{script}: failed to print command line: {source}")]
    Output {
        script: String,
        source: std::io::Error,
    },
}

impl DispatchError {
    pub fn status(&self) -> i32 {
        match self {
            Self::StepFailed { status, .. } => *status,
            Self::Output { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub subjects: usize,
    pub files: usize,
    pub submissions: usize,
}

/// Submits one job per (file, label) for every subject, stopping at the first failure
pub struct Dispatcher<'a, E: Executor, W: Write, C: Collect = Collector> {
    config: &'a DispatchConfig,
    collector: C,
    executor: E,
    out: W,
}

impl<'a, E: Executor, W: Write> Dispatcher<'a, E, W> {
    pub fn new(config: &'a DispatchConfig, executor: E, out: W) -> Result<Self, ConfigErrors> {
        let collector = Collector::new(config.compile_glob()?);

        Ok(Self::with_collector(config, collector, executor, out))
    }
}

impl<'a, E: Executor, W: Write, C: Collect> Dispatcher<'a, E, W, C> {
    pub fn with_collector(config: &'a DispatchConfig, collector: C, executor: E, out: W) -> Self {
        Self {
            config,
            collector,
            executor,
            out,
        }
    }

    fn failed(&self, step: Step, status: i32) -> DispatchError {
        DispatchError::StepFailed {
            script: self.config.name.clone(),
            step,
            status,
        }
    }

    #[instrument(skip(self), fields(script = %self.config.name), level = "info")]
    pub fn run(&mut self) -> Result<DispatchSummary, DispatchError> {
        let config = self.config;
        let mut summary = DispatchSummary::default();

        for subject in config.subjects.iter() {
            let folder = config.subject_folder(subject);
            let files = self.collector.collect(&folder).map_err(|e| {
                error!(folder = ?folder, "Failed to search for files: {e}");

                self.failed(Step::Traversal, 1)
            })?;

            debug!("Found {} files for {subject}", files.len());
            summary.subjects += 1;
            summary.files += files.len();

            for (file, label) in iproduct!(files.iter(), config.labels.iter()) {
                let request = SubmissionRequest::new(label, file, &config.parameters);

                if config.echo {
                    let line = render_command_line(&self.executor.command_line(&request));

                    writeln!(self.out, "{line}").map_err(|source| DispatchError::Output {
                        script: config.name.clone(),
                        source,
                    })?;
                }

                if let Err(e) = self.executor.submit(&request) {
                    error!(label = %label, file = ?file, "Submission failed: {e}");

                    return Err(self.failed(Step::Submission, e.status()));
                }

                summary.submissions += 1;
            }
        }

        info!(
            "Done with {} submissions for {} files over {} subjects",
            summary.submissions, summary.files, summary.subjects
        );

        Ok(summary)
    }
}
