use crate::presets::Preset;
use globset::{GlobBuilder, GlobMatcher};
use serde::Serialize;
use std::{
    fs::File,
    io::Error,
    os::unix::fs::MetadataExt,
    path::{Component, Path, PathBuf},
};
use thiserror::Error;
use tracing::{error, warn};

/// Location of the derivatives tree relative to the root directory
pub const DERIVATIVES: [&str; 2] = ["CCIR_01211", "derivatives"];

// check if a file is executable
pub fn check_executable(path: &Path) -> Result<bool, ConfigErrors> {
    if !path.is_file() {
        Err(ConfigErrors::FileNotFound)
    } else {
        match File::open(path).map(|file| file.metadata()) {
            Ok(Ok(metadata)) => Ok((metadata.mode() & 0o111) != 0),
            Ok(Err(e)) | Err(e) => Err(ConfigErrors::MetadataNotFound(e)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Glob was invalid")]
    InvalidGlob(#[from] globset::Error),
    #[error("Preset '{0}' is not defined, see `dispatch list`")]
    UnknownPreset(String),
    #[error("{0} is not set, unable to resolve paths")]
    MissingEnvironment(&'static str),
    #[error("File not found")]
    FileNotFound,
    #[error("Metadata not found")]
    MetadataNotFound(#[from] Error),
    #[error("Preflight checks failed")]
    PreflightFailed,
}

/// Values normally taken from the process environment
/// The CLI fills these from `SINGULARITY_HOME` and `HOME` unless overridden
#[derive(Clone, Debug, Default)]
pub struct Environment {
    pub root: Option<PathBuf>,
    pub home: Option<PathBuf>,
}

impl Environment {
    pub fn new(root: Option<PathBuf>, home: Option<PathBuf>) -> Self {
        Self { root, home }
    }

    fn root(&self) -> Result<&Path, ConfigErrors> {
        non_empty(self.root.as_deref()).ok_or(ConfigErrors::MissingEnvironment("SINGULARITY_HOME"))
    }

    fn home(&self) -> Result<&Path, ConfigErrors> {
        non_empty(self.home.as_deref()).ok_or(ConfigErrors::MissingEnvironment("HOME"))
    }
}

/// a subject has to name exactly one folder directly below the derivatives directory
pub fn is_plain_subject(subject: &str) -> bool {
    let mut components = Path::new(subject).components();

    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !subject.contains('/')
}

fn non_empty(path: Option<&Path>) -> Option<&Path> {
    path.filter(|path| !path.as_os_str().is_empty())
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    // name of the preset, used to tag diagnostics
    pub name: String,
    // derivatives directory, every subject is a folder below it
    pub base_directory: PathBuf,
    pub subjects: Vec<String>,
    // file name fragment, matched as `*<pattern>*`
    pub pattern: String,
    // input function types, one job per label and file
    pub labels: Vec<String>,
    // trailing positional arguments for every job
    pub parameters: Vec<String>,
    // batch script handed to the submission command
    pub script: PathBuf,
    // print each command line before submitting it
    pub echo: bool,
}

impl DispatchConfig {
    /// resolve a preset against the injected environment
    pub fn resolve(preset: &Preset, environment: &Environment) -> Result<Self, ConfigErrors> {
        let root = environment.root()?;
        let home = environment.home()?;

        Ok(Self {
            name: preset.name.to_string(),
            base_directory: DERIVATIVES
                .iter()
                .fold(root.to_path_buf(), |path, segment| path.join(segment)),
            subjects: preset.subjects.iter().map(ToString::to_string).collect(),
            pattern: preset.pattern.to_string(),
            labels: preset.labels.iter().map(ToString::to_string).collect(),
            parameters: preset.parameters.iter().map(ToString::to_string).collect(),
            script: home.join(preset.script),
            echo: preset.echo,
        })
    }

    /// replace the subject list, an empty override keeps the preset's subjects
    pub fn with_subjects(mut self, subjects: Vec<String>) -> Self {
        if !subjects.is_empty() {
            self.subjects = subjects;
        }

        self
    }

    /// append parameters after the preset's own
    pub fn with_extra_parameters(mut self, parameters: Vec<String>) -> Self {
        self.parameters.extend(parameters);

        self
    }

    pub fn subject_folder(&self, subject: &str) -> PathBuf {
        self.base_directory.join(subject)
    }

    /// Compile the file name glob for the pattern
    pub fn compile_glob(&self) -> Result<GlobMatcher, ConfigErrors> {
        Ok(GlobBuilder::new(&format!("*{}*", self.pattern))
            .literal_separator(true)
            .build()?
            .compile_matcher())
    }

    pub fn preflight_checks(&self) -> bool {
        // collect all problems instead of stopping at the first one
        let mut contains_error = false;

        if self.subjects.is_empty() {
            error!("{}: no subjects defined, nothing to dispatch", self.name);
            contains_error = true;
        }

        for subject in self.subjects.iter() {
            if !is_plain_subject(subject) {
                error!(
                    "{}: subject '{subject}' must be a single folder name below the derivatives directory",
                    self.name
                );
                contains_error = true;
            }
        }

        if self.labels.is_empty() {
            error!("{}: no labels defined, nothing to dispatch", self.name);
            contains_error = true;
        }

        if let Err(e) = self.compile_glob() {
            error!("{}: pattern '{}' is not a valid glob: {e}", self.name, self.pattern);
            contains_error = true;
        }

        if !self.base_directory.is_dir() {
            error!(
                "{}: derivatives directory {} does not exist",
                self.name,
                self.base_directory.to_string_lossy()
            );
            contains_error = true;
        } else {
            for subject in self.subjects.iter().filter(|subject| is_plain_subject(subject)) {
                if !self.subject_folder(subject).is_dir() {
                    warn!("{}: no folder for {subject}, it will be skipped", self.name);
                }
            }
        }

        match check_executable(&self.script) {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    "{}: script {} is not executable, relying on the submission command to read it",
                    self.name,
                    self.script.to_string_lossy()
                );
            }
            Err(e) => {
                error!(
                    "{}: failed to find script {}: {e}",
                    self.name,
                    self.script.to_string_lossy()
                );
                contains_error = true;
            }
        }

        contains_error
    }
}
