mod collector;
mod config;
mod dispatch;
mod executors;
mod presets;


use clap::{Args, Parser, Subcommand};
use config::{ConfigErrors, DispatchConfig, Environment};
use dispatch::Dispatcher;
use executors::{Executors, SubmissionCommand};
use presets::PRESETS;
use std::{io, path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// exit status for configuration problems, no job was submitted
const CONFIG_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about = "Submit one batch job per derivative file and input function type")]
struct Cli {
    /// Log debug output unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit every matching file with every label of a preset
    Run {
        preset: String,
        #[command(flatten)]
        overrides: Overrides,
        /// Submission command the batch script is passed to
        #[arg(long, default_value = "sbatch")]
        sbatch: PathBuf,
        /// Print the command lines without submitting anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the resolved configuration of a preset as YAML
    Show {
        preset: String,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// List all presets
    List,
}

#[derive(Args, Debug)]
struct Overrides {
    /// Root of the derivatives tree
    #[arg(long, env = "SINGULARITY_HOME", hide_env_values = true)]
    root: Option<PathBuf>,
    /// Directory the batch script is located in
    #[arg(long, env = "HOME", hide_env_values = true)]
    home: Option<PathBuf>,
    /// Only dispatch these subjects (repeatable)
    #[arg(long = "subject")]
    subjects: Vec<String>,
    /// Extra trailing parameter for every job (repeatable)
    #[arg(long = "param")]
    parameters: Vec<String>,
}

impl Overrides {
    fn resolve(self, preset: &str) -> Result<DispatchConfig, ConfigErrors> {
        let environment = Environment::new(self.root, self.home);

        Ok(
            DispatchConfig::resolve(presets::lookup(preset)?, &environment)?
                .with_subjects(self.subjects)
                .with_extra_parameters(self.parameters),
        )
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };

    // stdout is reserved for echoed command lines
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .init();
}

fn exit_code(status: i32) -> ExitCode {
    ExitCode::from(status.clamp(1, 255) as u8)
}

fn run(preset: String, overrides: Overrides, sbatch: PathBuf, dry_run: bool) -> ExitCode {
    let mut config = match overrides.resolve(&preset) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{preset}: {e}");

            return ExitCode::from(CONFIG_FAILURE);
        }
    };

    if config.preflight_checks() {
        eprintln!("{preset}: {}", ConfigErrors::PreflightFailed);

        return ExitCode::from(CONFIG_FAILURE);
    }

    // a dry run is only useful if the command lines are visible
    config.echo |= dry_run;

    let executor = Executors::load(SubmissionCommand::new(sbatch, config.script.clone()), dry_run);
    let mut dispatcher = match Dispatcher::new(&config, executor, io::stdout().lock()) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            eprintln!("{preset}: {e}");

            return ExitCode::from(CONFIG_FAILURE);
        }
    };

    match dispatcher.run() {
        Ok(summary) if dry_run => {
            info!("{preset}: dry run, {} jobs would be submitted", summary.submissions);

            ExitCode::SUCCESS
        }
        Ok(summary) => {
            info!("{preset}: {} jobs submitted", summary.submissions);

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");

            exit_code(e.status())
        }
    }
}

fn show(preset: String, overrides: Overrides) -> ExitCode {
    match overrides
        .resolve(&preset)
        .map(|config| serde_yaml::to_string(&config))
    {
        Ok(Ok(yaml)) => {
            print!("{yaml}");

            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!("Failed to serialize configuration: {e}");

            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{preset}: {e}");

            ExitCode::from(CONFIG_FAILURE)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            preset,
            overrides,
            sbatch,
            dry_run,
        } => run(preset, overrides, sbatch, dry_run),
        Commands::Show { preset, overrides } => show(preset, overrides),
        Commands::List => {
            for preset in PRESETS.values() {
                println!("{:<10} {}", preset.name, preset.description);
            }

            ExitCode::SUCCESS
        }
    }
}
