//! Main CLI application

use crate::config::{build_tasks, parse_config_auto, parse_config_file, Config};
use crate::error::{CopyTaskError, ExecutionError};
use crate::runner::{reporter_for, Orchestrator, RunOptions, TaskMap};
use clap::{Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// CLI application
pub struct App {
    /// Validated tasks
    tasks: TaskMap,
    /// Config file path
    config_path: PathBuf,
}

impl App {
    /// Create a new app from the discovered configuration file
    pub fn new() -> Result<Self, CopyTaskError> {
        let (config, config_path) = parse_config_auto()?;
        Self::from_config(config, config_path)
    }

    /// Create app with a specific config file
    pub fn with_config_file(path: PathBuf) -> Result<Self, CopyTaskError> {
        let config = parse_config_file(&path)?;
        Self::from_config(config, path)
    }

    fn from_config(config: Config, config_path: PathBuf) -> Result<Self, CopyTaskError> {
        let tasks = build_tasks(&config)?;
        Ok(App { tasks, config_path })
    }

    /// Run the requested tasks
    pub fn run(self, task_names: &[String], verbose: bool) -> Result<(), CopyTaskError> {
        let options = RunOptions::new()
            .with_config_path(self.config_path.clone())
            .with_verbose(verbose);
        let reporter = reporter_for(verbose);
        reporter.on_info(&format!(
            "Found configuration by path '{}'",
            self.config_path.display()
        ));
        let orchestrator = Orchestrator::new(options).with_reporter(reporter);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ExecutionError::Runtime(format!("failed to start runtime: {}", e)))?;

        runtime.block_on(orchestrator.run(&self.tasks, task_names))?;
        Ok(())
    }
}

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("copytask")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Copy files matched by named tasks, transforming and caching on the way")
        .arg(
            Arg::new("tasks")
                .value_name("TASK")
                .help("Name of the task(s) to run")
                .num_args(1..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Path to the copytask config file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Output detailed information")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .value_parser(clap::value_parser!(Shell))
                .help("Print a shell completion script and exit"),
        )
}

/// Task names given on the command line
fn get_task_names(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("tasks")
        .map(|names| names.cloned().collect())
        .unwrap_or_default()
}

/// Set up diagnostic logging; `RUST_LOG` overrides the default level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Run the CLI application with process arguments
pub fn run() -> Result<(), CopyTaskError> {
    run_from(std::env::args_os())
}

/// Run the CLI application with explicit arguments
pub fn run_from<I, T>(args: I) -> Result<(), CopyTaskError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = build_command().get_matches_from(args);

    if let Some(shell) = matches.get_one::<Shell>("completions").copied() {
        let mut command = build_command();
        clap_complete::generate(shell, &mut command, "copytask", &mut io::stdout());
        return Ok(());
    }

    init_tracing();

    let task_names = get_task_names(&matches);
    let verbose = matches.get_flag("verbose");

    if task_names.is_empty() {
        return Err(crate::error::ConfigError::NoTasks.into());
    }

    let app = match matches.get_one::<PathBuf>("file") {
        Some(path) => App::with_config_file(path.clone())?,
        None => App::new()?,
    };

    app.run(&task_names, verbose)
}
