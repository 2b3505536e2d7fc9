//! Error types for copytask

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for copytask operations
pub type Result<T> = std::result::Result<T, CopyTaskError>;

/// Main error type for copytask
#[derive(Error, Debug)]
pub enum CopyTaskError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CopyTaskError {
    /// Process exit status for this error.
    ///
    /// A failing hook command hands its own exit code through; everything
    /// else exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            CopyTaskError::Execution(e) => e.exit_code().unwrap_or(1),
            _ => 1,
        }
    }
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No task(s) specified")]
    NoTasks,

    #[error("Cannot find '{0}' in configuration")]
    TaskNotFound(String),

    #[error("Task '{task}' should have '{field}' property")]
    MissingField { task: String, field: &'static str },
}

/// Which side of the file processing a hook runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Before,
    After,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Before => f.write_str("before"),
            HookKind::After => f.write_str("after"),
        }
    }
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to resolve '{pattern}': {message}")]
    Resolve { pattern: String, message: String },

    #[error("'{kind}' hook of task '{task}' failed: {source:#}")]
    Hook {
        task: String,
        kind: HookKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("Task '{task}' failed for {} file(s):{}", failures.len(), list_failures(failures))]
    TaskFailed {
        task: String,
        failures: Vec<FileJobFailure>,
    },

    #[error("Command failed with exit code {code:?}: {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl ExecutionError {
    /// Exit code of the command behind this error, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecutionError::CommandFailed { code, .. } => *code,
            ExecutionError::Hook { source, .. } => source
                .downcast_ref::<ExecutionError>()
                .and_then(ExecutionError::exit_code),
            _ => None,
        }
    }
}

fn list_failures(failures: &[FileJobFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("\n  - {}", failure))
        .collect()
}

/// Failure of a single matched file
#[derive(Error, Debug)]
#[error("Failed copy file from '{}' to '{}': {error}", source_path.display(), destination.display())]
pub struct FileJobFailure {
    pub source_path: PathBuf,
    pub destination: PathBuf,
    #[source]
    pub error: FileJobError,
}

/// The step of a file job that failed
#[derive(Error, Debug)]
pub enum FileJobError {
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("transform failed: {0:#}")]
    Transform(#[source] anyhow::Error),

    #[error("cache store failed: {0}")]
    CacheStore(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("copy failed: {0}")]
    Copy(#[source] io::Error),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
