//! Run-wide options
//!
//! Options that apply to the whole invocation. They are fixed once the run
//! starts and shared read-only by every task.

use std::env;
use std::path::{Path, PathBuf};

/// Global options for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Base directory relative paths in task definitions resolve against
    pub working_dir: PathBuf,

    /// Configuration file path
    pub config_path: Option<PathBuf>,

    /// Whether detailed progress is reported
    pub verbose: bool,
}

impl RunOptions {
    /// Create options rooted at the current directory
    pub fn new() -> Self {
        RunOptions {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_path: None,
            verbose: false,
        }
    }

    /// Use a specific base directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the configuration file path
    ///
    /// The base directory follows the file's parent directory.
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.working_dir = parent.to_path_buf();
        }
        self.config_path = Some(path);
        self
    }

    /// Set verbosity
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a possibly relative path against the base directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new()
    }
}
