//! Runtime task definitions
//!
//! This differs from config::Task by holding validated values and the
//! transform and hook capabilities a task runs with.

use crate::config::GlobOptions;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::RunOptions;
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Validated task definitions keyed by task name
pub type TaskMap = BTreeMap<String, TaskDefinition>;

/// Produces replacement content for a matched file
#[async_trait]
pub trait Transform: Send + Sync + fmt::Debug {
    /// Stable description of what this transform does.
    ///
    /// It is part of every cache key, so two transforms producing different
    /// output must not share an identity.
    fn identity(&self) -> String;

    /// Transform `content` read from `source` on its way to `destination`
    async fn transform(
        &self,
        content: Vec<u8>,
        source: &Path,
        destination: &Path,
        options: &RunOptions,
        task: &TaskDefinition,
    ) -> anyhow::Result<Vec<u8>>;
}

/// Runs before or after a task's file processing
#[async_trait]
pub trait Hook: Send + Sync + fmt::Debug {
    async fn run(&self, options: &RunOptions, task: &TaskDefinition) -> anyhow::Result<()>;
}

/// A transform together with the test selecting the paths it applies to
#[derive(Debug, Clone)]
pub struct TransformRule {
    pub transform: Arc<dyn Transform>,
    pub test: Regex,
    /// Author-supplied tag mixed into cache keys
    pub version: Option<String>,
}

impl TransformRule {
    pub fn new(transform: Arc<dyn Transform>, test: Regex) -> Self {
        TransformRule {
            transform,
            test,
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Check whether a resolved source path goes through the transform
    pub fn applies_to(&self, source: &Path) -> bool {
        self.test.is_match(&source.to_string_lossy())
    }
}

/// Where transform results are cached
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheSetting {
    /// Transforms always run
    #[default]
    Disabled,
    /// The tool's default cache directory
    Default,
    /// An explicit directory
    Dir(PathBuf),
}

/// A validated task ready to run
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    /// Task name
    pub name: String,

    /// Glob patterns selecting source files
    pub from: Vec<String>,

    /// Destination directory
    pub to: PathBuf,

    /// Options forwarded to the glob resolver
    pub glob_options: GlobOptions,

    /// Cache location for transform results
    pub cache: CacheSetting,

    /// Requested concurrency cap
    pub concurrent: Option<usize>,

    /// Transform applied to matching files
    pub transform: Option<TransformRule>,

    /// Hook run before the files are collected
    pub before: Option<Arc<dyn Hook>>,

    /// Hook run after all files are processed
    pub after: Option<Arc<dyn Hook>>,
}

impl TaskDefinition {
    /// Create a plain copy task
    pub fn new(name: impl Into<String>, from: Vec<String>, to: impl Into<PathBuf>) -> Self {
        TaskDefinition {
            name: name.into(),
            from,
            to: to.into(),
            glob_options: GlobOptions::default(),
            cache: CacheSetting::Disabled,
            concurrent: None,
            transform: None,
            before: None,
            after: None,
        }
    }

    pub fn with_glob_options(mut self, glob_options: GlobOptions) -> Self {
        self.glob_options = glob_options;
        self
    }

    pub fn with_cache(mut self, cache: CacheSetting) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_concurrent(mut self, concurrent: usize) -> Self {
        self.concurrent = Some(concurrent);
        self
    }

    pub fn with_transform(mut self, rule: TransformRule) -> Self {
        self.transform = Some(rule);
        self
    }

    pub fn with_before(mut self, hook: Arc<dyn Hook>) -> Self {
        self.before = Some(hook);
        self
    }

    pub fn with_after(mut self, hook: Arc<dyn Hook>) -> Self {
        self.after = Some(hook);
        self
    }

    /// Check that the required fields are present
    pub fn validate(&self) -> ConfigResult<()> {
        if self.from.iter().all(|pattern| pattern.trim().is_empty()) {
            return Err(ConfigError::MissingField {
                task: self.name.clone(),
                field: "from",
            });
        }
        if self.to.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                task: self.name.clone(),
                field: "to",
            });
        }
        Ok(())
    }

    /// The concurrency requested by the author, if it is a positive number
    pub fn requested_concurrency(&self) -> Option<usize> {
        self.concurrent.filter(|n| *n > 0)
    }
}
