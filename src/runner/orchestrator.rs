//! Task orchestration
//!
//! Runs requested tasks side by side. Each task goes through the same
//! pipeline: `before` hook, file collection, file jobs under the task's
//! limiter, `after` hook.

use crate::error::{ConfigError, ExecutionError, ExecutionResult, FileJobFailure, HookKind, Result};
use crate::runner::{
    effective_concurrency, glob_base, reporter_for, resolve, resolve_cache_dir, run_hook,
    CacheClient, CacheStore, FileJob, FileJobRunner, FileOutcome, FsCacheStore, Limiter,
    Reporter, RunOptions, TaskDefinition, TaskFingerprint, TaskMap,
};
use futures::future::{join_all, try_join_all};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

/// Summary of a completed task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Task name
    pub name: String,
    /// Files copied verbatim
    pub copied: usize,
    /// Files that went through the transform
    pub transformed: usize,
    /// Files served from the cache
    pub cache_hits: usize,
}

impl TaskReport {
    fn new(name: &str) -> Self {
        TaskReport {
            name: name.to_string(),
            ..TaskReport::default()
        }
    }

    /// Total number of files written
    pub fn files(&self) -> usize {
        self.copied + self.transformed + self.cache_hits
    }

    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Copied => self.copied += 1,
            FileOutcome::Transformed => self.transformed += 1,
            FileOutcome::CacheHit => self.cache_hits += 1,
        }
    }
}

/// Drives tasks for one invocation
pub struct Orchestrator {
    options: RunOptions,
    reporter: Arc<dyn Reporter>,
    store: Arc<dyn CacheStore>,
}

impl Orchestrator {
    /// Create an orchestrator reporting according to `options.verbose`
    pub fn new(options: RunOptions) -> Self {
        Orchestrator {
            reporter: reporter_for(options.verbose),
            options,
            store: Arc::new(FsCacheStore::new()),
        }
    }

    /// Report progress to a specific observer
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Keep transform results in a specific store
    pub fn with_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = store;
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run the named tasks.
    ///
    /// Every name is checked before any task starts. Tasks then run
    /// concurrently without a shared bound; the first task failure rejects
    /// the whole run. Files already written by sibling tasks stay in place.
    pub async fn run(&self, tasks: &TaskMap, names: &[String]) -> Result<Vec<TaskReport>> {
        if names.is_empty() {
            return Err(ConfigError::NoTasks.into());
        }

        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let task = tasks
                .get(name)
                .ok_or_else(|| ConfigError::TaskNotFound(name.clone()))?;
            task.validate()?;
            selected.push(task);
        }

        let reports = try_join_all(selected.into_iter().map(|task| {
            let span = info_span!("task", name = %task.name);
            self.run_task(task).instrument(span)
        }))
        .await?;

        Ok(reports)
    }

    /// Run one task's full pipeline
    pub async fn run_task(&self, task: &TaskDefinition) -> ExecutionResult<TaskReport> {
        let reporter = self.reporter.as_ref();
        reporter.on_info(&format!("Start '{}' task", task.name));

        if let Err(e) = run_hook(HookKind::Before, task, &self.options, reporter).await {
            reporter.on_fail(&e.to_string());
            return Err(e);
        }

        let files = self.collect_files(task).await?;
        let (report, failures) = self.process_files(task, files).await?;

        // The after hook sees every task that got as far as its files;
        // file failures take precedence over a failing hook
        let after = run_hook(HookKind::After, task, &self.options, reporter).await;

        if !failures.is_empty() {
            if let Err(e) = after {
                reporter.on_fail(&e.to_string());
            }
            let err = ExecutionError::TaskFailed {
                task: task.name.clone(),
                failures,
            };
            reporter.on_fail(&err.to_string());
            return Err(err);
        }

        if let Err(e) = after {
            reporter.on_fail(&e.to_string());
            return Err(e);
        }

        reporter.on_succeed(&format!("Task '{}' was completed", task.name));
        Ok(report)
    }

    /// Resolve the task's patterns once, before any file job starts
    async fn collect_files(&self, task: &TaskDefinition) -> ExecutionResult<Vec<PathBuf>> {
        self.reporter.on_start("Collect files");

        let patterns = task.from.clone();
        let glob_options = task.glob_options.clone();
        let base = glob_base(&task.glob_options, &self.options.working_dir);

        let resolved = tokio::task::spawn_blocking(move || resolve(&patterns, &glob_options, &base))
            .await
            .map_err(|e| ExecutionError::Runtime(format!("file collection aborted: {}", e)))
            .and_then(|result| result);

        match resolved {
            Ok(files) => {
                self.reporter.on_succeed("Files collected");
                Ok(files)
            }
            Err(e) => {
                self.reporter.on_fail(&e.to_string());
                Err(e)
            }
        }
    }

    /// Run every file job and collect outcomes; no failure stops siblings
    async fn process_files(
        &self,
        task: &TaskDefinition,
        files: Vec<PathBuf>,
    ) -> ExecutionResult<(TaskReport, Vec<FileJobFailure>)> {
        let cache = resolve_cache_dir(&task.cache, &self.options.working_dir)
            .map(|dir| CacheClient::new(self.store.clone(), dir));

        let fingerprint = match (&task.transform, &cache) {
            (Some(_), Some(_)) => Some(TaskFingerprint::of(task)?),
            _ => None,
        };

        let limiter = Limiter::new(effective_concurrency(task.requested_concurrency()));
        let base = glob_base(&task.glob_options, &self.options.working_dir);
        let destination = self.options.resolve(&task.to);

        debug!(
            task = %task.name,
            files = files.len(),
            max_concurrent = limiter.max_concurrent(),
            cache_dir = ?cache.as_ref().map(|c| c.dir().to_path_buf()),
            "processing files"
        );

        let runner = FileJobRunner {
            task,
            options: &self.options,
            reporter: self.reporter.as_ref(),
            cache: cache.as_ref(),
            fingerprint: fingerprint.as_ref(),
        };

        let results = join_all(files.into_iter().map(|relative| {
            let runner = &runner;
            let limiter = &limiter;
            let base = &base;
            let destination = &destination;
            async move {
                limiter
                    .run(|| async move {
                        let job = FileJob::new(relative, base, destination);
                        runner.run(&job).await
                    })
                    .await
            }
        }))
        .await;

        let mut report = TaskReport::new(&task.name);
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(outcome) => report.record(outcome),
                Err(failure) => failures.push(failure),
            }
        }

        Ok((report, failures))
    }
}
