//! Processing of a single matched file
//!
//! A file either goes through the task's transform (with the cache in
//! front of it) or is copied verbatim.

use crate::error::{FileJobError, FileJobFailure};
use crate::runner::{
    CacheClient, CacheKey, Reporter, RunOptions, TaskDefinition, TaskFingerprint, TransformRule,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One matched file and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    /// Path relative to the glob base
    pub relative: PathBuf,
    /// Absolute source path
    pub source: PathBuf,
    /// Destination path
    pub destination: PathBuf,
}

impl FileJob {
    pub fn new(relative: PathBuf, base: &Path, destination_dir: &Path) -> Self {
        FileJob {
            source: base.join(&relative),
            destination: destination_dir.join(&relative),
            relative,
        }
    }

    fn fail(&self, error: FileJobError) -> FileJobFailure {
        FileJobFailure {
            source_path: self.source.clone(),
            destination: self.destination.clone(),
            error,
        }
    }
}

/// How a file job succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Bytes copied verbatim
    Copied,
    /// Transform ran and its output was written
    Transformed,
    /// Cached transform output was written
    CacheHit,
}

/// Runs file jobs for one task
pub struct FileJobRunner<'a> {
    pub task: &'a TaskDefinition,
    pub options: &'a RunOptions,
    pub reporter: &'a dyn Reporter,
    /// `None` when caching is disabled for the task
    pub cache: Option<&'a CacheClient>,
    /// Present whenever the task has a transform and caching is enabled
    pub fingerprint: Option<&'a TaskFingerprint>,
}

impl<'a> FileJobRunner<'a> {
    /// Process one file
    pub async fn run(&self, job: &FileJob) -> Result<FileOutcome, FileJobFailure> {
        self.reporter.on_info(&format!(
            "Copy file from '{}' to '{}'...",
            job.source.display(),
            job.destination.display()
        ));

        let result = match &self.task.transform {
            Some(rule) if rule.applies_to(&job.source) => self.transform_file(rule, job).await,
            _ => copy_file(&job.source, &job.destination)
                .await
                .map(|_| FileOutcome::Copied)
                .map_err(|e| job.fail(FileJobError::Copy(e))),
        };

        match &result {
            Ok(_) => self.reporter.on_succeed(&format!(
                "File from '{}' to '{}' was copied",
                job.source.display(),
                job.destination.display()
            )),
            Err(failure) => self.reporter.on_fail(&failure.to_string()),
        }

        result
    }

    async fn transform_file(
        &self,
        rule: &TransformRule,
        job: &FileJob,
    ) -> Result<FileOutcome, FileJobFailure> {
        let content = tokio::fs::read(&job.source)
            .await
            .map_err(|e| job.fail(FileJobError::Read(e)))?;

        let cache = match (self.cache, self.fingerprint) {
            (Some(cache), Some(fingerprint)) => {
                Some((cache, CacheKey::derive(&content, fingerprint)))
            }
            _ => None,
        };

        if let Some((cache, key)) = &cache {
            if let Some(cached) = cache.get(key).await {
                self.reporter.on_info(&format!(
                    "Found cache for file from '{}' to '{}'...",
                    job.source.display(),
                    job.destination.display()
                ));
                write_file(&job.destination, &cached)
                    .await
                    .map_err(|e| job.fail(FileJobError::Write(e)))?;
                return Ok(FileOutcome::CacheHit);
            }
        }

        self.reporter.on_info(&format!(
            "Use 'transform' for file from '{}' to '{}'...",
            job.source.display(),
            job.destination.display()
        ));

        let produced = rule
            .transform
            .transform(content, &job.source, &job.destination, self.options, self.task)
            .await
            .map_err(|e| job.fail(FileJobError::Transform(e)))?;

        if let Some((cache, key)) = &cache {
            self.reporter.on_info(&format!(
                "Put cache for file from '{}' to '{}'...",
                job.source.display(),
                job.destination.display()
            ));
            cache
                .put(key, &produced)
                .await
                .map_err(|e| job.fail(FileJobError::CacheStore(e)))?;
            debug!(key = %key, source = %job.source.display(), "stored transform result");
        }

        write_file(&job.destination, &produced)
            .await
            .map_err(|e| job.fail(FileJobError::Write(e)))?;

        Ok(FileOutcome::Transformed)
    }
}

async fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent).await,
        _ => Ok(()),
    }
}

/// Copy bytes verbatim, creating missing destination directories
pub async fn copy_file(source: &Path, destination: &Path) -> std::io::Result<()> {
    ensure_parent(destination).await?;
    tokio::fs::copy(source, destination).await?;
    Ok(())
}

/// Write bytes, creating missing destination directories
pub async fn write_file(destination: &Path, content: &[u8]) -> std::io::Result<()> {
    ensure_parent(destination).await?;
    tokio::fs::write(destination, content).await
}
