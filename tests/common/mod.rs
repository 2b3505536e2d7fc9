//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use copytask::runner::{RunOptions, TaskDefinition, Transform};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Create a temporary directory with a copytask.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("copytask.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Write `files` (relative path, content) below `root`
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

/// Transform upper-casing its input and counting calls
#[derive(Debug, Default)]
pub struct Uppercase {
    pub calls: AtomicUsize,
}

impl Uppercase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transform for Uppercase {
    fn identity(&self) -> String {
        "uppercase".to_string()
    }

    async fn transform(
        &self,
        content: Vec<u8>,
        _source: &Path,
        _destination: &Path,
        _options: &RunOptions,
        _task: &TaskDefinition,
    ) -> anyhow::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(content.to_ascii_uppercase())
    }
}

/// Transform recording the peak number of calls in flight
#[derive(Debug, Default)]
pub struct Slow {
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

#[async_trait]
impl Transform for Slow {
    fn identity(&self) -> String {
        "slow".to_string()
    }

    async fn transform(
        &self,
        content: Vec<u8>,
        _source: &Path,
        _destination: &Path,
        _options: &RunOptions,
        _task: &TaskDefinition,
    ) -> anyhow::Result<Vec<u8>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(content)
    }
}

/// Transform failing on sources whose name contains `bad`
#[derive(Debug, Default)]
pub struct RejectBad;

#[async_trait]
impl Transform for RejectBad {
    fn identity(&self) -> String {
        "reject-bad".to_string()
    }

    async fn transform(
        &self,
        content: Vec<u8>,
        source: &Path,
        _destination: &Path,
        _options: &RunOptions,
        _task: &TaskDefinition,
    ) -> anyhow::Result<Vec<u8>> {
        if source.to_string_lossy().contains("bad") {
            anyhow::bail!("cannot transform {}", source.display());
        }
        Ok(content)
    }
}
