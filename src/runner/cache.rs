//! Content-addressable cache for transform results
//!
//! Keys are derived from the source bytes and a fingerprint of the task
//! configuration that shapes the transform output. The store itself is a
//! plain key/value blob store behind the [`CacheStore`] trait.

use crate::config::GlobOptions;
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{CacheSetting, TaskDefinition};
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Bumped whenever the key layout changes
const KEY_DOMAIN: &[u8] = b"copytask-cache-key-v1";

/// Directory inside a cache dir holding the blobs
const CONTENT_DIR: &str = "content-v1";

/// Deterministic digest identifying one transform result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `content` processed under `fingerprint`
    pub fn derive(content: &[u8], fingerprint: &TaskFingerprint) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_DOMAIN);
        hasher.update((fingerprint.0.len() as u64).to_le_bytes());
        hasher.update(fingerprint.0.as_bytes());
        hasher.update(content);
        CacheKey(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The part of a task's configuration that participates in cache keys
#[derive(Serialize)]
struct KeyMaterial<'a> {
    tool_version: &'static str,
    from: &'a [String],
    to: String,
    glob_options: &'a GlobOptions,
    transform: Option<String>,
    transform_test: Option<&'a str>,
    transform_version: Option<&'a str>,
}

/// Stable serialization of a task's key material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFingerprint(String);

impl TaskFingerprint {
    /// Fingerprint a task.
    ///
    /// Hooks, concurrency and the cache location do not change what a
    /// transform produces and are left out.
    pub fn of(task: &TaskDefinition) -> ExecutionResult<Self> {
        let rule = task.transform.as_ref();
        let material = KeyMaterial {
            tool_version: crate::VERSION,
            from: &task.from,
            to: task.to.to_string_lossy().into_owned(),
            glob_options: &task.glob_options,
            transform: rule.map(|r| r.transform.identity()),
            transform_test: rule.map(|r| r.test.as_str()),
            transform_version: rule.and_then(|r| r.version.as_deref()),
        };

        let serialized = serde_yaml::to_string(&material).map_err(|e| {
            ExecutionError::Runtime(format!(
                "failed to fingerprint task '{}': {}",
                task.name, e
            ))
        })?;
        Ok(TaskFingerprint(serialized))
    }
}

/// Key/value blob store holding cached transform results
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a blob; `None` is a cache miss
    async fn get(&self, dir: &Path, key: &CacheKey) -> io::Result<Option<Vec<u8>>>;

    /// Store a blob, replacing any previous entry for the key
    async fn put(&self, dir: &Path, key: &CacheKey, blob: &[u8]) -> io::Result<()>;
}

/// Blob store laid out on the local filesystem
#[derive(Debug, Default)]
pub struct FsCacheStore {
    counter: AtomicU64,
}

impl FsCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_path(dir: &Path, key: &CacheKey) -> PathBuf {
        let key = key.as_str();
        dir.join(CONTENT_DIR).join(&key[..2]).join(key)
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn get(&self, dir: &Path, key: &CacheKey) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(Self::entry_path(dir, key)).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put(&self, dir: &Path, key: &CacheKey, blob: &[u8]) -> io::Result<()> {
        let path = Self::entry_path(dir, key);
        let parent = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid cache path"))?;
        tokio::fs::create_dir_all(parent).await?;

        // Readers only ever see complete entries; the last rename wins
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        let temp = parent.join(format!("{}.{}.{}.tmp", key, std::process::id(), sequence));
        tokio::fs::write(&temp, blob).await?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
        Ok(())
    }
}

/// Resolve a task's cache setting to a directory; `None` disables caching
pub fn resolve_cache_dir(setting: &CacheSetting, working_dir: &Path) -> Option<PathBuf> {
    match setting {
        CacheSetting::Disabled => None,
        CacheSetting::Default => Some(default_cache_dir(working_dir)),
        CacheSetting::Dir(path) if path.is_absolute() => Some(path.clone()),
        CacheSetting::Dir(path) => Some(working_dir.join(path)),
    }
}

/// The tool's default cache directory
pub fn default_cache_dir(working_dir: &Path) -> PathBuf {
    directories::ProjectDirs::from("", "", "copytask")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| working_dir.join(".copytask-cache"))
}

/// Cache access for one task
#[derive(Clone)]
pub struct CacheClient {
    store: Arc<dyn CacheStore>,
    dir: PathBuf,
}

impl CacheClient {
    pub fn new(store: Arc<dyn CacheStore>, dir: PathBuf) -> Self {
        CacheClient { store, dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Look up a cached result.
    ///
    /// A store that fails to answer counts as a miss; the transform runs
    /// again and the entry gets rewritten.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        match self.store.get(&self.dir, key).await {
            Ok(Some(blob)) => {
                debug!(key = %key, "cache hit");
                Some(blob)
            }
            Ok(None) => {
                debug!(key = %key, "cache miss");
                None
            }
            Err(e) => {
                warn!(key = %key, dir = %self.dir.display(), error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Store a result under `key`
    pub async fn put(&self, key: &CacheKey, blob: &[u8]) -> io::Result<()> {
        self.store.put(&self.dir, key, blob).await
    }
}

impl fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheClient").field("dir", &self.dir).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{RunOptions, Transform, TransformRule};
    use regex::Regex;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct Named(&'static str);

    #[async_trait]
    impl Transform for Named {
        fn identity(&self) -> String {
            self.0.to_string()
        }

        async fn transform(
            &self,
            content: Vec<u8>,
            _source: &Path,
            _destination: &Path,
            _options: &RunOptions,
            _task: &TaskDefinition,
        ) -> anyhow::Result<Vec<u8>> {
            Ok(content)
        }
    }

    fn css_task(identity: &'static str) -> TaskDefinition {
        TaskDefinition::new("css", vec!["*.css".to_string()], "dist").with_transform(
            TransformRule::new(Arc::new(Named(identity)), Regex::new(r"\.css$").unwrap()),
        )
    }

    #[test]
    fn test_key_is_deterministic() {
        let fingerprint = TaskFingerprint::of(&css_task("upper")).unwrap();
        let a = CacheKey::derive(b"body {}", &fingerprint);
        let b = CacheKey::derive(b"body {}", &TaskFingerprint::of(&css_task("upper")).unwrap());
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_key_changes_with_content() {
        let fingerprint = TaskFingerprint::of(&css_task("upper")).unwrap();
        let a = CacheKey::derive(b"body {}", &fingerprint);
        let b = CacheKey::derive(b"body { }", &fingerprint);
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_changes_with_configuration() {
        let base = css_task("upper");
        let key = |task: &TaskDefinition| {
            CacheKey::derive(b"body {}", &TaskFingerprint::of(task).unwrap())
        };
        let original = key(&base);

        assert_ne!(original, key(&css_task("lower")));

        let mut moved = base.clone();
        moved.to = PathBuf::from("public");
        assert_ne!(original, key(&moved));

        let mut versioned = base.clone();
        if let Some(rule) = versioned.transform.as_mut() {
            rule.version = Some("2".to_string());
        }
        assert_ne!(original, key(&versioned));

        let mut dotted = base.clone();
        dotted.glob_options.dot = true;
        assert_ne!(original, key(&dotted));
    }

    #[test]
    fn test_key_ignores_concurrency_and_cache_location() {
        let base = css_task("upper");
        let tuned = base
            .clone()
            .with_concurrent(1)
            .with_cache(CacheSetting::Dir(PathBuf::from("elsewhere")));
        assert_eq!(
            TaskFingerprint::of(&base).unwrap(),
            TaskFingerprint::of(&tuned).unwrap()
        );
    }

    #[tokio::test]
    async fn test_fs_store_miss_then_hit() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsCacheStore::new();
        let key = CacheKey::derive(b"a", &TaskFingerprint::of(&css_task("upper")).unwrap());

        assert_eq!(store.get(temp_dir.path(), &key).await.unwrap(), None);
        store.put(temp_dir.path(), &key, b"A").await.unwrap();
        assert_eq!(
            store.get(temp_dir.path(), &key).await.unwrap(),
            Some(b"A".to_vec())
        );
    }

    #[tokio::test]
    async fn test_fs_store_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsCacheStore::new();
        let key = CacheKey::derive(b"a", &TaskFingerprint::of(&css_task("upper")).unwrap());

        store.put(temp_dir.path(), &key, b"first").await.unwrap();
        store.put(temp_dir.path(), &key, b"second").await.unwrap();
        assert_eq!(
            store.get(temp_dir.path(), &key).await.unwrap(),
            Some(b"second".to_vec())
        );
    }

    #[tokio::test]
    async fn test_client_treats_lookup_error_as_miss() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the cache directory should be
        let blocked = temp_dir.path().join("blocked");
        std::fs::write(&blocked, b"").unwrap();

        let client = CacheClient::new(Arc::new(FsCacheStore::new()), blocked);
        let key = CacheKey::derive(b"a", &TaskFingerprint::of(&css_task("upper")).unwrap());
        assert_eq!(client.get(&key).await, None);
        assert!(client.put(&key, b"A").await.is_err());
    }

    #[test]
    fn test_resolve_cache_dir() {
        let work = Path::new("/work");
        assert_eq!(resolve_cache_dir(&CacheSetting::Disabled, work), None);
        assert_eq!(
            resolve_cache_dir(&CacheSetting::Dir(PathBuf::from(".cache")), work),
            Some(PathBuf::from("/work/.cache"))
        );
        assert_eq!(
            resolve_cache_dir(&CacheSetting::Dir(PathBuf::from("/var/cache/ct")), work),
            Some(PathBuf::from("/var/cache/ct"))
        );
        assert!(resolve_cache_dir(&CacheSetting::Default, work).is_some());
    }
}
