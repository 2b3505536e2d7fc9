//! Core configuration types
//!
//! This module defines the data structures that represent a copytask.yml configuration file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Interpreter used for transform and hook commands (e.g., ["sh", "-c"])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,

    /// Tasks defined in the configuration, keyed by name
    #[serde(default)]
    pub tasks: BTreeMap<String, Task>,
}

/// A task definition as written in the configuration file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Glob patterns selecting source files
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_patterns"
    )]
    pub from: Vec<String>,

    /// Destination directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<PathBuf>,

    /// Options forwarded to the glob resolver
    #[serde(rename = "glob-options", default)]
    pub glob_options: GlobOptions,

    /// Cache location for transform results
    #[serde(default)]
    pub cache: CacheConfig,

    /// Maximum number of files processed at once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrent: Option<usize>,

    /// Command producing replacement content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformConfig>,

    /// Regular expression selecting which source paths are transformed
    #[serde(
        rename = "transform-test",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transform_test: Option<String>,

    /// Command run before the files are collected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,

    /// Command run after all files are processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// Options for matching files
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GlobOptions {
    /// Base directory for matching and for source paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Whether wildcards match names starting with a dot
    #[serde(default)]
    pub dot: bool,

    /// Patterns excluded from the result
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,

    /// Whether only regular files are returned
    #[serde(rename = "only-files", default = "default_true")]
    pub only_files: bool,

    /// Whether matching is case sensitive
    #[serde(rename = "case-sensitive", default = "default_true")]
    pub case_sensitive: bool,
}

impl Default for GlobOptions {
    fn default() -> Self {
        GlobOptions {
            cwd: None,
            dot: false,
            ignore: Vec::new(),
            only_files: true,
            case_sensitive: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Cache setting: a flag for the default location, or an explicit path
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CacheConfig {
    Enabled(bool),
    Path(PathBuf),
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::Enabled(false)
    }
}

/// A transform command
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TransformConfig {
    /// Simple command string
    Simple(String),

    /// Command with a version tag
    Complex(TransformDetail),
}

/// Detailed transform specification
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransformDetail {
    /// The command to execute
    pub command: String,

    /// Tag mixed into cache keys; bump it to invalidate cached results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl TransformConfig {
    /// Get the command to execute
    pub fn command(&self) -> &str {
        match self {
            TransformConfig::Simple(cmd) => cmd,
            TransformConfig::Complex(detail) => &detail.command,
        }
    }

    /// Get the version tag
    pub fn version(&self) -> Option<&str> {
        match self {
            TransformConfig::Simple(_) => None,
            TransformConfig::Complex(detail) => detail.version.as_deref(),
        }
    }
}

/// Custom deserializer for patterns that handles both single values and arrays
fn deserialize_patterns<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(D::Error::custom("each pattern in from must be a string")),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("from must be a string or array")),
    }
}
