//! Configuration file parsing and discovery

use crate::config::types::Config;
use crate::error::{ConfigError, ConfigResult, CopyTaskError};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["copytask.yml", "copytask.yaml", ".copytaskrc"];

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    let current_dir = env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?;
    find_config_file_from(current_dir)
}

/// Find the configuration file in `start_dir` or the nearest ancestor
/// holding one of [`CONFIG_FILE_NAMES`]
pub fn find_config_file_from(start_dir: impl AsRef<Path>) -> ConfigResult<PathBuf> {
    let start_dir = start_dir.as_ref();

    start_dir
        .ancestors()
        .find_map(config_file_in)
        .ok_or_else(|| {
            ConfigError::NotFound(format!(
                "{} in '{}' and its parents",
                CONFIG_FILE_NAMES.join(", "),
                start_dir.display()
            ))
        })
}

/// The first config file name present in `dir`
fn config_file_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Config, CopyTaskError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConfigError::Invalid(format!("Failed to read '{}': {}", path.display(), e))
    })?;

    parse_config(&contents)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<Config, CopyTaskError> {
    // An empty file is an empty task list, not a YAML error
    if yaml.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_yaml::from_str(yaml)?;
    Ok(config)
}

/// Parse configuration with automatic file discovery
pub fn parse_config_auto() -> Result<(Config, PathBuf), CopyTaskError> {
    let config_path = find_config_file()?;
    let config = parse_config_file(&config_path)?;
    Ok((config, config_path))
}
