//! Configuration validation
//!
//! Checks every task in a loaded configuration and turns it into the
//! runtime definitions the orchestrator runs.

use crate::config::types::{CacheConfig, Config, Task};
use crate::error::{ConfigError, ConfigResult};
use crate::runner::{
    default_interpreter, CacheSetting, CommandHook, CommandTransform, Hook, TaskDefinition,
    TaskMap, TransformRule,
};
use regex::Regex;
use std::sync::Arc;

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    build_tasks(config).map(|_| ())
}

/// Validate every task and build its runtime definition
pub fn build_tasks(config: &Config) -> ConfigResult<TaskMap> {
    let interpreter = interpreter(config)?;

    config
        .tasks
        .iter()
        .map(|(name, task)| {
            let definition = build_task(name, task, &interpreter)?;
            Ok((name.clone(), definition))
        })
        .collect()
}

fn interpreter(config: &Config) -> ConfigResult<Vec<String>> {
    match &config.interpreter {
        Some(interpreter) if interpreter.is_empty() => Err(ConfigError::Invalid(
            "interpreter must name a program".to_string(),
        )),
        Some(interpreter) => Ok(interpreter.clone()),
        None => Ok(default_interpreter()),
    }
}

/// Validate a single task and build its runtime definition
pub fn build_task(name: &str, task: &Task, interpreter: &[String]) -> ConfigResult<TaskDefinition> {
    let missing = |field: &'static str| ConfigError::MissingField {
        task: name.to_string(),
        field,
    };

    if task.from.iter().all(|pattern| pattern.trim().is_empty()) {
        return Err(missing("from"));
    }

    let to = match &task.to {
        Some(to) if !to.as_os_str().is_empty() => to.clone(),
        _ => return Err(missing("to")),
    };

    let transform = match &task.transform {
        Some(transform) => {
            let test = task
                .transform_test
                .as_deref()
                .ok_or_else(|| missing("transform-test"))?;
            let test = Regex::new(test).map_err(|e| {
                ConfigError::Invalid(format!(
                    "Task '{}' has an invalid transform-test: {}",
                    name, e
                ))
            })?;

            let command = CommandTransform::new(transform.command(), interpreter.to_vec());
            let mut rule = TransformRule::new(Arc::new(command), test);
            if let Some(version) = transform.version() {
                rule = rule.with_version(version);
            }
            Some(rule)
        }
        None => None,
    };

    let hook = |command: &Option<String>| {
        command
            .as_ref()
            .map(|cmd| Arc::new(CommandHook::new(cmd.clone(), interpreter.to_vec())) as Arc<dyn Hook>)
    };

    Ok(TaskDefinition {
        name: name.to_string(),
        from: task.from.clone(),
        to,
        glob_options: task.glob_options.clone(),
        cache: cache_setting(&task.cache),
        concurrent: task.concurrent,
        transform,
        before: hook(&task.before),
        after: hook(&task.after),
    })
}

fn cache_setting(cache: &CacheConfig) -> CacheSetting {
    match cache {
        CacheConfig::Enabled(true) => CacheSetting::Default,
        CacheConfig::Enabled(false) => CacheSetting::Disabled,
        CacheConfig::Path(path) if path.as_os_str().is_empty() => CacheSetting::Disabled,
        CacheConfig::Path(path) => CacheSetting::Dir(path.clone()),
    }
}
