//! Glob resolution for task sources
//!
//! Turns a task's `from` patterns into the ordered list of matched paths,
//! relative to the glob base directory.

use crate::config::GlobOptions;
use crate::error::{ExecutionError, ExecutionResult};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Base directory for matching: `cwd` from the options, or `working_dir`
pub fn glob_base(options: &GlobOptions, working_dir: &Path) -> PathBuf {
    match &options.cwd {
        Some(cwd) if cwd.is_absolute() => cwd.clone(),
        Some(cwd) => working_dir.join(cwd),
        None => working_dir.to_path_buf(),
    }
}

/// Resolve patterns under `base`.
///
/// Patterns starting with `!` exclude matches, as do `options.ignore`.
/// Results are unique and ordered by pattern, then lexically.
pub fn resolve(
    patterns: &[String],
    options: &GlobOptions,
    base: &Path,
) -> ExecutionResult<Vec<PathBuf>> {
    let (negated, positive): (Vec<&String>, Vec<&String>) =
        patterns.iter().partition(|p| p.starts_with('!'));

    let excluded = build_exclusions(
        negated
            .iter()
            .map(|p| &p[1..])
            .chain(options.ignore.iter().map(String::as_str)),
        options,
    )?;

    let match_options = glob::MatchOptions {
        case_sensitive: options.case_sensitive,
        require_literal_separator: true,
        require_literal_leading_dot: !options.dot,
    };

    let escaped_base = glob::Pattern::escape(&base.to_string_lossy());
    let mut seen = HashSet::new();
    let mut matches = Vec::new();

    for pattern in positive {
        if Path::new(pattern.as_str()).is_absolute() {
            return Err(resolve_error(pattern, "absolute patterns are not supported"));
        }
        if leaves_base(Path::new(pattern.as_str())) {
            return Err(resolve_error(pattern, "patterns may not contain '..'"));
        }

        let full = format!("{}/{}", escaped_base.trim_end_matches('/'), pattern);
        let paths = glob::glob_with(&full, match_options)
            .map_err(|e| resolve_error(pattern, e))?;

        for entry in paths {
            let path = entry.map_err(|e| resolve_error(pattern, e))?;

            if options.only_files && !path.is_file() {
                continue;
            }

            let relative = path
                .strip_prefix(base)
                .map_err(|_| {
                    resolve_error(
                        pattern,
                        format!("'{}' is outside of '{}'", path.display(), base.display()),
                    )
                })?
                .to_path_buf();

            if leaves_base(&relative) {
                return Err(resolve_error(
                    pattern,
                    format!("'{}' is outside of '{}'", path.display(), base.display()),
                ));
            }

            if excluded.is_match(&relative) {
                continue;
            }

            if seen.insert(relative.clone()) {
                matches.push(relative);
            }
        }
    }

    Ok(matches)
}

/// `strip_prefix` keeps `..` components, so `<base>/../x` still passes it
fn leaves_base(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

fn build_exclusions<'a>(
    patterns: impl Iterator<Item = &'a str>,
    options: &GlobOptions,
) -> ExecutionResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(!options.case_sensitive)
            .literal_separator(true)
            .build()
            .map_err(|e| resolve_error(pattern, e))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| resolve_error("<ignore>", e))
}

fn resolve_error(pattern: &str, message: impl ToString) -> ExecutionError {
    ExecutionError::Resolve {
        pattern: pattern.to_string(),
        message: message.to_string(),
    }
}
