//! copytask - named copy tasks with transforms and a content-addressable cache
//!
//! A task copies the files matched by its glob patterns into a destination
//! directory. Files selected by the task's transform test are passed
//! through a transform first, and transform results are cached by content
//! and task configuration.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;

// Re-export commonly used types
pub use error::{CopyTaskError, Result};

/// Current version of copytask
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
