//! Task execution engine
//!
//! This module resolves a task's files, runs each file through a copy or a
//! cached transform under a per-task concurrency limit, and wraps the work
//! in the task's hooks.

pub mod cache;
pub mod command;
pub mod context;
pub mod definition;
pub mod file_job;
pub mod hooks;
pub mod limiter;
pub mod orchestrator;
pub mod reporter;
pub mod resolver;

// Re-export main types
pub use cache::*;
pub use command::*;
pub use context::*;
pub use definition::*;
pub use file_job::*;
pub use hooks::*;
pub use limiter::*;
pub use orchestrator::*;
pub use reporter::*;
pub use resolver::*;
