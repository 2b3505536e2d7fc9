//! Concurrency limiter for file jobs
//!
//! One limiter is created per task, so tasks never share a budget.

use std::future::Future;
use std::num::NonZeroUsize;
use std::thread;
use tokio::sync::Semaphore;

/// Bounds how many submitted jobs run at the same time
#[derive(Debug)]
pub struct Limiter {
    max_concurrent: usize,
    semaphore: Semaphore,
}

impl Limiter {
    /// Create a limiter; a zero capacity is raised to one
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Limiter {
            max_concurrent,
            semaphore: Semaphore::new(max_concurrent),
        }
    }

    /// Get the capacity
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of free slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run a deferred job once a slot is free.
    ///
    /// The job is not created until the slot is held, and the slot is
    /// released as soon as the job's future completes.
    pub async fn run<F, Fut, T>(&self, job: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        // The semaphore is private and never closed, so acquire cannot fail
        let _permit = self.semaphore.acquire().await.expect("limiter semaphore closed");
        job().await
    }
}

/// Number of hardware threads, at least one
pub fn available_parallelism() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Effective concurrency for a task.
///
/// One unit of parallelism is reserved for the host; the result is never
/// below one.
pub fn effective_concurrency(requested: Option<usize>) -> usize {
    effective_concurrency_with(requested, available_parallelism())
}

fn effective_concurrency_with(requested: Option<usize>, parallelism: usize) -> usize {
    let ceiling = parallelism.saturating_sub(1);
    let limit = match requested.filter(|n| *n > 0) {
        Some(n) => n.min(ceiling),
        None => ceiling,
    };
    limit.max(1)
}
