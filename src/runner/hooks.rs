//! Before/after hooks around a task's file processing

use crate::error::{ExecutionError, ExecutionResult, HookKind};
use crate::runner::{Reporter, RunOptions, TaskDefinition};

/// Run the task's hook of the given kind, if it has one
pub async fn run_hook(
    kind: HookKind,
    task: &TaskDefinition,
    options: &RunOptions,
    reporter: &dyn Reporter,
) -> ExecutionResult<()> {
    let hook = match kind {
        HookKind::Before => task.before.as_ref(),
        HookKind::After => task.after.as_ref(),
    };

    let Some(hook) = hook else {
        return Ok(());
    };

    reporter.on_info(&format!("Run '{}' hook", kind));

    hook.run(options, task)
        .await
        .map_err(|source| ExecutionError::Hook {
            task: task.name.clone(),
            kind,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{EventKind, Hook, RecordingReporter};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Hook for Counting {
        async fn run(&self, _options: &RunOptions, task: &TaskDefinition) -> anyhow::Result<()> {
            assert_eq!(task.name, "images");
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl Hook for Failing {
        async fn run(&self, _options: &RunOptions, _task: &TaskDefinition) -> anyhow::Result<()> {
            anyhow::bail!("database unavailable")
        }
    }

    fn task() -> TaskDefinition {
        TaskDefinition::new("images", vec!["*.png".to_string()], "dist")
    }

    #[tokio::test]
    async fn test_missing_hook_is_skipped() {
        let reporter = RecordingReporter::new();
        run_hook(HookKind::Before, &task(), &RunOptions::new(), &reporter)
            .await
            .unwrap();
        assert!(reporter.events().is_empty());
    }

    #[tokio::test]
    async fn test_hook_runs_with_task() {
        let counting = Arc::new(Counting::default());
        let task = task().with_after(counting.clone());
        let reporter = RecordingReporter::new();

        run_hook(HookKind::Before, &task, &RunOptions::new(), &reporter)
            .await
            .unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);

        run_hook(HookKind::After, &task, &RunOptions::new(), &reporter)
            .await
            .unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            reporter.messages(EventKind::Info),
            vec!["Run 'after' hook".to_string()]
        );
    }

    #[tokio::test]
    async fn test_hook_failure_names_task_and_kind() {
        let task = task().with_before(Arc::new(Failing));
        let result = run_hook(HookKind::Before, &task, &RunOptions::new(), &RecordingReporter::new()).await;

        match result {
            Err(ExecutionError::Hook { task, kind, source }) => {
                assert_eq!(task, "images");
                assert_eq!(kind, HookKind::Before);
                assert_eq!(source.to_string(), "database unavailable");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
