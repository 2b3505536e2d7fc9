//! Command execution
//!
//! Transforms and hooks declared in the configuration file are shell
//! commands. A transform command reads the source bytes on stdin and writes
//! the produced content to stdout; a hook command only reports its status.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{Hook, RunOptions, TaskDefinition, Transform};
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Interpreter used when the configuration does not name one
pub fn default_interpreter() -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string()]
}

/// Build the interpreter invocation for a command string
fn build_command(
    interpreter: &[String],
    command_str: &str,
    working_dir: &Path,
    envs: &[(&str, String)],
) -> ExecutionResult<Command> {
    let (program, args) = interpreter
        .split_first()
        .ok_or_else(|| ExecutionError::Runtime("interpreter must not be empty".to_string()))?;

    let mut command = Command::new(program);
    command.args(args);
    command.arg(command_str);
    command.current_dir(working_dir);
    command.kill_on_drop(true);

    for (key, value) in envs {
        command.env(key, value);
    }

    Ok(command)
}

/// Run a command with inherited output, failing on a non-zero exit
pub async fn execute_command(
    interpreter: &[String],
    command_str: &str,
    working_dir: &Path,
    envs: &[(&str, String)],
) -> ExecutionResult<()> {
    let mut command = build_command(interpreter, command_str, working_dir, envs)?;
    command.stdin(Stdio::null());
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::inherit());

    let status = command.status().await.map_err(|e| {
        ExecutionError::Runtime(format!("failed to start '{}': {}", command_str, e))
    })?;

    if !status.success() {
        return Err(ExecutionError::CommandFailed {
            code: status.code(),
            stderr: String::new(),
        });
    }

    Ok(())
}

/// Run a command feeding `input` on stdin and collecting stdout
pub async fn pipe_command(
    interpreter: &[String],
    command_str: &str,
    working_dir: &Path,
    envs: &[(&str, String)],
    input: Vec<u8>,
) -> ExecutionResult<Vec<u8>> {
    let mut command = build_command(interpreter, command_str, working_dir, envs)?;
    command.stdin(Stdio::piped());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|e| {
        ExecutionError::Runtime(format!("failed to start '{}': {}", command_str, e))
    })?;

    let stdin = child.stdin.take();
    let feed = async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(&input).await?;
            stdin.shutdown().await?;
        }
        Ok::<(), io::Error>(())
    };

    // Feed stdin while draining stdout so large inputs cannot deadlock
    let (fed, output) = tokio::join!(feed, child.wait_with_output());

    let output = output.map_err(|e| {
        ExecutionError::Runtime(format!("failed to wait for '{}': {}", command_str, e))
    })?;

    if !output.status.success() {
        return Err(ExecutionError::CommandFailed {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    // A command may exit successfully without reading all of its input
    match fed {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
            Err(ExecutionError::Runtime(format!(
                "failed to write input to '{}': {}",
                command_str, e
            )))
        }
        _ => Ok(output.stdout),
    }
}

fn verbose_flag(options: &RunOptions) -> String {
    let flag = if options.verbose { "true" } else { "false" };
    flag.to_string()
}

/// Transform backed by a shell command
#[derive(Debug, Clone)]
pub struct CommandTransform {
    pub command: String,
    pub interpreter: Vec<String>,
}

impl CommandTransform {
    pub fn new(command: impl Into<String>, interpreter: Vec<String>) -> Self {
        CommandTransform {
            command: command.into(),
            interpreter,
        }
    }
}

#[async_trait]
impl Transform for CommandTransform {
    fn identity(&self) -> String {
        format!("command:{}:{}", self.interpreter.join(" "), self.command)
    }

    async fn transform(
        &self,
        content: Vec<u8>,
        source: &Path,
        destination: &Path,
        options: &RunOptions,
        task: &TaskDefinition,
    ) -> anyhow::Result<Vec<u8>> {
        let envs = [
            ("COPYTASK_TASK", task.name.clone()),
            ("COPYTASK_SOURCE", source.display().to_string()),
            ("COPYTASK_DEST", destination.display().to_string()),
            ("COPYTASK_VERBOSE", verbose_flag(options)),
        ];

        let output = pipe_command(
            &self.interpreter,
            &self.command,
            &options.working_dir,
            &envs,
            content,
        )
        .await?;

        Ok(output)
    }
}

/// Hook backed by a shell command
#[derive(Debug, Clone)]
pub struct CommandHook {
    pub command: String,
    pub interpreter: Vec<String>,
}

impl CommandHook {
    pub fn new(command: impl Into<String>, interpreter: Vec<String>) -> Self {
        CommandHook {
            command: command.into(),
            interpreter,
        }
    }
}

#[async_trait]
impl Hook for CommandHook {
    async fn run(&self, options: &RunOptions, task: &TaskDefinition) -> anyhow::Result<()> {
        let envs = [
            ("COPYTASK_TASK", task.name.clone()),
            ("COPYTASK_TO", options.resolve(&task.to).display().to_string()),
            ("COPYTASK_VERBOSE", verbose_flag(options)),
        ];

        execute_command(&self.interpreter, &self.command, &options.working_dir, &envs).await?;
        Ok(())
    }
}
