// src/task/command.rs

//! Shell command task.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::Result;

use super::{Task, TaskContext, TaskOutcome};

/// A task that runs one or more scripts through a shell interpreter.
///
/// Consecutive command tasks sharing the same interpreter merge into a
/// single task holding the concatenated script list. The merged task still
/// runs each script as its own process, in order, stopping at the first
/// failure, so merging cannot change the observable outcome.
pub struct CommandTask {
    shell: String,
    scripts: Vec<String>,
}

impl CommandTask {
    pub fn new(shell: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            scripts: vec![script.into()],
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    async fn run_script(&self, node: &str, script: &str) -> Result<TaskOutcome> {
        info!(node = %node, shell = %self.shell, script = %script, "running command");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(script);
            c
        } else {
            let mut c = Command::new(&self.shell);
            c.arg("-c").arg(script);
            c
        };

        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match cmd.output().await {
            Ok(out) => out,
            Err(err) => {
                return Ok(TaskOutcome::Failed(format!(
                    "failed to spawn '{}' for command '{}': {}",
                    self.shell, script, err
                )));
            }
        };

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(node = %node, "stdout: {}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(node = %node, "stderr: {}", line);
        }

        if output.status.success() {
            return Ok(TaskOutcome::Success);
        }

        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail = stderr.lines().next_back().unwrap_or("").trim();
        let cause = if tail.is_empty() {
            format!("command '{}' exited with code {}", script, code)
        } else {
            format!("command '{}' exited with code {}: {}", script, code, tail)
        };
        Ok(TaskOutcome::Failed(cause))
    }
}

impl Task for CommandTask {
    fn describe(&self) -> String {
        match self.scripts.as_slice() {
            [single] => format!("command: {}", single),
            scripts => format!("{} commands starting with: {}", scripts.len(), scripts[0]),
        }
    }

    fn execute<'a>(
        &'a mut self,
        ctx: &'a mut TaskContext,
    ) -> Pin<Box<dyn Future<Output = Result<TaskOutcome>> + Send + 'a>> {
        Box::pin(async move {
            for script in &self.scripts {
                match self.run_script(ctx.node(), script).await? {
                    TaskOutcome::Success => {}
                    failed => return Ok(failed),
                }
            }
            Ok(TaskOutcome::Success)
        })
    }

    fn try_merge(&mut self, next: &dyn Task) -> bool {
        let Some(other) = next.as_any().downcast_ref::<CommandTask>() else {
            return false;
        };
        if other.shell != self.shell {
            return false;
        }
        self.scripts.extend(other.scripts.iter().cloned());
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
