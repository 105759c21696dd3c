#![allow(dead_code)]

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use forgedag::errors::Result;
use forgedag::task::{Task, TaskContext, TaskOutcome};

/// Shared execution recorder: step labels in the order they ran.
pub type ExecutionLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> ExecutionLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn log_entries(log: &ExecutionLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// One scripted step inside a [`ScriptedTask`].
#[derive(Debug, Clone)]
pub struct ScriptedStep {
    pub label: String,
    pub outcome: TaskOutcome,
    /// `(logical_name, bytes)` pairs staged before the outcome is returned.
    pub stages: Vec<(String, Vec<u8>)>,
}

/// A deterministic fake task for driving node execution in tests.
///
/// - records each executed step label into a shared [`ExecutionLog`]
/// - stages predetermined artifacts
/// - returns a predetermined outcome, stopping at the first failed step
///
/// When built with [`mergeable`](Self::mergeable), adjacent scripted tasks
/// merge by concatenating their step lists, which preserves the exact
/// sequence of side effects the unmerged tasks would have produced. Merged
/// tasks keep the first task's log handle, so tests should share one log
/// across all tasks of a node.
pub struct ScriptedTask {
    steps: Vec<ScriptedStep>,
    mergeable: bool,
    log: ExecutionLog,
}

impl ScriptedTask {
    pub fn succeeding(label: &str, log: &ExecutionLog) -> Self {
        Self {
            steps: vec![ScriptedStep {
                label: label.to_string(),
                outcome: TaskOutcome::Success,
                stages: Vec::new(),
            }],
            mergeable: false,
            log: Arc::clone(log),
        }
    }

    pub fn failing(label: &str, cause: &str, log: &ExecutionLog) -> Self {
        Self {
            steps: vec![ScriptedStep {
                label: label.to_string(),
                outcome: TaskOutcome::Failed(cause.to_string()),
                stages: Vec::new(),
            }],
            mergeable: false,
            log: Arc::clone(log),
        }
    }

    /// Stage bytes under a logical name before this task's outcome.
    pub fn with_stage(mut self, logical_name: &str, bytes: &[u8]) -> Self {
        if let Some(step) = self.steps.last_mut() {
            step.stages.push((logical_name.to_string(), bytes.to_vec()));
        }
        self
    }

    pub fn mergeable(mut self) -> Self {
        self.mergeable = true;
        self
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl Task for ScriptedTask {
    fn describe(&self) -> String {
        let labels: Vec<&str> = self.steps.iter().map(|s| s.label.as_str()).collect();
        format!("scripted[{}]", labels.join(","))
    }

    fn execute<'a>(
        &'a mut self,
        ctx: &'a mut TaskContext,
    ) -> Pin<Box<dyn Future<Output = Result<TaskOutcome>> + Send + 'a>> {
        Box::pin(async move {
            for step in &self.steps {
                self.log.lock().unwrap().push(step.label.clone());
                for (name, bytes) in &step.stages {
                    ctx.stage(name, bytes.clone());
                }
                if let TaskOutcome::Failed(cause) = &step.outcome {
                    return Ok(TaskOutcome::Failed(cause.clone()));
                }
            }
            Ok(TaskOutcome::Success)
        })
    }

    fn try_merge(&mut self, next: &dyn Task) -> bool {
        if !self.mergeable {
            return false;
        }
        let Some(other) = next.as_any().downcast_ref::<ScriptedTask>() else {
            return false;
        };
        if !other.mergeable {
            return false;
        }
        self.steps.extend(other.steps.iter().cloned());
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
