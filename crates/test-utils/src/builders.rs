#![allow(dead_code)]

use forgedag::exchange::ArtifactScope;
use forgedag::graph::{
    DefinitionKind, NodeDefinition, NotificationPolicy, OutputSpec, TaskSpec,
};

/// Builder for [`NodeDefinition`] to simplify test setup.
///
/// Start from one of the kind constructors ([`task`](Self::task),
/// [`trigger`](Self::trigger), [`aggregate`](Self::aggregate)) and chain.
pub struct DefinitionBuilder {
    def: NodeDefinition,
}

impl DefinitionBuilder {
    pub fn task(name: &str) -> Self {
        Self {
            def: NodeDefinition::new(
                name,
                DefinitionKind::Task {
                    tasks: Vec::new(),
                    outputs: Vec::new(),
                },
            ),
        }
    }

    pub fn trigger(name: &str) -> Self {
        Self {
            def: NodeDefinition::new(
                name,
                DefinitionKind::Trigger {
                    description: format!("gate {name}"),
                    action_prompt: format!("fire '{name}' to release gated nodes"),
                    recursive_gate_check: false,
                },
            ),
        }
    }

    pub fn aggregate(name: &str) -> Self {
        Self {
            def: NodeDefinition::new(name, DefinitionKind::Aggregate),
        }
    }

    /// Add an input dependency (artifacts consumed).
    pub fn needs(mut self, dep: &str) -> Self {
        self.def.input_dependencies.push(dep.to_string());
        self
    }

    /// Add an ordering-only dependency.
    pub fn after(mut self, dep: &str) -> Self {
        self.def.order_dependencies.push(dep.to_string());
        self
    }

    /// Declare an output artifact staged by a task (no source file).
    pub fn output(mut self, logical_name: &str) -> Self {
        match &mut self.def.kind {
            DefinitionKind::Task { outputs, .. } => outputs.push(OutputSpec {
                name: logical_name.to_string(),
                source: None,
            }),
            _ => panic!("outputs can only be declared on task definitions"),
        }
        self
    }

    /// Declare an output artifact collected from a file after tasks succeed.
    pub fn output_file(mut self, logical_name: &str, path: &str) -> Self {
        match &mut self.def.kind {
            DefinitionKind::Task { outputs, .. } => outputs.push(OutputSpec {
                name: logical_name.to_string(),
                source: Some(path.into()),
            }),
            _ => panic!("outputs can only be declared on task definitions"),
        }
        self
    }

    /// Append a shell command task spec.
    pub fn command(mut self, shell: &str, script: &str) -> Self {
        match &mut self.def.kind {
            DefinitionKind::Task { tasks, .. } => tasks.push(TaskSpec::Command {
                shell: shell.to_string(),
                script: script.to_string(),
            }),
            _ => panic!("commands can only be declared on task definitions"),
        }
        self
    }

    /// Mark a trigger as re-validating all transitively gated nodes on
    /// firing.
    pub fn recursive_gate(mut self) -> Self {
        match &mut self.def.kind {
            DefinitionKind::Trigger {
                recursive_gate_check,
                ..
            } => *recursive_gate_check = true,
            _ => panic!("recursive_gate only applies to trigger definitions"),
        }
        self
    }

    pub fn shared(mut self) -> Self {
        self.def.artifact_scope = ArtifactScope::Shared;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.def.priority = priority;
        self
    }

    pub fn agent_class(mut self, class: &str) -> Self {
        self.def.agent_class = Some(class.to_string());
        self
    }

    pub fn sticky(mut self) -> Self {
        self.def.is_sticky = true;
        self
    }

    pub fn test_node(mut self) -> Self {
        self.def.is_test = true;
        self
    }

    pub fn notify(mut self, recipients: &[&str], on_success: bool, on_failure: bool) -> Self {
        self.def.notify = NotificationPolicy {
            recipients: recipients.iter().map(|s| s.to_string()).collect(),
            on_success,
            on_failure,
        };
        self
    }

    pub fn build(self) -> NodeDefinition {
        self.def
    }
}
