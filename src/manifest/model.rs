// src/manifest/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::exchange::ArtifactScope;
use crate::graph::{
    DefinitionKind, NodeDefinition, NotificationPolicy, OutputSpec, TaskSpec,
};

/// Top-level graph manifest as read from a TOML file.
///
/// ```toml
/// [defaults]
/// shell = "sh"
/// agent_class = "linux-builder"
///
/// [node.compile]
/// run = ["make -C src all"]
/// after = ["setup"]
/// outputs = { app = "build/app" }
///
/// [trigger.stage-approval]
/// description = "Promote the build to staging"
/// prompt = "Fire to release staging deployment"
/// after = ["compile"]
///
/// [aggregate.all-platforms]
/// needs = ["compile"]
/// ```
///
/// All sections are optional at the parse level; semantic checks live in
/// [`validate`](crate::manifest::validate).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawManifest {
    /// Fallbacks applied to nodes that do not override them.
    #[serde(default)]
    pub defaults: DefaultsSection,

    /// All task nodes from `[node.<name>]`, keyed by node name.
    #[serde(default)]
    pub node: BTreeMap<String, NodeSection>,

    /// All trigger gates from `[trigger.<name>]`.
    #[serde(default)]
    pub trigger: BTreeMap<String, TriggerSection>,

    /// All aggregates from `[aggregate.<name>]`.
    #[serde(default)]
    pub aggregate: BTreeMap<String, AggregateSection>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultsSection {
    /// Shell interpreter for `run` commands; `sh` when unset.
    #[serde(default)]
    pub shell: Option<String>,

    #[serde(default)]
    pub agent_class: Option<String>,

    #[serde(default)]
    pub timeout_minutes: Option<u32>,
}

/// `[node.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NodeSection {
    /// Shell commands run in order; consecutive commands with the same
    /// interpreter are merged before execution.
    #[serde(default)]
    pub run: Vec<String>,

    /// Nodes whose artifacts this node consumes.
    #[serde(default)]
    pub needs: Vec<String>,

    /// Nodes this one must run after, without consuming artifacts.
    #[serde(default)]
    pub after: Vec<String>,

    /// Declared output artifacts: logical name to produced file path.
    #[serde(default)]
    pub outputs: BTreeMap<String, PathBuf>,

    /// Publish artifacts to the shared exchange root instead of the
    /// agent-local one.
    #[serde(default)]
    pub shared: bool,

    #[serde(default)]
    pub shell: Option<String>,

    #[serde(default)]
    pub agent_class: Option<String>,
    #[serde(default)]
    pub agent_requirements: Option<String>,
    #[serde(default)]
    pub agent_sharing_group: Option<String>,
    #[serde(default)]
    pub frequency_shift: i32,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub timeout_minutes: Option<u32>,
    #[serde(default)]
    pub memory_mb: Option<u64>,

    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub test: bool,

    #[serde(default)]
    pub notify: NotifySection,
}

/// `[trigger.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TriggerSection {
    #[serde(default)]
    pub description: String,

    /// Human-facing text explaining what firing this gate means.
    #[serde(default)]
    pub prompt: String,

    #[serde(default)]
    pub after: Vec<String>,

    /// Re-validate every transitively gated node when this fires, not just
    /// direct dependents.
    #[serde(default)]
    pub recheck_gated: bool,

    #[serde(default)]
    pub notify: NotifySection,
}

/// `[aggregate.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateSection {
    pub needs: Vec<String>,

    #[serde(default)]
    pub notify: NotifySection,
}

/// `notify = { ... }` subsection shared by all node kinds.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifySection {
    #[serde(default)]
    pub recipients: Vec<String>,

    #[serde(default)]
    pub on_success: bool,

    #[serde(default = "default_true")]
    pub on_failure: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            recipients: Vec::new(),
            on_success: false,
            on_failure: true,
        }
    }
}

impl From<NotifySection> for NotificationPolicy {
    fn from(section: NotifySection) -> Self {
        Self {
            recipients: section.recipients,
            on_success: section.on_success,
            on_failure: section.on_failure,
        }
    }
}

const DEFAULT_SHELL: &str = "sh";

impl RawManifest {
    /// Lower the manifest into the flat definition list the resolver
    /// consumes, applying `[defaults]` fallbacks.
    pub fn into_definitions(self) -> Vec<NodeDefinition> {
        let defaults = self.defaults;
        let mut definitions = Vec::new();

        for (name, section) in self.node {
            let shell = section
                .shell
                .or_else(|| defaults.shell.clone())
                .unwrap_or_else(|| DEFAULT_SHELL.to_string());

            let tasks = section
                .run
                .iter()
                .map(|script| TaskSpec::Command {
                    shell: shell.clone(),
                    script: script.clone(),
                })
                .collect();
            let outputs = section
                .outputs
                .into_iter()
                .map(|(logical, path)| OutputSpec {
                    name: logical,
                    source: Some(path),
                })
                .collect();

            let mut def = NodeDefinition::new(name, DefinitionKind::Task { tasks, outputs });
            def.input_dependencies = section.needs;
            def.order_dependencies = section.after;
            def.agent_class = section.agent_class.or_else(|| defaults.agent_class.clone());
            def.agent_requirements = section.agent_requirements;
            def.agent_sharing_group = section.agent_sharing_group;
            def.frequency_shift = section.frequency_shift;
            def.priority = section.priority;
            def.timeout_minutes = section.timeout_minutes.or(defaults.timeout_minutes);
            def.memory_requirement_mb = section.memory_mb;
            def.artifact_scope = if section.shared {
                ArtifactScope::Shared
            } else {
                ArtifactScope::Local
            };
            def.notify = section.notify.into();
            def.is_sticky = section.sticky;
            def.is_test = section.test;
            definitions.push(def);
        }

        for (name, section) in self.trigger {
            let mut def = NodeDefinition::new(
                name,
                DefinitionKind::Trigger {
                    description: section.description,
                    action_prompt: section.prompt,
                    recursive_gate_check: section.recheck_gated,
                },
            );
            def.order_dependencies = section.after;
            def.notify = section.notify.into();
            definitions.push(def);
        }

        for (name, section) in self.aggregate {
            let mut def = NodeDefinition::new(name, DefinitionKind::Aggregate);
            def.input_dependencies = section.needs;
            def.notify = section.notify.into();
            definitions.push(def);
        }

        definitions
    }
}
