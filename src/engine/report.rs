// src/engine/report.rs

//! Completion/failure notification boundary.
//!
//! Definitions carry notification hints (recipients, success/failure
//! toggles); the engine surfaces events through a [`Notifier`] and leaves
//! actual delivery (mail, chat, dashboards) to the embedder. The bundled
//! [`LogNotifier`] writes structured tracing events.

use tracing::{info, warn};

use crate::graph::NotificationPolicy;

pub trait Notifier: Send + Sync {
    fn node_succeeded(&self, node: &str, policy: &NotificationPolicy);
    fn node_failed(&self, node: &str, cause: &str, policy: &NotificationPolicy);
    /// A trigger gate fired; `action_prompt` is the human-facing text
    /// explaining what firing it means.
    fn trigger_fired(&self, trigger: &str, action_prompt: &str);
}

/// Notifier that renders notifications as log events, honoring the
/// per-node toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn node_succeeded(&self, node: &str, policy: &NotificationPolicy) {
        if !policy.on_success || policy.recipients.is_empty() {
            return;
        }
        info!(
            node = %node,
            recipients = ?policy.recipients,
            "success notification"
        );
    }

    fn node_failed(&self, node: &str, cause: &str, policy: &NotificationPolicy) {
        if !policy.on_failure || policy.recipients.is_empty() {
            return;
        }
        warn!(
            node = %node,
            cause = %cause,
            recipients = ?policy.recipients,
            "failure notification"
        );
    }

    fn trigger_fired(&self, trigger: &str, action_prompt: &str) {
        info!(trigger = %trigger, prompt = %action_prompt, "trigger fired");
    }
}
