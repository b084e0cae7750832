//! Human-in-the-loop approval gating for tool calls.
//!
//! A per-tool rule decides whether a call needs interactive approval; a
//! single registered callback decides grant/deny. No callback means deny,
//! so a host that never wires one up fails closed rather than open.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-tool interrupt policy: always ask, never ask, or ask only when a
/// predicate over the call's arguments returns `true`.
pub enum InterruptRule {
    Always,
    Never,
    Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}

impl InterruptRule {
    fn should_interrupt(&self, args: &Value) -> bool {
        match self {
            InterruptRule::Always => true,
            InterruptRule::Never => false,
            InterruptRule::Predicate(f) => f(args),
        }
    }
}

/// A callback consulted when a tool call is intercepted: returns `true` to
/// approve, `false` to deny. Registered once per run.
pub type ApprovalCallback = Arc<dyn Fn(&str, &Value) -> bool + Send + Sync>;

/// Maps tool names to [`InterruptRule`]s and holds the single approval
/// callback consulted when a rule fires.
#[derive(Default)]
pub struct ApprovalConfig {
    rules: HashMap<String, InterruptRule>,
    callback: Option<ApprovalCallback>,
}

/// Literal result string returned to the model when an approval callback
/// denies a tool call.
pub const DENIED_RESULT: &str = "Tool call denied by user";

impl ApprovalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt_on(mut self, tool_name: impl Into<String>, rule: InterruptRule) -> Self {
        self.rules.insert(tool_name.into(), rule);
        self
    }

    pub fn with_callback(mut self, callback: ApprovalCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// `true` if this tool call must be intercepted before it runs.
    pub fn requires_approval(&self, tool_name: &str, args: &Value) -> bool {
        self.rules
            .get(tool_name)
            .is_some_and(|rule| rule.should_interrupt(args))
    }

    /// Consult the registered callback. No callback registered is treated as
    /// a deny: a tool gated for approval with nobody to ask must not run
    /// unattended.
    pub fn approve(&self, tool_name: &str, args: &Value) -> bool {
        match &self.callback {
            Some(cb) => cb(tool_name, args),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn always_rule_always_interrupts() {
        let config = ApprovalConfig::new().interrupt_on("write_file", InterruptRule::Always);
        assert!(config.requires_approval("write_file", &json!({})));
    }

    #[test]
    fn unlisted_tool_never_interrupts() {
        let config = ApprovalConfig::new();
        assert!(!config.requires_approval("read_file", &json!({})));
    }

    #[test]
    fn predicate_rule_inspects_arguments() {
        let config = ApprovalConfig::new().interrupt_on(
            "execute",
            InterruptRule::Predicate(Arc::new(|args| {
                args.get("command")
                    .and_then(Value::as_str)
                    .is_some_and(|c| c.contains("rm"))
            })),
        );
        assert!(config.requires_approval("execute", &json!({"command": "rm -rf /tmp/x"})));
        assert!(!config.requires_approval("execute", &json!({"command": "ls"})));
    }

    #[test]
    fn approve_denies_without_a_registered_callback() {
        let config = ApprovalConfig::new();
        assert!(!config.approve("write_file", &json!({})));
    }

    #[test]
    fn approve_consults_the_registered_callback() {
        let config = ApprovalConfig::new().with_callback(Arc::new(|_, _| true));
        assert!(config.approve("write_file", &json!({})));
    }
}
