//! Subagent spawner (C7, §4.7): the `task` tool looks up a registered
//! descriptor and runs an independent, bounded [`crate::agent::Agent`]
//! sharing the parent's filesystem backend but none of its todos.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use agentcore_model::chat::{ChatProvider, FunctionTool, ParameterProperty, ParametersSchema, Tool as ChatTool};

use crate::agent::{Agent, AgentConfig, GenerateOptions};
use crate::approval::ApprovalConfig;
use crate::events::Event;
use crate::output::OutputSchema;
use crate::tools::{CapabilityRequirement, Tool, ToolError, ToolRunContext};

/// `task(description, subagent_type)`'s fixed step budget (§4.7): a
/// subagent never gets the parent's `max_steps`, regardless of config.
pub const SUBAGENT_MAX_STEPS: u32 = 50;

/// The built-in subagent every registry carries unless explicitly disabled
/// (`includeGeneralPurposeAgent` in §6.5).
pub const GENERAL_PURPOSE_SUBAGENT: &str = "general-purpose";

/// `{name, description, systemPrompt, tools?, model?, approval?, output?}`
/// from §3. A `None` for `tools`/`model`/`approval` means "inherit the
/// parent's" — resolved at dispatch time by [`TaskTool`], not at
/// registration time, so registering a subagent before the parent's tool
/// set is finalized is safe.
pub struct SubAgentDescriptor {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub tools: Option<Vec<Arc<dyn Tool>>>,
    pub model: Option<Arc<dyn ChatProvider>>,
    pub approval: Option<Arc<ApprovalConfig>>,
    pub output: Option<OutputSchema>,
}

impl SubAgentDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_prompt: system_prompt.into(),
            tools: None,
            model: None,
            approval: None,
            output: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn ChatProvider>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_approval(mut self, approval: Arc<ApprovalConfig>) -> Self {
        self.approval = Some(approval);
        self
    }

    pub fn with_output(mut self, output: OutputSchema) -> Self {
        self.output = Some(output);
        self
    }
}

/// Registry of subagent descriptors resolvable by `subagent_type`. Built
/// breadth-first by the host before the parent's tool set is constructed
/// (§9's design note): the registry holds descriptors, not live `Agent`s,
/// so a subagent's own `task` tool can resolve further subagents from the
/// same registry without creating a cycle at construction time.
#[derive(Default)]
pub struct SubAgentRegistry {
    agents: HashMap<String, SubAgentDescriptor>,
}

impl SubAgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, descriptor: SubAgentDescriptor) -> Self {
        self.agents.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Add the built-in `general-purpose` subagent, a plain worker with no
    /// narrowing system prompt beyond the base one and the parent's tools.
    pub fn with_general_purpose(self) -> Self {
        self.register(SubAgentDescriptor::new(
            GENERAL_PURPOSE_SUBAGENT,
            "General-purpose agent for researching complex questions, searching for files \
            and content, and executing multi-step tasks autonomously.",
            "You are a general-purpose subagent. Complete the delegated task thoroughly and \
            report back a clear, self-contained summary of what you found or did.",
        ))
    }

    pub fn get(&self, name: &str) -> Option<&SubAgentDescriptor> {
        self.agents.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }
}

#[derive(Debug, Deserialize)]
struct TaskInput {
    description: String,
    subagent_type: String,
}

/// The `task` tool (§4.3, §4.7): spawns a bounded nested agent run and
/// returns its result text, with any structured output JSON-appended, as
/// this call's own tool result.
pub struct TaskTool {
    registry: Arc<SubAgentRegistry>,
    default_model: Arc<dyn ChatProvider>,
    default_tools: Vec<Arc<dyn Tool>>,
    default_approval: Arc<ApprovalConfig>,
    has_sandbox: bool,
}

impl TaskTool {
    pub fn new(
        registry: Arc<SubAgentRegistry>,
        default_model: Arc<dyn ChatProvider>,
        default_tools: Vec<Arc<dyn Tool>>,
        default_approval: Arc<ApprovalConfig>,
        has_sandbox: bool,
    ) -> Self {
        Self {
            registry,
            default_model,
            default_tools,
            default_approval,
            has_sandbox,
        }
    }
}

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        "task"
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[]
    }

    fn definition(&self) -> ChatTool {
        let mut properties = HashMap::new();
        properties.insert(
            "description".to_string(),
            ParameterProperty {
                property_type: "string".to_string(),
                description: "The task for the subagent to perform, stated as a complete, \
                    self-contained instruction (the subagent does not see this conversation)."
                    .to_string(),
                items: None,
                enum_list: None,
            },
        );
        properties.insert(
            "subagent_type".to_string(),
            ParameterProperty {
                property_type: "string".to_string(),
                description: format!(
                    "Which registered subagent to delegate to. Available: {}",
                    self.registry.names().join(", ")
                ),
                items: None,
                enum_list: Some(self.registry.names()),
            },
        );
        ChatTool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name().to_string(),
                description: "Delegate a bounded, well-scoped piece of work to a subagent. The \
                    subagent shares your filesystem but starts with an empty todo list and a \
                    fresh 50-step budget, and only its final result is returned to you."
                    .to_string(),
                parameters: serde_json::to_value(ParametersSchema {
                    schema_type: "object".to_string(),
                    properties,
                    required: vec!["description".to_string(), "subagent_type".to_string()],
                })
                .unwrap_or(json!({})),
            },
        }
    }

    async fn call(&self, args: Value, ctx: &ToolRunContext) -> Result<String, ToolError> {
        let input: TaskInput = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidRequest(format!("invalid task arguments: {e}")))?;

        let descriptor = self.registry.get(&input.subagent_type).ok_or_else(|| {
            ToolError::InvalidRequest(format!(
                "unknown subagent_type `{}`; available: {}",
                input.subagent_type,
                self.registry.names().join(", ")
            ))
        })?;

        let task_id = uuid::Uuid::new_v4().to_string();
        ctx.emit(Event::SubagentStart {
            task_id: task_id.clone(),
            subagent_type: input.subagent_type.clone(),
            description: input.description.clone(),
        });

        let model = descriptor.model.clone().unwrap_or_else(|| self.default_model.clone());
        let tools = descriptor
            .tools
            .clone()
            .unwrap_or_else(|| self.default_tools.clone());
        let approval = descriptor
            .approval
            .clone()
            .unwrap_or_else(|| self.default_approval.clone());

        let has_subagents = tools.iter().any(|t| t.name() == "task");
        let config = AgentConfig::new(model, ctx.backend().clone())
            .with_system_prompt(descriptor.system_prompt.clone())
            .with_tools(tools)
            .with_max_steps(SUBAGENT_MAX_STEPS)
            .with_approval(approval)
            .with_sandbox_capability(self.has_sandbox)
            .with_subagent_capability(has_subagents)
            .with_agent_id(format!("{}:{}", ctx.session_id(), task_id));
        let config = match &descriptor.output {
            Some(output) => config.with_output(output.clone()),
            None => config,
        };

        let agent = Agent::new(config);
        let result = agent
            .generate(GenerateOptions::prompt(input.description))
            .await
            .map_err(anyhow::Error::from)?;

        let mut reported = result.text.clone();
        if let Some(output) = &result.output {
            reported.push_str(&format!(
                "\n\n[Structured Output]\n{}",
                serde_json::to_string_pretty(output).unwrap_or_default()
            ));
        }

        ctx.emit(Event::SubagentFinish {
            task_id,
            result: reported.clone(),
        });
        Ok(reported)
    }
}
