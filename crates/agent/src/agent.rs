//! The agent loop orchestrator (C8, §4.8): drives the model→tools→model
//! cycle, dispatches tool calls through approval gating, applies context
//! policies, checkpoints between steps, and emits the §6.3 event taxonomy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use agentcore_model::chat::{ChatMessage, ChatMessageBuilder, ChatProvider, ChatRole};
use agentcore_model::{FunctionCall, ToolCall};

use crate::approval::{ApprovalConfig, DENIED_RESULT};
use crate::backend::Backend;
use crate::checkpoint::{self, Checkpoint, Checkpointer};
use crate::context_policy::{patch_dangling_tool_call, EvictionPolicy, SummarizationPolicy};
use crate::error::AgentError;
use crate::events::{tool_call_event, Event};
use crate::output::{self, OutputSchema};
use crate::prompts::build_system_prompt;
use crate::state::RunState;
use crate::tools::{Tool, ToolRegistry, ToolRunContext};

/// Cooperative cancellation handle (§5's `abortSignal`). Checked between
/// steps and before each tool dispatch; never forcibly interrupts an
/// in-flight tool call.
#[derive(Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Construction-time configuration for an [`Agent`] (§6.5). Unlike the
/// source spec's single object-literal shape, the Rust surface is a
/// builder: required fields (`model`, `backend`) go to `new`, everything
/// else defaults per §6.5 and is overridden with `with_*`.
pub struct AgentConfig {
    pub model: Arc<dyn ChatProvider>,
    pub system_prompt: Option<String>,
    pub tools: Vec<Arc<dyn Tool>>,
    pub backend: Arc<dyn Backend>,
    pub max_steps: u32,
    pub approval: Arc<ApprovalConfig>,
    pub checkpointer: Option<Arc<dyn Checkpointer>>,
    pub eviction_limit: usize,
    pub summarization: Option<SummarizationPolicy>,
    pub output: Option<OutputSchema>,
    pub agent_id: String,
    pub has_sandbox: bool,
    pub has_subagents: bool,
}

impl AgentConfig {
    pub fn new(model: Arc<dyn ChatProvider>, backend: Arc<dyn Backend>) -> Self {
        Self {
            model,
            backend,
            system_prompt: None,
            tools: Vec::new(),
            max_steps: 100,
            approval: Arc::new(ApprovalConfig::new()),
            checkpointer: None,
            eviction_limit: 20_000,
            summarization: None,
            output: None,
            agent_id: uuid::Uuid::new_v4().to_string(),
            has_sandbox: false,
            has_subagents: false,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_approval(mut self, approval: Arc<ApprovalConfig>) -> Self {
        self.approval = approval;
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn with_eviction_limit(mut self, limit: usize) -> Self {
        self.eviction_limit = limit;
        self
    }

    pub fn with_summarization(mut self, policy: SummarizationPolicy) -> Self {
        self.summarization = Some(policy);
        self
    }

    pub fn with_output(mut self, output: OutputSchema) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_agent_id(mut self, id: impl Into<String>) -> Self {
        self.agent_id = id.into();
        self
    }

    pub fn with_sandbox_capability(mut self, enabled: bool) -> Self {
        self.has_sandbox = enabled;
        self
    }

    pub fn with_subagent_capability(mut self, enabled: bool) -> Self {
        self.has_subagents = enabled;
        self
    }
}

#[derive(Default)]
pub struct GenerateOptions {
    pub prompt: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_steps: Option<u32>,
    pub thread_id: Option<String>,
    pub abort_signal: Option<AbortSignal>,
}

impl GenerateOptions {
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort_signal = Some(signal);
        self
    }
}

/// The return value of [`Agent::generate`]: final text, the mutated run
/// state, the structured output if one was configured, and the full
/// canonical message history (input messages plus everything the run
/// appended).
pub struct GenerateResult {
    pub text: String,
    pub state: RunState,
    pub output: Option<Value>,
    pub messages: Vec<ChatMessage>,
}

/// Drives one top-level run (or a bounded subagent run — see
/// `crate::subagent`) through the model→tools→model cycle described by
/// §4.8. An `Agent` is stateless between calls; all per-run state lives in
/// the `RunState` and message history threaded through `generate`.
pub struct Agent {
    config: AgentConfig,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Run to completion. See `streamWithEvents` at `stream_with_events`
    /// for incremental event delivery.
    pub async fn generate(&self, opts: GenerateOptions) -> Result<GenerateResult, AgentError> {
        let sink: Arc<dyn Fn(Event) + Send + Sync> = Arc::new(|_| {});
        self.run(opts, sink).await
    }

    /// Same contract as `generate`, but also returns the full, in-order
    /// event stream for the run. The loop itself is not incremental with
    /// respect to a live model token stream (§6.1's `ChatProvider` is a
    /// request/response call per step here, not a token source this crate
    /// drives concurrently with tool dispatch), so events are collected
    /// during the run and replayed as a finite, single-pass `Stream`
    /// immediately after — satisfying the event-stream contract without
    /// requiring cooperative interleaving machinery the rest of the crate
    /// doesn't otherwise need.
    pub async fn stream_with_events(
        &self,
        opts: GenerateOptions,
    ) -> Result<(GenerateResult, impl futures::Stream<Item = Event>), AgentError> {
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink_events = events.clone();
        let sink: Arc<dyn Fn(Event) + Send + Sync> =
            Arc::new(move |event| sink_events.lock().unwrap().push(event));
        let result = self.run(opts, sink).await?;
        let collected = Arc::try_unwrap(events)
            .map(|m| m.into_inner().unwrap())
            .unwrap_or_default();
        Ok((result, futures::stream::iter(collected)))
    }

    async fn run(
        &self,
        opts: GenerateOptions,
        emit: Arc<dyn Fn(Event) + Send + Sync>,
    ) -> Result<GenerateResult, AgentError> {
        let max_steps = opts.max_steps.unwrap_or(self.config.max_steps);
        let mut messages = Vec::new();
        let mut state = RunState::new();
        let mut next_checkpoint_step: u64 = 0;

        if let (Some(thread_id), Some(checkpointer)) =
            (&opts.thread_id, &self.config.checkpointer)
        {
            if let Some(checkpoint) = checkpoint::latest(checkpointer.as_ref(), thread_id).await?
            {
                emit(Event::CheckpointLoaded {
                    checkpoint_id: checkpoint.id.clone(),
                });
                next_checkpoint_step = checkpoint.id.parse::<u64>().map(|n| n + 1).unwrap_or(0);
                messages = checkpoint.messages;
                state = checkpoint.state;
            }
        }
        messages.extend(opts.messages);

        if let Some(prompt) = &opts.prompt {
            emit(Event::UserMessage {
                content: prompt.clone(),
            });
            messages.push(ChatMessage::user().content(prompt.clone()).build());
        }

        let mut registry = ToolRegistry::new();
        for tool in &self.config.tools {
            registry.add(tool.clone());
        }

        let system_prompt = build_system_prompt(
            self.config.has_sandbox,
            self.config.has_subagents,
            self.config.system_prompt.as_deref(),
        );

        let eviction = EvictionPolicy::new(self.config.eviction_limit);
        let shared_state = Arc::new(Mutex::new(state));
        let tool_ctx = ToolRunContext::new(
            self.config.agent_id.clone(),
            shared_state.clone(),
            self.config.backend.clone(),
            emit.clone(),
        );

        let mut step: u32 = 0;
        let mut final_text = String::new();
        let done_reason;

        loop {
            if opts
                .abort_signal
                .as_ref()
                .is_some_and(AbortSignal::is_aborted)
            {
                done_reason = "cancelled".to_string();
                break;
            }
            if step >= max_steps {
                done_reason = "max_steps".to_string();
                break;
            }

            if let Some(policy) = &self.config.summarization {
                if policy.should_summarize(&messages) {
                    messages = self.summarize(policy, messages).await?;
                }
            }

            emit(Event::StepStart { step });
            shared_state.lock().await.step = step;

            let tool_defs = registry.definitions();
            let response = self
                .config
                .model
                .chat_with_instructions(Some(&system_prompt), &messages, Some(tool_defs.as_slice()))
                .await?;

            let text = response.text().unwrap_or_default();
            let tool_calls = response.tool_calls().unwrap_or_default();
            if !text.is_empty() {
                emit(Event::Text {
                    content: text.clone(),
                });
                final_text = text.clone();
            }

            let assistant_message = if tool_calls.is_empty() {
                ChatMessage::assistant().content(text.clone()).build()
            } else {
                ChatMessageBuilder::new(ChatRole::Assistant)
                    .content(text.clone())
                    .tool_use(tool_calls.clone())
                    .build()
            };
            messages.push(assistant_message);

            if tool_calls.is_empty() {
                emit(Event::StepFinish { step });
                done_reason = "completed".to_string();
                break;
            }

            let mut tool_results = Vec::with_capacity(tool_calls.len());
            for call in &tool_calls {
                if opts
                    .abort_signal
                    .as_ref()
                    .is_some_and(AbortSignal::is_aborted)
                {
                    break;
                }
                emit(tool_call_event(call));
                let args: Value =
                    serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);

                let (result, is_error) = if self
                    .config
                    .approval
                    .requires_approval(&call.function.name, &args)
                {
                    emit(Event::ApprovalRequested {
                        tool_call_id: call.id.clone(),
                        tool_name: call.function.name.clone(),
                    });
                    let approved = self.config.approval.approve(&call.function.name, &args);
                    emit(Event::ApprovalResponse {
                        tool_call_id: call.id.clone(),
                        approved,
                    });
                    if approved {
                        self.dispatch(&registry, call, args, &tool_ctx).await
                    } else {
                        (DENIED_RESULT.to_string(), false)
                    }
                } else {
                    self.dispatch(&registry, call, args, &tool_ctx).await
                };

                let result = eviction
                    .maybe_evict(&tool_ctx, &call.function.name, &call.id, result)
                    .await;

                emit(Event::ToolResult {
                    tool_call_id: call.id.clone(),
                    name: call.function.name.clone(),
                    result: result.clone(),
                    is_error,
                });
                tool_results.push(ToolCall {
                    id: call.id.clone(),
                    call_type: "function".to_string(),
                    function: FunctionCall {
                        name: call.function.name.clone(),
                        arguments: result,
                    },
                });
            }
            messages.push(
                ChatMessageBuilder::new(ChatRole::User)
                    .tool_result(tool_results)
                    .build(),
            );

            emit(Event::StepFinish { step });

            if let Some(checkpointer) = &self.config.checkpointer {
                let snapshot_state = shared_state.lock().await.clone();
                let checkpoint = Checkpoint {
                    id: next_checkpoint_step.to_string(),
                    session_id: opts
                        .thread_id
                        .clone()
                        .unwrap_or_else(|| self.config.agent_id.clone()),
                    messages: messages.clone(),
                    state: snapshot_state,
                };
                checkpointer.save(&checkpoint).await?;
                emit(Event::CheckpointSaved {
                    checkpoint_id: checkpoint.id.clone(),
                });
                next_checkpoint_step += 1;
            }

            step += 1;
        }

        let final_state = shared_state.lock().await.clone();

        let parsed_output = match &self.config.output {
            None => None,
            Some(schema) => match output::extract_json(&final_text) {
                Some(value) => match output::validate(&schema.schema, &value) {
                    Ok(()) => Some(value),
                    Err(reason) => {
                        emit(Event::Error {
                            message: format!("structured output failed validation: {reason}"),
                        });
                        return Err(AgentError::SchemaValidationFailure(reason));
                    }
                },
                None => {
                    let reason = "no parseable JSON found in final output".to_string();
                    emit(Event::Error {
                        message: format!("structured output failed validation: {reason}"),
                    });
                    return Err(AgentError::SchemaValidationFailure(reason));
                }
            },
        };

        emit(Event::Done {
            reason: done_reason,
            text: final_text.clone(),
            state: serde_json::to_value(&final_state).unwrap_or(Value::Null),
            output: parsed_output.clone(),
        });

        Ok(GenerateResult {
            text: final_text,
            state: final_state,
            output: parsed_output,
            messages,
        })
    }

    async fn dispatch(
        &self,
        registry: &ToolRegistry,
        call: &ToolCall,
        args: Value,
        ctx: &ToolRunContext,
    ) -> (String, bool) {
        match registry.find(&call.function.name) {
            None => (format!("unknown tool: {}", call.function.name), true),
            Some(tool) => match tool.call(args, ctx).await {
                Ok(result) => (result, false),
                Err(err) => (err.to_string(), true),
            },
        }
    }

    /// One-shot model call that synthesizes a summary of `to_summarize`,
    /// replacing it with a single summary message ahead of `kept` (§4.4).
    /// Dangling tool calls left at the head of `kept` are patched with a
    /// synthetic "summarized" tool result so the transcript stays
    /// well-formed for the model.
    async fn summarize(
        &self,
        policy: &SummarizationPolicy,
        messages: Vec<ChatMessage>,
    ) -> Result<Vec<ChatMessage>, AgentError> {
        let (to_summarize, mut kept) = policy.split(&messages);
        if to_summarize.is_empty() {
            return Ok(messages);
        }

        let transcript = render_transcript(&to_summarize);
        let summary_prompt = format!(
            "Summarize the following conversation concisely, preserving facts, decisions, \
            and outstanding work:\n\n{transcript}"
        );
        let response = self
            .config
            .model
            .chat(&[ChatMessage::user().content(summary_prompt).build()])
            .await?;
        let summary = response.text().unwrap_or_default();

        if let Some(dangling) = leading_dangling_tool_call(&kept) {
            kept.insert(0, patch_dangling_tool_call(&dangling));
        }

        Ok(policy.apply_summary(summary, kept))
    }
}

fn render_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{:?}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// If `kept`'s first message is a `ToolUse` whose call has no matching
/// `ToolResult` immediately after it (because the result fell on the
/// summarized side of the cut), return that call so the caller can patch
/// it in.
fn leading_dangling_tool_call(kept: &[ChatMessage]) -> Option<ToolCall> {
    use agentcore_model::chat::MessageType;
    let first = kept.first()?;
    match &first.message_type {
        MessageType::ToolUse(calls) => calls.first().cloned(),
        _ => None,
    }
}
