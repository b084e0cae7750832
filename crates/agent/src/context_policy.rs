//! Context-management policies: oversized tool-result eviction and
//! conversation-history summarization.
//!
//! Token accounting uses a `ceil(chars/4)` approximation shared by both
//! policies below, so eviction and summarization agree on what "too big"
//! means without depending on any particular model's tokenizer.

use agentcore_model::chat::{ChatMessage, ChatMessageBuilder, ChatRole, MessageType};
use agentcore_model::ToolCall;

use crate::tools::context::ToolRunContext;

/// `ceil(chars / 4)`, the shared token estimator for eviction and
/// summarization thresholds.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

fn message_tokens(message: &ChatMessage) -> usize {
    estimate_tokens(&message.content)
}

/// Threshold-triggered eviction of oversized tool results: a result whose
/// estimated token count exceeds `threshold` is persisted to the backend
/// under `/large_tool_results/<tool_name>_<tool_call_id>.txt` and replaced
/// in the conversation with a short pointer message.
pub struct EvictionPolicy {
    pub threshold: usize,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self { threshold: 20_000 }
    }
}

impl EvictionPolicy {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// If `result` exceeds the threshold, write it to the backend (mirroring
    /// it into `RunState.files` the same way `write_file` does, so
    /// `done.state.files["/large_tool_results/..."]` is observable) and
    /// return the pointer string that should replace it in-place; otherwise
    /// return `result` unchanged.
    pub async fn maybe_evict(
        &self,
        ctx: &ToolRunContext,
        tool_name: &str,
        tool_call_id: &str,
        result: String,
    ) -> String {
        if estimate_tokens(&result) <= self.threshold {
            return result;
        }
        let path = format!("/large_tool_results/{tool_name}_{tool_call_id}.txt");
        match ctx.backend().write(&path, &result).await {
            Ok(()) => {
                ctx.with_state(|state| state.record_write(&path, &result)).await;
                format!(
                    "[Tool result too large ({} tokens, threshold {}); persisted to {path}. Use read_file to inspect it.]",
                    estimate_tokens(&result),
                    self.threshold
                )
            }
            Err(_) => result,
        }
    }
}

/// Threshold-triggered summarization of the conversation history: once the
/// running total exceeds `threshold`, a one-shot model call replaces the
/// oldest messages with a summary, preserving message ordering and patching
/// any dangling tool call left without its matching tool result.
pub struct SummarizationPolicy {
    pub threshold: usize,
    pub keep_last: usize,
}

impl Default for SummarizationPolicy {
    fn default() -> Self {
        Self {
            threshold: 100_000,
            keep_last: 10,
        }
    }
}

impl SummarizationPolicy {
    pub fn total_tokens(&self, messages: &[ChatMessage]) -> usize {
        messages.iter().map(message_tokens).sum()
    }

    pub fn should_summarize(&self, messages: &[ChatMessage]) -> bool {
        self.total_tokens(messages) > self.threshold
    }

    /// Split `messages` into `(to_summarize, to_keep)`, adjusting the split
    /// point so a `ToolUse` is never separated from its `ToolResult`.
    pub fn split(&self, messages: &[ChatMessage]) -> (Vec<ChatMessage>, Vec<ChatMessage>) {
        let keep_from = messages.len().saturating_sub(self.keep_last);
        let mut split_at = keep_from;
        while split_at > 0 && message_is_tool_result(messages, split_at) {
            split_at -= 1;
        }
        let (head, tail) = messages.split_at(split_at);
        (head.to_vec(), tail.to_vec())
    }

    /// Replace the summarized prefix with a single summary message,
    /// reassembling the full message list.
    pub fn apply_summary(&self, summary: String, kept: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let mut out = vec![ChatMessageBuilder::new(ChatRole::Assistant)
            .content(format!("[Conversation summary]\n{summary}"))
            .build()];
        out.extend(kept);
        out
    }
}

/// `true` if `messages[index]` is a `ToolResult` message — splitting there
/// would orphan it from the `ToolUse` message that precedes it.
fn message_is_tool_result(messages: &[ChatMessage], index: usize) -> bool {
    messages
        .get(index)
        .map(|m| matches!(m.message_type, MessageType::ToolResult(_)))
        .unwrap_or(false)
}

/// Synthesize a placeholder tool result for a tool call left dangling by a
/// summarization cut, so the message list stays well-formed for the model.
pub fn patch_dangling_tool_call(call: &ToolCall) -> ChatMessage {
    ChatMessageBuilder::new(ChatRole::Assistant)
        .content("[result omitted by summarization]")
        .tool_result(vec![call.clone()])
        .build()
}

#[cfg(test)]
fn sample_call(id: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        call_type: "function".to_string(),
        function: agentcore_model::FunctionCall {
            name: "read_file".to_string(),
            arguments: "{}".to_string(),
        },
    }
}

#[cfg(test)]
fn test_ctx(backend: crate::backend::MemoryBackend) -> ToolRunContext {
    use crate::state::RunState;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    ToolRunContext::new(
        "s1",
        Arc::new(Mutex::new(RunState::new())),
        Arc::new(backend),
        Arc::new(|_| {}),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, MemoryBackend};

    #[test]
    fn estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[tokio::test]
    async fn eviction_leaves_small_results_untouched() {
        let ctx = test_ctx(MemoryBackend::new());
        let policy = EvictionPolicy::new(20_000);
        let out = policy
            .maybe_evict(&ctx, "read_file", "t1", "small".to_string())
            .await;
        assert_eq!(out, "small");
    }

    #[tokio::test]
    async fn eviction_persists_oversized_results_and_returns_pointer() {
        let ctx = test_ctx(MemoryBackend::new());
        let policy = EvictionPolicy::new(10);
        let big = "x".repeat(1000);
        let out = policy
            .maybe_evict(&ctx, "grep", "call-1", big.clone())
            .await;
        assert!(out.contains("/large_tool_results/grep_call-1.txt"));
        let persisted = ctx
            .backend()
            .read_raw("/large_tool_results/grep_call-1.txt")
            .await
            .unwrap();
        assert_eq!(persisted, big);

        let recorded = ctx
            .with_state(|state| state.files.get("/large_tool_results/grep_call-1.txt").cloned())
            .await
            .expect("eviction should record the persisted file in RunState");
        assert_eq!(recorded.joined(), big);
    }

    #[test]
    fn summarization_threshold_trips() {
        let policy = SummarizationPolicy {
            threshold: 1,
            keep_last: 1,
        };
        let messages = vec![ChatMessageBuilder::new(ChatRole::User)
            .content("hello there")
            .build()];
        assert!(policy.should_summarize(&messages));
    }

    #[test]
    fn patch_dangling_tool_call_produces_tool_result() {
        let call = sample_call("abc");
        let patched = patch_dangling_tool_call(&call);
        assert!(matches!(patched.message_type, MessageType::ToolResult(_)));
    }
}
