//! System-prompt fragments assembled per §4.8 step 3:
//! `BASE_PROMPT ⧺ TODO_PROMPT ⧺ FILESYSTEM_PROMPT ⧺ (EXECUTE_PROMPT if sandbox)
//! ⧺ (TASK_PROMPT if subagents) ⧺ user systemPrompt`.

pub const BASE_PROMPT: &str = "You are an autonomous coding and research agent. \
You work in discrete steps: think, optionally call one tool, observe its result, \
and continue until the task is done. Call tools one at a time and wait for each \
result before deciding the next step.";

pub const TODO_PROMPT: &str = "Use `write_todos` to plan and track multi-step work. \
Keep at most one todo `in_progress` at a time, and mark items `completed` as soon as \
they are done rather than batching updates.";

pub const FILESYSTEM_PROMPT: &str = "You have a virtual filesystem with `ls`, \
`read_file`, `write_file`, `edit_file`, `glob`, and `grep`. `write_file` fails if the \
path already exists — read the file and use `edit_file` to change it. `edit_file` \
requires `old_string` to be unique in the file, or pass `replace_all: true`.";

pub const EXECUTE_PROMPT: &str = "You can run shell commands with `execute` in the \
sandboxed workspace. Prefer the filesystem tools for reading and editing files over \
piping through the shell; use `execute` for builds, tests, and other commands.";

pub const TASK_PROMPT: &str = "You can delegate bounded, well-scoped pieces of work to \
a subagent with `task`. Subagents share your filesystem but keep their own todo list \
and return only their final result to you.";

/// Assemble the full system prompt for a run given which optional
/// capabilities are mounted, per §4.8 step 3's concatenation order.
pub fn build_system_prompt(has_sandbox: bool, has_subagents: bool, user_prompt: Option<&str>) -> String {
    let mut parts = vec![BASE_PROMPT, TODO_PROMPT, FILESYSTEM_PROMPT];
    if has_sandbox {
        parts.push(EXECUTE_PROMPT);
    }
    if has_subagents {
        parts.push(TASK_PROMPT);
    }
    let mut prompt = parts.join("\n\n");
    if let Some(user_prompt) = user_prompt {
        prompt.push_str("\n\n");
        prompt.push_str(user_prompt);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_optional_fragments_when_capabilities_absent() {
        let prompt = build_system_prompt(false, false, None);
        assert!(prompt.contains(BASE_PROMPT));
        assert!(!prompt.contains(EXECUTE_PROMPT));
        assert!(!prompt.contains(TASK_PROMPT));
    }

    #[test]
    fn appends_user_prompt_last() {
        let prompt = build_system_prompt(true, true, Some("Be terse."));
        assert!(prompt.ends_with("Be terse."));
        assert!(prompt.contains(EXECUTE_PROMPT));
        assert!(prompt.contains(TASK_PROMPT));
    }
}
