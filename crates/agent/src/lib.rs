//! Core agent runtime: the loop orchestrator, virtual filesystem backends,
//! the fixed tool set, context-management policies, human-in-the-loop
//! approval, checkpointing, and subagent delegation described by this
//! lineage's agent runtime design.
//!
//! The terminal UI, the LLM provider client's transport, the web-search
//! vendor API, and packaging are all out of scope here (see
//! `agentcore-model` for the model client contract this crate drives, and
//! `agentcore-sandbox` for the OS-level capability confinement the local
//! execute provider applies as defense in depth).

pub mod agent;
pub mod approval;
pub mod backend;
pub mod checkpoint;
pub mod context_policy;
pub mod error;
pub mod events;
pub mod output;
pub mod prompts;
pub mod state;
pub mod subagent;
pub mod tools;

pub use agent::{Agent, AgentConfig, GenerateOptions, GenerateResult};
pub use error::AgentError;
pub use events::{Event, EventEnvelope};
pub use state::{FileData, RunState, Todo, TodoStatus};
