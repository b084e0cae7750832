//! Checkpointing: durable `(messages, state)` snapshots of a run.
//!
//! Snapshots are keyed by `(session_id, checkpoint_id)` and saved/loaded/
//! listed through one trait with three backends (in-memory, atomic-write
//! file, and a key-value store adapter), so a host can resume a run or
//! roll it back to any named point.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod file;
pub mod kv;
pub mod memory;

pub use file::FileCheckpointer;
pub use kv::KvCheckpointer;
pub use memory::MemoryCheckpointer;

use crate::state::RunState;
use agentcore_model::chat::ChatMessage;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A saved point-in-time snapshot of a run: its message history and state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub state: RunState,
}

#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;
    async fn load(&self, session_id: &str, id: &str) -> Result<Checkpoint, CheckpointError>;
    async fn list(&self, session_id: &str) -> Result<Vec<String>, CheckpointError>;
}

/// Load the most recent checkpoint for `session_id`, if any. Checkpoint ids
/// are the loop's zero-based step counter rendered as a decimal string, so
/// "most recent" is the numerically largest id `list` returns.
pub async fn latest(
    checkpointer: &dyn Checkpointer,
    session_id: &str,
) -> Result<Option<Checkpoint>, CheckpointError> {
    let ids = checkpointer.list(session_id).await?;
    let Some(latest_id) = ids.iter().max_by_key(|id| id.parse::<u64>().unwrap_or(0)) else {
        return Ok(None);
    };
    Ok(Some(checkpointer.load(session_id, latest_id).await?))
}

#[cfg(test)]
mod latest_tests {
    use super::*;
    use crate::state::RunState;

    #[tokio::test]
    async fn latest_picks_the_highest_numbered_checkpoint() {
        let cp = MemoryCheckpointer::new();
        for id in ["0", "1", "2"] {
            cp.save(&Checkpoint {
                id: id.to_string(),
                session_id: "s1".to_string(),
                messages: vec![],
                state: RunState::new(),
            })
            .await
            .unwrap();
        }
        let found = latest(&cp, "s1").await.unwrap().unwrap();
        assert_eq!(found.id, "2");
    }

    #[tokio::test]
    async fn latest_returns_none_for_unknown_session() {
        let cp = MemoryCheckpointer::new();
        assert!(latest(&cp, "missing").await.unwrap().is_none());
    }
}
