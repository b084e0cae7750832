use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Checkpoint, CheckpointError, Checkpointer};

#[derive(Default)]
pub struct MemoryCheckpointer {
    checkpoints: Mutex<HashMap<(String, String), Checkpoint>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        self.checkpoints.lock().unwrap().insert(
            (checkpoint.session_id.clone(), checkpoint.id.clone()),
            checkpoint.clone(),
        );
        Ok(())
    }

    async fn load(&self, session_id: &str, id: &str) -> Result<Checkpoint, CheckpointError> {
        self.checkpoints
            .lock()
            .unwrap()
            .get(&(session_id.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| CheckpointError::NotFound(id.to_string()))
    }

    async fn list(&self, session_id: &str) -> Result<Vec<String>, CheckpointError> {
        Ok(self
            .checkpoints
            .lock()
            .unwrap()
            .keys()
            .filter(|(sid, _)| sid == session_id)
            .map(|(_, id)| id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RunState;

    #[tokio::test]
    async fn save_then_load_round_trips_byte_equivalent() {
        let cp = MemoryCheckpointer::new();
        let checkpoint = Checkpoint {
            id: "c1".to_string(),
            session_id: "s1".to_string(),
            messages: vec![],
            state: RunState::new(),
        };
        cp.save(&checkpoint).await.unwrap();
        let loaded = cp.load("s1", "c1").await.unwrap();
        assert_eq!(
            serde_json::to_string(&loaded).unwrap(),
            serde_json::to_string(&checkpoint).unwrap()
        );
    }

    #[tokio::test]
    async fn load_missing_checkpoint_errors() {
        let cp = MemoryCheckpointer::new();
        let err = cp.load("s1", "missing").await.unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_filters_by_session() {
        let cp = MemoryCheckpointer::new();
        cp.save(&Checkpoint {
            id: "a".to_string(),
            session_id: "s1".to_string(),
            messages: vec![],
            state: RunState::new(),
        })
        .await
        .unwrap();
        cp.save(&Checkpoint {
            id: "b".to_string(),
            session_id: "s2".to_string(),
            messages: vec![],
            state: RunState::new(),
        })
        .await
        .unwrap();
        let ids = cp.list("s1").await.unwrap();
        assert_eq!(ids, vec!["a".to_string()]);
    }
}
