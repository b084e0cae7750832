//! Checkpointer adapter over the same [`KeyValueStore`] trait the filesystem
//! backend's `KvBackend` is built on, so a deployment that already has a
//! kv store wired up for files can reuse it for checkpoints.

use async_trait::async_trait;

use super::{Checkpoint, CheckpointError, Checkpointer};
use crate::backend::KeyValueStore;
use crate::backend::BackendError;

pub struct KvCheckpointer<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> KvCheckpointer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn key(session_id: &str, id: &str) -> String {
        format!("checkpoints/{session_id}/{id}.json")
    }
}

impl From<BackendError> for CheckpointError {
    fn from(e: BackendError) -> Self {
        CheckpointError::Io(e.to_string())
    }
}

#[async_trait]
impl<S: KeyValueStore> Checkpointer for KvCheckpointer<S> {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let key = Self::key(&checkpoint.session_id, &checkpoint.id);
        let json = serde_json::to_string(checkpoint)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        self.store.put(&key, &json).await?;
        Ok(())
    }

    async fn load(&self, session_id: &str, id: &str) -> Result<Checkpoint, CheckpointError> {
        let key = Self::key(session_id, id);
        let json = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| CheckpointError::NotFound(id.to_string()))?;
        serde_json::from_str(&json).map_err(|e| CheckpointError::Serialization(e.to_string()))
    }

    async fn list(&self, session_id: &str) -> Result<Vec<String>, CheckpointError> {
        let prefix = format!("checkpoints/{session_id}/");
        let keys = self.store.keys_with_prefix(&prefix).await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| {
                k.strip_prefix(&prefix)
                    .and_then(|rest| rest.strip_suffix(".json"))
                    .map(|s| s.to_string())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RunState;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct InMemoryStore(Mutex<BTreeMap<String, String>>);

    #[async_trait]
    impl KeyValueStore for InMemoryStore {
        async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
            Ok(self.0.lock().unwrap().get(key).cloned())
        }
        async fn put(&self, key: &str, value: &str) -> Result<(), BackendError> {
            self.0.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }
        async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let cp = KvCheckpointer::new(InMemoryStore(Mutex::new(BTreeMap::new())));
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
}
