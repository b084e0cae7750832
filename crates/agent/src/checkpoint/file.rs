//! File-backed checkpointer: one JSON file per `(session_id, checkpoint_id)`,
//! written atomically (write to a `.tmp` sibling, then rename) so a crash
//! mid-write never leaves a corrupt checkpoint on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{Checkpoint, CheckpointError, Checkpointer};

pub struct FileCheckpointer {
    root: PathBuf,
}

impl FileCheckpointer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    fn checkpoint_path(&self, session_id: &str, id: &str) -> PathBuf {
        self.session_dir(session_id).join(format!("{id}.json"))
    }
}

async fn write_atomic(path: &Path, contents: &str) -> Result<(), CheckpointError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|e| CheckpointError::Io(e.to_string()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| CheckpointError::Io(e.to_string()))
}

#[async_trait]
impl Checkpointer for FileCheckpointer {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let path = self.checkpoint_path(&checkpoint.session_id, &checkpoint.id);
        let json = serde_json::to_string(checkpoint)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        write_atomic(&path, &json).await
    }

    async fn load(&self, session_id: &str, id: &str) -> Result<Checkpoint, CheckpointError> {
        let path = self.checkpoint_path(session_id, id);
        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CheckpointError::NotFound(id.to_string())
            } else {
                CheckpointError::Io(e.to_string())
            }
        })?;
        serde_json::from_str(&contents).map_err(|e| CheckpointError::Serialization(e.to_string()))
    }

    async fn list(&self, session_id: &str) -> Result<Vec<String>, CheckpointError> {
        let dir = self.session_dir(session_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| CheckpointError::Io(e.to_string()))?;
        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CheckpointError::Io(e.to_string()))?
        {
            if let Some(name) = entry.path().file_stem().and_then(|s| s.to_str()) {
                if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                    ids.push(name.to_string());
                }
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RunState;
    use tempfile::TempDir;

    #[tokio::test]
    async fn save_then_load_round_trips_byte_equivalent() {
        let dir = TempDir::new().unwrap();
        let cp = FileCheckpointer::new(dir.path());
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
    async fn no_tmp_file_left_behind_after_save() {
        let dir = TempDir::new().unwrap();
        let cp = FileCheckpointer::new(dir.path());
        cp.save(&Checkpoint {
            id: "c1".to_string(),
            session_id: "s1".to_string(),
            messages: vec![],
            state: RunState::new(),
        })
        .await
        .unwrap();
        assert!(!dir.path().join("s1/c1.json.tmp").exists());
        assert!(dir.path().join("s1/c1.json").exists());
    }

    #[tokio::test]
    async fn list_empty_session_returns_empty() {
        let dir = TempDir::new().unwrap();
        let cp = FileCheckpointer::new(dir.path());
        assert!(cp.list("missing").await.unwrap().is_empty());
    }
}
