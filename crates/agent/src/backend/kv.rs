//! Key-value-store-backed virtual filesystem.
//!
//! Adapts any [`KeyValueStore`] (an append-only or overwrite-capable blob
//! store — sqlite, redis, an object store) into a [`Backend`] by treating
//! paths as keys. Grounded on the checkpoint module's identical
//! trait-over-storage pattern (`checkpoint::kv`), applied here to files
//! instead of run snapshots. Values are JSON-serialized [`FileData`] (§6.4:
//! "value under `[prefix, \"filesystem\"]` keyed by absolute path, storing
//! `FileData`"), not raw content, so `created_at`/`modified_at` survive a
//! round trip through the store.

use async_trait::async_trait;

use super::{
    apply_edit, format_cat_n, Backend, BackendError, EntryInfo, EntryKind, GlobOptions, GrepMatch,
    GrepOptions, LsOptions,
};
use crate::state::{now_iso8601, FileData};

/// Minimal blob-storage contract a `KvBackend` can be built on.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), BackendError>;
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, BackendError>;
}

pub struct KvBackend<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> KvBackend<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn normalize(path: &str) -> String {
        path.trim_start_matches('/').to_string()
    }

    async fn get_file(&self, key: &str) -> Result<Option<FileData>, BackendError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| BackendError::Other(format!("corrupt file record at {key}: {e}")))
    }

    async fn put_file(&self, key: &str, file: &FileData) -> Result<(), BackendError> {
        let raw = serde_json::to_string(file)
            .map_err(|e| BackendError::Other(format!("failed to serialize file record: {e}")))?;
        self.store.put(key, &raw).await
    }
}

#[async_trait]
impl<S: KeyValueStore> Backend for KvBackend<S> {
    async fn ls_info(
        &self,
        path: &str,
        opts: &LsOptions,
    ) -> Result<(Vec<EntryInfo>, bool), BackendError> {
        let prefix = Self::normalize(path);
        let keys = self.store.keys_with_prefix(&prefix).await?;
        let limit = if opts.limit == 0 { usize::MAX } else { opts.limit };
        let mut entries = Vec::new();
        for key in keys {
            if opts
                .ignore
                .iter()
                .any(|pat| glob::Pattern::new(pat).is_ok_and(|g| g.matches(&key)))
            {
                continue;
            }
            if entries.len() >= limit {
                return Ok((entries, true));
            }
            let Some(file) = self.get_file(&key).await? else {
                continue;
            };
            entries.push(EntryInfo {
                path: format!("/{key}"),
                kind: EntryKind::File,
                size: Some(file.joined().len() as u64),
                modified_at: file.modified_at,
            });
        }
        Ok((entries, false))
    }

    async fn read_raw(&self, path: &str) -> Result<String, BackendError> {
        self.get_file(&Self::normalize(path))
            .await?
            .map(|file| file.joined())
            .ok_or_else(|| BackendError::NotFound(path.to_string()))
    }

    async fn read(
        &self,
        path: &str,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<String, BackendError> {
        let contents = self.read_raw(path).await?;
        let offset = offset.unwrap_or(0);
        let limit = limit.unwrap_or(super::DEFAULT_READ_LIMIT);
        let windowed: String = contents
            .lines()
            .skip(offset)
            .take(limit)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(format_cat_n(&windowed, offset + 1))
    }

    async fn write(&self, path: &str, contents: &str) -> Result<(), BackendError> {
        let key = Self::normalize(path);
        if self.store.get(&key).await?.is_some() {
            return Err(BackendError::AlreadyExists(path.to_string()));
        }
        self.put_file(&key, &FileData::new(contents, now_iso8601()))
            .await
    }

    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> Result<usize, BackendError> {
        let key = Self::normalize(path);
        let current = self
            .get_file(&key)
            .await?
            .ok_or_else(|| BackendError::NotFound(path.to_string()))?;
        let (updated, count) = apply_edit(&current.joined(), old, new, replace_all)?;
        let file = FileData {
            content: updated.split('\n').map(str::to_string).collect(),
            created_at: current.created_at,
            modified_at: now_iso8601(),
        };
        self.put_file(&key, &file).await?;
        Ok(count)
    }

    async fn grep_raw(
        &self,
        pattern: &str,
        path: &str,
        opts: &GrepOptions,
    ) -> Result<Vec<GrepMatch>, BackendError> {
        let regex = regex::RegexBuilder::new(pattern)
            .case_insensitive(opts.case_insensitive)
            .build()
            .map_err(|e| BackendError::InvalidPath(format!("invalid regex: {e}")))?;
        let prefix = Self::normalize(path);
        let limit = if opts.limit == 0 { usize::MAX } else { opts.limit };
        let keys = self.store.keys_with_prefix(&prefix).await?;
        let mut matches = Vec::new();
        for key in keys {
            if let Some(glob_pat) = &opts.glob {
                if !glob::Pattern::new(glob_pat).is_ok_and(|g| g.matches(&key)) {
                    continue;
                }
            }
            let Some(file) = self.get_file(&key).await? else {
                continue;
            };
            for (i, line) in file.joined().lines().enumerate() {
                if regex.is_match(line) {
                    matches.push(GrepMatch {
                        path: format!("/{key}"),
                        line_number: (i + 1) as u64,
                        line: line.to_string(),
                    });
                    if matches.len() >= limit {
                        return Ok(matches);
                    }
                }
            }
        }
        Ok(matches)
    }

    async fn glob_info(
        &self,
        pattern: &str,
        path: &str,
        opts: &GlobOptions,
    ) -> Result<(Vec<String>, bool), BackendError> {
        let pat = glob::Pattern::new(pattern)
            .map_err(|e| BackendError::InvalidPath(format!("invalid glob pattern: {e}")))?;
        let prefix = Self::normalize(path);
        let limit = if opts.limit == 0 { usize::MAX } else { opts.limit };
        let keys = self.store.keys_with_prefix(&prefix).await?;
        let mut matched = Vec::new();
        for key in keys {
            if pat.matches(&key) {
                let Some(file) = self.get_file(&key).await? else {
                    continue;
                };
                matched.push((format!("/{key}"), file.modified_at));
            }
        }
        matched.sort_by(|a, b| b.1.cmp(&a.1));
        let truncated = matched.len() > limit;
        matched.truncate(limit);
        Ok((matched.into_iter().map(|(path, _)| path).collect(), truncated))
    }
}
