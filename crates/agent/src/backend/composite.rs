//! Longest-prefix router composing several backends into one.
//!
//! Each mounted backend owns a path prefix (e.g. `/workspace` -> disk,
//! `/large_tool_results` -> a kv store); operations are routed to whichever
//! mount has the longest matching prefix, falling back to a default mount
//! for unprefixed paths.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Backend, BackendError, EntryInfo, GlobOptions, GrepMatch, GrepOptions, LsOptions};

struct Mount {
    prefix: String,
    backend: Arc<dyn Backend>,
}

pub struct CompositeBackend {
    mounts: Vec<Mount>,
    default: Arc<dyn Backend>,
}

impl CompositeBackend {
    pub fn new(default: Arc<dyn Backend>) -> Self {
        Self {
            mounts: Vec::new(),
            default,
        }
    }

    /// Mount `backend` at `prefix`. Paths under `prefix` route there instead
    /// of the default mount; the router keeps mounts sorted so the longest
    /// prefix always wins regardless of registration order.
    pub fn mount(mut self, prefix: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        self.mounts.push(Mount {
            prefix: prefix.into(),
            backend,
        });
        self.mounts.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        self
    }

    fn resolve<'a>(&'a self, path: &str) -> (&'a dyn Backend, String) {
        for mount in &self.mounts {
            if let Some(rest) = path.strip_prefix(&mount.prefix) {
                let sub = if rest.is_empty() { "/".to_string() } else { rest.to_string() };
                return (mount.backend.as_ref(), sub);
            }
        }
        (self.default.as_ref(), path.to_string())
    }
}

#[async_trait]
impl Backend for CompositeBackend {
    async fn ls_info(
        &self,
        path: &str,
        opts: &LsOptions,
    ) -> Result<(Vec<EntryInfo>, bool), BackendError> {
        let (backend, sub) = self.resolve(path);
        backend.ls_info(&sub, opts).await
    }

    async fn read_raw(&self, path: &str) -> Result<String, BackendError> {
        let (backend, sub) = self.resolve(path);
        backend.read_raw(&sub).await
    }

    async fn read(
        &self,
        path: &str,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<String, BackendError> {
        let (backend, sub) = self.resolve(path);
        backend.read(&sub, offset, limit).await
    }

    async fn write(&self, path: &str, contents: &str) -> Result<(), BackendError> {
        let (backend, sub) = self.resolve(path);
        backend.write(&sub, contents).await
    }

    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> Result<usize, BackendError> {
        let (backend, sub) = self.resolve(path);
        backend.edit(&sub, old, new, replace_all).await
    }

    async fn grep_raw(
        &self,
        pattern: &str,
        path: &str,
        opts: &GrepOptions,
    ) -> Result<Vec<GrepMatch>, BackendError> {
        let (backend, sub) = self.resolve(path);
        backend.grep_raw(pattern, &sub, opts).await
    }

    async fn glob_info(
        &self,
        pattern: &str,
        path: &str,
        opts: &GlobOptions,
    ) -> Result<(Vec<String>, bool), BackendError> {
        let (backend, sub) = self.resolve(path);
        backend.glob_info(pattern, &sub, opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[tokio::test]
    async fn routes_to_longest_matching_prefix() {
        let root = Arc::new(MemoryBackend::new());
        let scratch = Arc::new(MemoryBackend::new());
        let composite = CompositeBackend::new(root.clone()).mount("/scratch", scratch.clone());

        composite.write("/scratch/note.txt", "hi").await.unwrap();
        composite.write("/root.txt", "bye").await.unwrap();

        assert!(scratch.read_raw("/note.txt").await.is_ok());
        assert!(root.read_raw("/root.txt").await.is_ok());
    }
}
