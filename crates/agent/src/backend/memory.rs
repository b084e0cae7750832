//! In-memory backend: a path -> `FileData` map guarded by a mutex.
//!
//! Per-instance state rather than a process-wide singleton, so independent
//! runs each get an isolated workspace.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{
    apply_edit, format_cat_n, Backend, BackendError, EntryInfo, EntryKind, GlobOptions, GrepMatch,
    GrepOptions, LsOptions,
};
use crate::state::{now_iso8601, FileData};

/// A filesystem entirely held in memory. Paths are opaque strings compared
/// lexically; no symlink or permission semantics apply. Each entry carries
/// the `created_at`/`modified_at` timestamps `FileData` is specified to hold.
#[derive(Default)]
pub struct MemoryBackend {
    files: Mutex<BTreeMap<String, FileData>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backend with initial file contents, for tests and fixtures.
    /// All seeded files share the same `created_at`/`modified_at` timestamp.
    pub fn with_files(files: impl IntoIterator<Item = (String, String)>) -> Self {
        let now = now_iso8601();
        Self {
            files: Mutex::new(
                files
                    .into_iter()
                    .map(|(path, contents)| (path, FileData::new(contents, now.clone())))
                    .collect(),
            ),
        }
    }

    fn normalize(path: &str) -> String {
        path.trim_start_matches('/').to_string()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn ls_info(
        &self,
        path: &str,
        opts: &LsOptions,
    ) -> Result<(Vec<EntryInfo>, bool), BackendError> {
        let prefix = Self::normalize(path);
        let files = self.files.lock().unwrap();
        let limit = if opts.limit == 0 { usize::MAX } else { opts.limit };
        let mut entries = Vec::new();
        for (p, file) in files.iter() {
            if !prefix.is_empty() && !p.starts_with(&prefix) {
                continue;
            }
            if opts
                .ignore
                .iter()
                .any(|pat| glob::Pattern::new(pat).is_ok_and(|g| g.matches(p)))
            {
                continue;
            }
            if entries.len() >= limit {
                return Ok((entries, true));
            }
            entries.push(EntryInfo {
                path: format!("/{p}"),
                kind: EntryKind::File,
                size: Some(file.joined().len() as u64),
                modified_at: file.modified_at.clone(),
            });
        }
        Ok((entries, false))
    }

    async fn read_raw(&self, path: &str) -> Result<String, BackendError> {
        let key = Self::normalize(path);
        let files = self.files.lock().unwrap();
        files
            .get(&key)
            .map(FileData::joined)
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
        let mut files = self.files.lock().unwrap();
        if files.contains_key(&key) {
            return Err(BackendError::AlreadyExists(path.to_string()));
        }
        files.insert(key, FileData::new(contents, now_iso8601()));
        Ok(())
    }

    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> Result<usize, BackendError> {
        let key = Self::normalize(path);
        let mut files = self.files.lock().unwrap();
        let current = files
            .get(&key)
            .ok_or_else(|| BackendError::NotFound(path.to_string()))?;
        let (updated, count) = apply_edit(&current.joined(), old, new, replace_all)?;
        let created_at = current.created_at.clone();
        files.insert(
            key,
            FileData {
                content: updated.split('\n').map(str::to_string).collect(),
                created_at,
                modified_at: now_iso8601(),
            },
        );
        Ok(count)
    }

    async fn grep_raw(
        &self,
        pattern: &str,
        path: &str,
        opts: &GrepOptions,
    ) -> Result<Vec<GrepMatch>, BackendError> {
        let regex = build_regex(pattern, opts.case_insensitive)?;
        let prefix = Self::normalize(path);
        let limit = if opts.limit == 0 { usize::MAX } else { opts.limit };
        let files = self.files.lock().unwrap();
        let mut matches = Vec::new();
        for (p, file) in files.iter() {
            if !prefix.is_empty() && !p.starts_with(&prefix) {
                continue;
            }
            if let Some(glob_pat) = &opts.glob {
                if !glob::Pattern::new(glob_pat).is_ok_and(|g| g.matches(p)) {
                    continue;
                }
            }
            for (i, line) in file.joined().lines().enumerate() {
                if regex.is_match(line) {
                    matches.push(GrepMatch {
                        path: format!("/{p}"),
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
        let files = self.files.lock().unwrap();
        let mut matched = Vec::new();
        for (p, file) in files.iter() {
            if !prefix.is_empty() && !p.starts_with(&prefix) {
                continue;
            }
            if pat.matches(p) {
                matched.push((format!("/{p}"), file.modified_at.clone()));
            }
        }
        matched.sort_by(|a, b| b.1.cmp(&a.1));
        let truncated = matched.len() > limit;
        matched.truncate(limit);
        Ok((matched.into_iter().map(|(path, _)| path).collect(), truncated))
    }
}

fn build_regex(pattern: &str, case_insensitive: bool) -> Result<regex::Regex, BackendError> {
    regex::RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| BackendError::InvalidPath(format!("invalid regex: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let backend = MemoryBackend::new();
        backend.write("/a.txt", "hello\nworld\n").await.unwrap();
        let out = backend.read("/a.txt", None, None).await.unwrap();
        assert!(out.contains("hello"));
        assert!(out.contains("world"));
    }

    #[tokio::test]
    async fn write_fails_if_exists() {
        let backend = MemoryBackend::new();
        backend.write("/a.txt", "one").await.unwrap();
        let err = backend.write("/a.txt", "two").await.unwrap_err();
        assert!(matches!(err, BackendError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn edit_missing_file_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.edit("/missing.txt", "a", "b", false).await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn grep_finds_matching_lines() {
        let backend = MemoryBackend::with_files([("a.txt".to_string(), "foo\nbar\nfoobar\n".to_string())]);
        let matches = backend
            .grep_raw("foo", "/", &GrepOptions::default())
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[tokio::test]
    async fn glob_matches_paths() {
        let backend = MemoryBackend::with_files([
            ("src/lib.rs".to_string(), String::new()),
            ("src/main.rs".to_string(), String::new()),
            ("README.md".to_string(), String::new()),
        ]);
        let (paths, truncated) = backend.glob_info("src/*.rs", "/", &GlobOptions::default()).await.unwrap();
        assert_eq!(paths.len(), 2);
        assert!(!truncated);
    }

    #[tokio::test]
    async fn ls_info_reports_modified_at() {
        let backend = MemoryBackend::new();
        backend.write("/a.txt", "hi").await.unwrap();
        let (entries, _) = backend.ls_info("/", &LsOptions::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].modified_at.is_empty());
    }

    #[tokio::test]
    async fn glob_sorts_by_modified_at_descending() {
        let backend = MemoryBackend::new();
        backend.write("/a.txt", "a").await.unwrap();
        backend.write("/b.txt", "b").await.unwrap();
        backend.edit("/a.txt", "a", "a2", false).await.unwrap();
        let (paths, _) = backend
            .glob_info("*.txt", "/", &GlobOptions::default())
            .await
            .unwrap();
        assert_eq!(paths[0], "/a.txt");
    }
}
