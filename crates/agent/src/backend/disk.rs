//! On-disk backend rooted at a real directory tree.
//!
//! Uses `ignore::WalkBuilder` + `glob::Pattern` for listing/globbing and
//! `grep_regex`/`grep_searcher` for content search, all behind the `Backend`
//! trait so every tool goes through one seam regardless of which concrete
//! backend is mounted.

use async_trait::async_trait;
use glob::Pattern;
use grep_searcher::{sinks::Lossy, Searcher};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use super::{
    apply_edit, format_cat_n, Backend, BackendError, EntryInfo, EntryKind, GlobOptions, GrepMatch,
    GrepOptions, LsOptions,
};

pub struct DiskBackend {
    root: PathBuf,
}

impl DiskBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a virtual absolute path to a real path under `self.root`,
    /// rejecting any `..` component so a caller cannot escape the root
    /// (§4.1: "Path validation disallows escaping the root").
    fn resolve(&self, path: &str) -> Result<PathBuf, BackendError> {
        let trimmed = path.trim_start_matches('/');
        let mut relative = PathBuf::new();
        for component in Path::new(trimmed).components() {
            match component {
                std::path::Component::Normal(part) => relative.push(part),
                std::path::Component::CurDir => {}
                std::path::Component::ParentDir => {
                    return Err(BackendError::InvalidPath(format!(
                        "path escapes root: {path}"
                    )));
                }
                std::path::Component::RootDir | std::path::Component::Prefix(_) => {
                    return Err(BackendError::InvalidPath(format!("invalid path: {path}")));
                }
            }
        }
        let resolved = if relative.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(&relative)
        };
        if !resolved.starts_with(&self.root) {
            return Err(BackendError::InvalidPath(format!(
                "path escapes root: {path}"
            )));
        }
        Ok(resolved)
    }

    fn display_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) => format!("/{}", rel.display()),
            Err(_) => path.display().to_string(),
        }
    }

    fn io_err(path: &str, e: std::io::Error) -> BackendError {
        match e.kind() {
            std::io::ErrorKind::NotFound => BackendError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(path.to_string()),
            _ => BackendError::Other(e.to_string()),
        }
    }
}

/// Format a filesystem `SystemTime` as RFC 3339, the timestamp format
/// `EntryInfo::modified_at` is specified in (§4.1). Falls back to the Unix
/// epoch if the platform can't report an mtime.
fn format_mtime(time: std::io::Result<std::time::SystemTime>) -> String {
    time.ok()
        .and_then(|t| time::OffsetDateTime::from(t).format(&time::format_description::well_known::Rfc3339).ok())
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
}

#[async_trait]
impl Backend for DiskBackend {
    async fn ls_info(
        &self,
        path: &str,
        opts: &LsOptions,
    ) -> Result<(Vec<EntryInfo>, bool), BackendError> {
        let root = self.resolve(path)?;
        if !root.exists() {
            return Err(BackendError::NotFound(path.to_string()));
        }
        let ignore_pats: Vec<Pattern> = opts
            .ignore
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        let limit = if opts.limit == 0 { usize::MAX } else { opts.limit };
        let base = self.root.clone();

        let mut entries = Vec::new();
        let mut truncated = false;
        for result in WalkBuilder::new(&root).hidden(false).git_ignore(true).build() {
            let entry = result.map_err(|e| BackendError::Other(e.to_string()))?;
            let entry_path = entry.path();
            if let Ok(relative) = entry_path.strip_prefix(&root) {
                if ignore_pats.iter().any(|pat| pat.matches_path(relative)) {
                    continue;
                }
            }
            if entries.len() >= limit {
                truncated = true;
                break;
            }
            let metadata = entry.metadata().map_err(|e| BackendError::Other(e.to_string()))?;
            let kind = if metadata.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            let size = metadata.is_file().then_some(metadata.len());
            let display = match entry_path.strip_prefix(&base) {
                Ok(rel) => format!("/{}", rel.display()),
                Err(_) => entry_path.display().to_string(),
            };
            entries.push(EntryInfo {
                path: display,
                kind,
                size,
                modified_at: format_mtime(metadata.modified()),
            });
        }
        Ok((entries, truncated))
    }

    async fn read_raw(&self, path: &str) -> Result<String, BackendError> {
        let target = self.resolve(path)?;
        tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| Self::io_err(path, e))
    }

    async fn read(
        &self,
        path: &str,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<String, BackendError> {
        let target = self.resolve(path)?;
        if target.is_dir() {
            return Err(BackendError::IsDirectory(path.to_string()));
        }
        let contents = tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| Self::io_err(path, e))?;
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
        let target = self.resolve(path)?;
        if target.exists() {
            return Err(BackendError::AlreadyExists(path.to_string()));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_err(path, e))?;
        }
        tokio::fs::write(&target, contents)
            .await
            .map_err(|e| Self::io_err(path, e))
    }

    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> Result<usize, BackendError> {
        let target = self.resolve(path)?;
        let contents = tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| Self::io_err(path, e))?;
        let (updated, count) = apply_edit(&contents, old, new, replace_all)?;
        tokio::fs::write(&target, updated)
            .await
            .map_err(|e| Self::io_err(path, e))?;
        Ok(count)
    }

    async fn grep_raw(
        &self,
        pattern: &str,
        path: &str,
        opts: &GrepOptions,
    ) -> Result<Vec<GrepMatch>, BackendError> {
        let root = self.resolve(path)?;
        let pattern = pattern.to_string();
        let glob_filter = opts.glob.clone();
        let case_insensitive = opts.case_insensitive;
        let limit = if opts.limit == 0 { usize::MAX } else { opts.limit };
        let base = self.root.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<GrepMatch>, BackendError> {
            let matcher = grep_regex::RegexMatcherBuilder::new()
                .case_insensitive(case_insensitive)
                .build(&pattern)
                .map_err(|e| BackendError::InvalidPath(format!("invalid regex: {e}")))?;
            let glob_pat = glob_filter
                .as_deref()
                .map(Pattern::new)
                .transpose()
                .map_err(|e| BackendError::InvalidPath(format!("invalid glob: {e}")))?;

            let mut matches = Vec::new();
            for result in WalkBuilder::new(&root).hidden(false).git_ignore(true).build() {
                let entry = match result {
                    Ok(e) => e,
                    Err(_) => continue,
                };
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }
                let entry_path = entry.path();
                if let Some(ref g) = glob_pat {
                    if let Ok(rel) = entry_path.strip_prefix(&root) {
                        if !g.matches_path(rel) {
                            continue;
                        }
                    }
                }
                let display = match entry_path.strip_prefix(&base) {
                    Ok(rel) => format!("/{}", rel.display()),
                    Err(_) => entry_path.display().to_string(),
                };
                let mut local_matches = Vec::new();
                let _ = Searcher::new().search_path(
                    &matcher,
                    entry_path,
                    Lossy(|lnum, line| {
                        local_matches.push(GrepMatch {
                            path: display.clone(),
                            line_number: lnum,
                            line: line.trim_end().to_string(),
                        });
                        Ok(local_matches.len() + matches.len() < limit)
                    }),
                );
                matches.extend(local_matches);
                if matches.len() >= limit {
                    break;
                }
            }
            Ok(matches)
        })
        .await
        .map_err(|e| BackendError::Other(format!("grep task failed: {e}")))?
    }

    async fn glob_info(
        &self,
        pattern: &str,
        path: &str,
        opts: &GlobOptions,
    ) -> Result<(Vec<String>, bool), BackendError> {
        let root = self.resolve(path)?;
        let pattern = pattern.to_string();
        let limit = if opts.limit == 0 { usize::MAX } else { opts.limit };
        let base = self.root.clone();

        tokio::task::spawn_blocking(move || -> Result<(Vec<String>, bool), BackendError> {
            let glob_pattern = Pattern::new(&pattern)
                .map_err(|e| BackendError::InvalidPath(format!("invalid glob pattern: {e}")))?;
            let mut matches = Vec::new();
            let mut truncated = false;
            for result in WalkBuilder::new(&root)
                .hidden(false)
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .build()
            {
                let entry = result.map_err(|e| BackendError::Other(e.to_string()))?;
                let entry_path = entry.path();
                if entry_path.is_dir() {
                    continue;
                }
                if let Ok(relative) = entry_path.strip_prefix(&root) {
                    if glob_pattern.matches_path(relative) {
                        if matches.len() >= limit {
                            truncated = true;
                            break;
                        }
                        let display = match entry_path.strip_prefix(&base) {
                            Ok(rel) => format!("/{}", rel.display()),
                            Err(_) => entry_path.display().to_string(),
                        };
                        matches.push(display);
                    }
                }
            }
            matches.sort_by(|a, b| {
                let pa = base.join(a.trim_start_matches('/'));
                let pb = base.join(b.trim_start_matches('/'));
                let ta = std::fs::metadata(pa).and_then(|m| m.modified()).ok();
                let tb = std::fs::metadata(pb).and_then(|m| m.modified()).ok();
                tb.cmp(&ta)
            });
            Ok((matches, truncated))
        })
        .await
        .map_err(|e| BackendError::Other(format!("glob task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_fails_if_exists() {
        let dir = TempDir::new().unwrap();
        let backend = DiskBackend::new(dir.path());
        backend.write("/a.txt", "one").await.unwrap();
        let err = backend.write("/a.txt", "two").await.unwrap_err();
        assert!(matches!(err, BackendError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn read_formats_cat_n() {
        let dir = TempDir::new().unwrap();
        let backend = DiskBackend::new(dir.path());
        backend.write("/a.txt", "hello\nworld\n").await.unwrap();
        let out = backend.read("/a.txt", None, None).await.unwrap();
        assert!(out.starts_with("     1\thello"));
    }

    #[tokio::test]
    async fn read_raw_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let backend = DiskBackend::new(dir.path());
        let err = backend
            .read_raw("/../../etc/passwd")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn write_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let backend = DiskBackend::new(dir.path());
        let err = backend
            .write("/../escaped.txt", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn read_missing_file_not_found() {
        let dir = TempDir::new().unwrap();
        let backend = DiskBackend::new(dir.path());
        let err = backend.read_raw("/missing.txt").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn glob_matches_rust_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        let backend = DiskBackend::new(dir.path());
        let (paths, truncated) = backend
            .glob_info("*.rs", "/", &GlobOptions::default())
            .await
            .unwrap();
        assert_eq!(paths, vec!["/a.rs".to_string()]);
        assert!(!truncated);
    }

    #[tokio::test]
    async fn grep_finds_matches() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "foo\nbar\n").unwrap();
        let backend = DiskBackend::new(dir.path());
        let matches = backend
            .grep_raw("foo", "/", &GrepOptions::default())
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line_number, 1);
    }
}
