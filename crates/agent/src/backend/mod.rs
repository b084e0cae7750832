//! Virtual filesystem backend abstraction.
//!
//! Every filesystem-touching tool (`read_file`, `write_file`, `edit_file`,
//! `ls`, `glob`, `grep`) is built against this trait rather than `std::fs`
//! directly, so the same tool set runs unmodified against an in-memory
//! workspace, a real directory tree, a key-value store, or a router that
//! fans out across several of those by path prefix.

use async_trait::async_trait;
use thiserror::Error;

pub mod composite;
pub mod disk;
pub mod kv;
pub mod memory;
pub mod sandbox;

pub use composite::CompositeBackend;
pub use disk::DiskBackend;
pub use kv::{KeyValueStore, KvBackend};
pub use memory::MemoryBackend;
pub use sandbox::{ExecuteOptions, ExecuteResult, LocalSandboxBackend, SandboxBackend};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("is a directory: {0}")]
    IsDirectory(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("path already exists: {0}")]
    AlreadyExists(String),
    #[error("String not found: {0}")]
    NotFoundMatch(String),
    #[error("\"{old}\" appears {count} times, use replace_all")]
    Ambiguous { old: String, count: usize },
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub path: String,
    pub kind: EntryKind,
    pub size: Option<u64>,
    /// ISO-8601 (RFC 3339) last-modified timestamp, required by §4.1's
    /// `lsInfo` contract (`{path, is_dir, size, modified_at}`).
    pub modified_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct LsOptions {
    pub ignore: Vec<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepMatch {
    pub path: String,
    pub line_number: u64,
    pub line: String,
}

#[derive(Debug, Clone, Default)]
pub struct GrepOptions {
    pub glob: Option<String>,
    pub case_insensitive: bool,
    pub limit: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GlobOptions {
    pub limit: usize,
}

/// Literal reminder returned by `read()` for a zero-byte file (the
/// "empty-file reminder" of the glossary).
pub const EMPTY_FILE_NOTICE: &str = "System reminder: File exists but has empty contents";

/// Lines longer than this are split into `N.k` continuation rows.
pub const LONG_LINE_THRESHOLD: usize = 10_000;

/// Default `read()` line window when the caller doesn't pass a limit.
pub const DEFAULT_READ_LIMIT: usize = 2000;

/// Render file contents in the `cat -n` style mandated for `read_file`:
/// six-char right-aligned line numbers, a tab, then the line. Lines beyond
/// `LONG_LINE_THRESHOLD` chars are split into `N.k` continuation rows.
pub fn format_cat_n(contents: &str, start_line: usize) -> String {
    if contents.is_empty() {
        return EMPTY_FILE_NOTICE.to_string();
    }
    let mut out = String::new();
    for (i, line) in contents.lines().enumerate() {
        let n = start_line + i;
        let char_count = line.chars().count();
        if char_count > LONG_LINE_THRESHOLD {
            let chars: Vec<char> = line.chars().collect();
            for (k, chunk) in chars.chunks(LONG_LINE_THRESHOLD).enumerate() {
                let label = if k == 0 {
                    n.to_string()
                } else {
                    format!("{n}.{k}")
                };
                out.push_str(&format!("{:>6}\t{}\n", label, chunk.iter().collect::<String>()));
            }
        } else {
            out.push_str(&format!("{:>6}\t{}\n", n, line));
        }
    }
    out
}

/// Count non-overlapping occurrences of `needle` in `haystack`.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Apply an exact-string edit per the `edit_file` contract: zero matches is
/// `NotFoundMatch`, more than one match without `replace_all` is `Ambiguous`.
pub fn apply_edit(
    contents: &str,
    old: &str,
    new: &str,
    replace_all: bool,
) -> Result<(String, usize), BackendError> {
    let count = count_occurrences(contents, old);
    if count == 0 {
        return Err(BackendError::NotFoundMatch(old.to_string()));
    }
    if count > 1 && !replace_all {
        return Err(BackendError::Ambiguous {
            old: old.to_string(),
            count,
        });
    }
    if replace_all {
        Ok((contents.replace(old, new), count))
    } else {
        Ok((contents.replacen(old, new, 1), 1))
    }
}

/// Contract every virtual filesystem implementation satisfies: an in-memory
/// map, a real directory tree, a key-value store, or a router composed of
/// several of those by longest path-prefix match.
#[async_trait]
pub trait Backend: Send + Sync {
    /// List entries under `path`. Returns `(entries, truncated)`.
    async fn ls_info(
        &self,
        path: &str,
        opts: &LsOptions,
    ) -> Result<(Vec<EntryInfo>, bool), BackendError>;

    /// Return the file's raw bytes as a UTF-8 string, with no formatting.
    async fn read_raw(&self, path: &str) -> Result<String, BackendError>;

    /// Return the file formatted per [`format_cat_n`], windowed by
    /// `offset`/`limit` (both in lines, 0-based offset).
    async fn read(
        &self,
        path: &str,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<String, BackendError>;

    /// Create a new file. Fails with `AlreadyExists` if `path` exists.
    async fn write(&self, path: &str, contents: &str) -> Result<(), BackendError>;

    /// Exact-string replace within an existing file. See [`apply_edit`].
    /// Returns the number of occurrences replaced.
    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> Result<usize, BackendError>;

    /// Search file contents under `path` for `pattern` (a regex).
    async fn grep_raw(
        &self,
        pattern: &str,
        path: &str,
        opts: &GrepOptions,
    ) -> Result<Vec<GrepMatch>, BackendError>;

    /// Match file paths under `path` against a glob `pattern`. Returns
    /// `(paths, truncated)`.
    async fn glob_info(
        &self,
        pattern: &str,
        path: &str,
        opts: &GlobOptions,
    ) -> Result<(Vec<String>, bool), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cat_n_empty_file() {
        assert_eq!(format_cat_n("", 1), EMPTY_FILE_NOTICE);
    }

    #[test]
    fn cat_n_basic_width() {
        let out = format_cat_n("hello\nworld\n", 1);
        assert_eq!(out, "     1\thello\n     2\tworld\n");
    }

    #[test]
    fn cat_n_long_line_splits_with_continuation_markers() {
        let long_line = "x".repeat(10_050);
        let out = format_cat_n(&long_line, 5);
        assert!(out.contains("     5\t"));
        assert!(out.contains("   5.1\t"));
    }

    #[test]
    fn edit_not_found() {
        let err = apply_edit("abc", "zzz", "y", false).unwrap_err();
        assert!(matches!(err, BackendError::NotFoundMatch(_)));
    }

    #[test]
    fn edit_ambiguous_without_replace_all() {
        let err = apply_edit("foo\nfoo\n", "foo", "bar", false).unwrap_err();
        match err {
            BackendError::Ambiguous { count, .. } => assert_eq!(count, 2),
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn edit_replace_all() {
        let (out, n) = apply_edit("foo\nfoo\n", "foo", "bar", true).unwrap();
        assert_eq!(out, "bar\nbar\n");
        assert_eq!(n, 2);
    }

    #[test]
    fn edit_unique_match() {
        let (out, n) = apply_edit("foo\nbar\n", "foo", "baz", false).unwrap();
        assert_eq!(out, "baz\nbar\n");
        assert_eq!(n, 1);
    }
}
