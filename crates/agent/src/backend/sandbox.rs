//! A [`Backend`] backed by a real, possibly OS-sandboxed, process.
//!
//! `LocalSandboxBackend` realizes every `Backend` file operation by running
//! a small base64-encoded shell script through the same process it exposes
//! for the `execute` tool, so the virtual filesystem and the shell see
//! exactly the same working directory and confinement. Encoding each
//! script as base64 sidesteps quoting hazards from file contents containing
//! shell metacharacters.

use async_trait::async_trait;
use base64::Engine;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

use crate::backend::{
    Backend, BackendError, EntryInfo, EntryKind, GlobOptions, GrepMatch, GrepOptions, LsOptions,
    format_cat_n,
};

/// Outcome of a raw `execute()` call (distinct from a `Backend` file op).
#[derive(Debug, Clone)]
pub struct ExecuteResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub timeout: Option<Duration>,
    pub cwd: Option<String>,
}

/// A literal the `execute` tool surfaces verbatim when a command's wall
/// clock exceeds `ExecuteOptions::timeout`.
pub const TIMED_OUT_MESSAGE: &str = "timed out";

/// A [`Backend`] that is additionally able to run an arbitrary command.
/// Only present when the runtime is configured with a sandbox-backed
/// workspace — the `execute` tool requires `CapabilityRequirement::Sandbox`
/// and is absent otherwise.
#[async_trait]
pub trait SandboxBackend: Backend {
    /// Stable identifier for this sandbox instance (e.g. a worker/session id).
    fn id(&self) -> &str;

    async fn execute(&self, command: &str, opts: &ExecuteOptions) -> Result<ExecuteResult, BackendError>;

    /// Release any OS-level resources (worker process, socket, tempdir).
    /// Idempotent — calling it more than once is a no-op.
    async fn dispose(&self) -> Result<(), BackendError>;
}

fn b64(s: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(s)
}

/// A `LocalSandboxBackend` rooted at a real directory, optionally confined
/// by an OS-level [`agentcore_sandbox::SandboxPolicy`] applied by the
/// caller before the backend is constructed (capability confinement is a
/// property of the process, not of this struct, so it degrades gracefully
/// to "unsandboxed" on platforms nono has no backend for).
pub struct LocalSandboxBackend {
    id: String,
    root: PathBuf,
    sandboxed: bool,
    os_policy: Option<agentcore_sandbox::SandboxPolicy>,
}

impl LocalSandboxBackend {
    pub fn new(id: impl Into<String>, root: PathBuf, sandboxed: bool) -> Self {
        Self {
            id: id.into(),
            root,
            sandboxed,
            os_policy: None,
        }
    }

    /// Confine every spawned child process to `policy`'s capability set
    /// (Landlock on Linux, Seatbelt on macOS), applied in the forked child
    /// right before `exec` so only commands run through this backend are
    /// restricted, never the host agent process itself. Degrades to
    /// unsandboxed with a logged warning on platforms `nono` has no backend
    /// for, per `SandboxPolicy::apply`.
    pub fn with_os_policy(mut self, policy: agentcore_sandbox::SandboxPolicy) -> Self {
        self.sandboxed = true;
        self.os_policy = Some(policy);
        self
    }

    /// Whether OS-level capability confinement is configured for this instance.
    pub fn is_sandboxed(&self) -> bool {
        self.sandboxed
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let trimmed = path.trim_start_matches('/');
        if trimmed.is_empty() {
            self.root.clone()
        } else {
            self.root.join(trimmed)
        }
    }

    /// Run `script` through a base64-encoded pipe to `sh`, so file contents
    /// containing shell metacharacters can't break out of the command line.
    async fn run_script(&self, script: &str) -> Result<ExecuteResult, BackendError> {
        self.run(
            &format!("echo {} | base64 -d | sh", b64(script)),
            &ExecuteOptions::default(),
        )
        .await
    }

    async fn run(&self, command: &str, opts: &ExecuteOptions) -> Result<ExecuteResult, BackendError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-lc").arg(command);
        cmd.current_dir(opts.cwd.as_ref().map(PathBuf::from).unwrap_or_else(|| self.root.clone()));
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        #[cfg(unix)]
        if let Some(policy) = self.os_policy.clone() {
            use std::os::unix::process::CommandExt;
            // Safety: `apply()` only calls into the Landlock/Seatbelt syscalls
            // nono wraps; it allocates nothing shared with the parent and
            // runs after fork, before exec, in the child only.
            unsafe {
                cmd.pre_exec(move || {
                    policy
                        .apply()
                        .map_err(|e| std::io::Error::other(e.to_string()))
                });
            }
        }

        let child = cmd
            .spawn()
            .map_err(|e| BackendError::Other(format!("spawn failed: {e}")))?;

        let wait = child.wait_with_output();
        let result = match opts.timeout {
            Some(d) => match tokio::time::timeout(d, wait).await {
                Ok(r) => r,
                Err(_) => {
                    return Ok(ExecuteResult {
                        stdout: String::new(),
                        stderr: String::new(),
                        exit_code: -1,
                        timed_out: true,
                    });
                }
            },
            None => wait.await,
        }
        .map_err(|e| BackendError::Other(format!("command failed: {e}")))?;

        Ok(ExecuteResult {
            stdout: String::from_utf8_lossy(&result.stdout).to_string(),
            stderr: String::from_utf8_lossy(&result.stderr).to_string(),
            exit_code: result.status.code().unwrap_or(-1),
            timed_out: false,
        })
    }
}

#[async_trait]
impl SandboxBackend for LocalSandboxBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn execute(&self, command: &str, opts: &ExecuteOptions) -> Result<ExecuteResult, BackendError> {
        self.run(command, opts).await
    }

    async fn dispose(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[async_trait]
impl Backend for LocalSandboxBackend {
    async fn ls_info(
        &self,
        path: &str,
        opts: &LsOptions,
    ) -> Result<(Vec<EntryInfo>, bool), BackendError> {
        let dir = self.resolve(path);
        let mut read_dir = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| map_io_err(e, path))?;
        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| BackendError::Other(e.to_string()))?
        {
            let file_name = entry.file_name().to_string_lossy().to_string();
            let rel = format!("{}/{}", path.trim_end_matches('/'), file_name);
            if opts.ignore.iter().any(|pat| {
                glob::Pattern::new(pat)
                    .map(|p| p.matches(&rel) || p.matches(&file_name))
                    .unwrap_or(false)
            }) {
                continue;
            }
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| BackendError::Other(e.to_string()))?;
            entries.push(EntryInfo {
                path: rel,
                kind: if metadata.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                size: if metadata.is_file() {
                    Some(metadata.len())
                } else {
                    None
                },
                modified_at: format_mtime(metadata.modified()),
            });
        }
        let truncated = entries.len() > opts.limit;
        entries.truncate(opts.limit);
        Ok((entries, truncated))
    }

    async fn read_raw(&self, path: &str) -> Result<String, BackendError> {
        tokio::fs::read_to_string(self.resolve(path))
            .await
            .map_err(|e| map_io_err(e, path))
    }

    async fn read(
        &self,
        path: &str,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<String, BackendError> {
        let contents = self.read_raw(path).await?;
        let offset = offset.unwrap_or(0);
        let limit = limit.unwrap_or(crate::backend::DEFAULT_READ_LIMIT);
        let windowed: String = contents
            .lines()
            .skip(offset)
            .take(limit)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(format_cat_n(&windowed, offset + 1))
    }

    async fn write(&self, path: &str, contents: &str) -> Result<(), BackendError> {
        let target = self.resolve(path);
        if target.exists() {
            return Err(BackendError::AlreadyExists(path.to_string()));
        }
        let rel = target
            .strip_prefix(&self.root)
            .unwrap_or(&target)
            .display()
            .to_string();
        let script = format!(
            "mkdir -p \"$(dirname '{rel}')\" && echo {} | base64 -d > '{rel}'",
            b64(contents)
        );
        let result = self.run_script(&script).await?;
        if result.exit_code != 0 {
            return Err(BackendError::Other(format!(
                "write failed: {}",
                result.stderr
            )));
        }
        Ok(())
    }

    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> Result<usize, BackendError> {
        let contents = self.read_raw(path).await?;
        let (updated, count) = crate::backend::apply_edit(&contents, old, new, replace_all)?;
        let target = self.resolve(path);
        let rel = target
            .strip_prefix(&self.root)
            .unwrap_or(&target)
            .display()
            .to_string();
        let script = format!("echo {} | base64 -d > '{rel}'", b64(&updated));
        let result = self.run_script(&script).await?;
        if result.exit_code != 0 {
            return Err(BackendError::Other(format!(
                "edit failed: {}",
                result.stderr
            )));
        }
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
            .map_err(|e| BackendError::Other(e.to_string()))?;
        let mut matches = Vec::new();
        let walker = ignore::WalkBuilder::new(self.resolve(path)).build();
        'outer: for entry in walker.flatten() {
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if let Some(glob_pat) = &opts.glob {
                let pat = glob::Pattern::new(glob_pat)
                    .map_err(|e| BackendError::Other(e.to_string()))?;
                if !pat.matches_path(entry.path()) {
                    continue;
                }
            }
            let Ok(contents) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .display()
                .to_string();
            for (i, line) in contents.lines().enumerate() {
                if regex.is_match(line) {
                    matches.push(GrepMatch {
                        path: format!("/{rel}"),
                        line_number: (i + 1) as u64,
                        line: line.to_string(),
                    });
                    if matches.len() >= opts.limit {
                        break 'outer;
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
        let pat = glob::Pattern::new(pattern).map_err(|e| BackendError::Other(e.to_string()))?;
        let root = self.resolve(path);
        let mut matched: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
        for entry in ignore::WalkBuilder::new(&root).build().flatten() {
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            if pat.matches_path(rel) {
                let modified = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                matched.push((entry.path().to_path_buf(), modified));
            }
        }
        matched.sort_by(|a, b| b.1.cmp(&a.1));
        let truncated = matched.len() > opts.limit;
        let paths = matched
            .into_iter()
            .take(opts.limit)
            .map(|(p, _)| format!("/{}", p.strip_prefix(&self.root).unwrap_or(&p).display()))
            .collect();
        Ok((paths, truncated))
    }
}

fn map_io_err(e: std::io::Error, path: &str) -> BackendError {
    match e.kind() {
        std::io::ErrorKind::NotFound => BackendError::NotFound(path.to_string()),
        std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(path.to_string()),
        _ => BackendError::Other(e.to_string()),
    }
}

/// Format a filesystem `SystemTime` as RFC 3339, the timestamp format
/// `EntryInfo::modified_at` is specified in (§4.1).
fn format_mtime(time: std::io::Result<std::time::SystemTime>) -> String {
    time.ok()
        .and_then(|t| {
            time::OffsetDateTime::from(t)
                .format(&time::format_description::well_known::Rfc3339)
                .ok()
        })
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_and_reads_back_through_real_fs() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalSandboxBackend::new("t1", dir.path().to_path_buf(), false);
        backend.write("/a.txt", "hello").await.unwrap();
        let content = backend.read_raw("/a.txt").await.unwrap();
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn execute_runs_a_real_command() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalSandboxBackend::new("t1", dir.path().to_path_buf(), false);
        let result = backend
            .execute("echo hello", &ExecuteOptions::default())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("hello"));
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn execute_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalSandboxBackend::new("t1", dir.path().to_path_buf(), false);
        let result = backend
            .execute(
                "sleep 5",
                &ExecuteOptions {
                    timeout: Some(Duration::from_millis(50)),
                    cwd: None,
                },
            )
            .await
            .unwrap();
        assert!(result.timed_out);
    }
}
