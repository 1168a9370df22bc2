//! Shared plumbing for dump/restore: external tool discovery, path validation, and process
//! execution.
//!
//! Tool arguments may carry connection details, so they are never logged; passwords go
//! through each tool's environment variable instead of argv.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::error::DbAccessError;

/// Maximum number of characters of tool output surfaced in an error.
pub const MAX_TOOL_OUTPUT: usize = 500;

/// A directory holding versioned installs, e.g. `/opt/homebrew/opt` with `postgresql@16`.
#[derive(Debug, Clone)]
pub struct VersionedRoot {
    pub dir: PathBuf,
    /// Entry-name prefix preceding the version (`postgresql@`, or empty for bare versions).
    pub prefix: String,
}

impl VersionedRoot {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }
}

fn versioned_roots(tool: &str) -> Vec<VersionedRoot> {
    let brew_dirs = ["/opt/homebrew/opt", "/usr/local/opt"];
    let formulas: &[&str] = match tool {
        "pg_dump" | "psql" => &["postgresql@"],
        "mysqldump" | "mysql" => &["mysql@", "mysql-client@"],
        _ => &[],
    };

    let mut roots: Vec<VersionedRoot> = brew_dirs
        .iter()
        .flat_map(|dir| formulas.iter().map(move |f| VersionedRoot::new(*dir, *f)))
        .collect();
    if matches!(tool, "pg_dump" | "psql") {
        // Debian/Ubuntu layout: /usr/lib/postgresql/16/bin
        roots.push(VersionedRoot::new("/usr/lib/postgresql", ""));
    }
    roots
}

/// Parse `16`, `8.4`, or `16.2.1` into a comparable `(major, minor)`.
fn parse_version(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw.split('.');
    let major = parts.next()?.parse::<u32>().ok()?;
    let minor = match parts.next() {
        Some(part) => part.parse::<u32>().ok()?,
        None => 0,
    };
    if major == 0 {
        return None;
    }
    Some((major, minor))
}

fn executable_name(binary: &str) -> String {
    if cfg!(windows) {
        format!("{binary}.exe")
    } else {
        binary.to_string()
    }
}

/// The highest-versioned `<root>/<prefix><version>/bin/<binary>` that exists.
#[must_use]
pub fn newest_versioned_binary(roots: &[VersionedRoot], binary: &str) -> Option<PathBuf> {
    let binary = executable_name(binary);
    let mut best: Option<((u32, u32), PathBuf)> = None;

    for root in roots {
        let Ok(entries) = std::fs::read_dir(&root.dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(version) = name.strip_prefix(root.prefix.as_str()).and_then(parse_version)
            else {
                continue;
            };
            let candidate = entry.path().join("bin").join(&binary);
            if !candidate.is_file() {
                continue;
            }
            if best.as_ref().is_none_or(|(v, _)| version > *v) {
                best = Some((version, candidate));
            }
        }
    }
    best.map(|(_, path)| path)
}

fn search_path(binary: &str) -> Option<PathBuf> {
    let binary = executable_name(binary);
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(&binary))
        .find(|candidate| candidate.is_file())
}

/// Locate an external tool, preferring the newest versioned install over `PATH`.
///
/// # Errors
/// Returns `DbAccessError::ToolNotFound` when neither a versioned install nor a `PATH` entry
/// exists.
pub fn find_cli_tool(binary: &str) -> Result<PathBuf, DbAccessError> {
    newest_versioned_binary(&versioned_roots(binary), binary)
        .or_else(|| search_path(binary))
        .ok_or_else(|| DbAccessError::ToolNotFound {
            tool: binary.to_string(),
        })
}

fn absolutize(path: &Path) -> Result<PathBuf, DbAccessError> {
    if path.as_os_str().is_empty() {
        return Err(DbAccessError::InvalidPath("path is required".into()));
    }
    std::path::absolute(path).map_err(|e| DbAccessError::InvalidPath(format!("{e}")))
}

/// Normalize an export target: absolute, with an existing parent directory.
///
/// # Errors
/// Returns `DbAccessError::InvalidPath` for an empty path or a missing/non-directory parent.
pub fn validate_export_path(path: &Path) -> Result<PathBuf, DbAccessError> {
    let abs = absolutize(path)?;
    let parent = abs
        .parent()
        .ok_or_else(|| DbAccessError::InvalidPath(format!("no parent directory: {}", abs.display())))?;
    match std::fs::metadata(parent) {
        Ok(meta) if meta.is_dir() => Ok(abs),
        Ok(_) => Err(DbAccessError::InvalidPath(format!(
            "parent path is not a directory: {}",
            parent.display()
        ))),
        Err(_) => Err(DbAccessError::InvalidPath(format!(
            "parent directory does not exist: {}",
            parent.display()
        ))),
    }
}

/// Normalize an import source: absolute, existing, and not a directory.
///
/// # Errors
/// Returns `DbAccessError::InvalidPath` for an empty, missing, or directory path.
pub fn validate_import_path(path: &Path) -> Result<PathBuf, DbAccessError> {
    let abs = absolutize(path)?;
    match std::fs::metadata(&abs) {
        Ok(meta) if meta.is_dir() => Err(DbAccessError::InvalidPath(format!(
            "path is a directory, not a file: {}",
            abs.display()
        ))),
        Ok(_) => Ok(abs),
        Err(_) => Err(DbAccessError::InvalidPath(format!(
            "file does not exist: {}",
            abs.display()
        ))),
    }
}

/// Cut `text` to `max` characters, marking the cut.
#[must_use]
pub fn truncate_output(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}... (truncated)", &text[..idx]),
        None => text.to_string(),
    }
}

/// One run of an external tool.
pub(crate) struct ToolInvocation {
    label: String,
    program: PathBuf,
    args: Vec<OsString>,
    env: Vec<(String, String)>,
    stdin: Option<PathBuf>,
    stdout: Option<PathBuf>,
    output: Option<PathBuf>,
}

impl ToolInvocation {
    /// Resolve `binary` with [`find_cli_tool`].
    pub(crate) fn find(binary: &str) -> Result<Self, DbAccessError> {
        Ok(Self::new(binary, find_cli_tool(binary)?))
    }

    pub(crate) fn new(label: &str, program: PathBuf) -> Self {
        Self {
            label: label.to_string(),
            program,
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
            stdout: None,
            output: None,
        }
    }

    pub(crate) fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub(crate) fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.push((key.to_string(), value.into()));
        self
    }

    /// Feed the file at `path` to the tool's stdin.
    pub(crate) fn stdin_file(mut self, path: &Path) -> Self {
        self.stdin = Some(path.to_path_buf());
        self
    }

    /// Write the tool's stdout to `path`; only stderr is kept for diagnostics.
    pub(crate) fn stdout_file(mut self, path: &Path) -> Self {
        self.stdout = Some(path.to_path_buf());
        self.output = Some(path.to_path_buf());
        self
    }

    /// The tool writes `path` itself; remove it if the run fails.
    pub(crate) fn writes_to(mut self, path: &Path) -> Self {
        self.output = Some(path.to_path_buf());
        self
    }

    /// Run to completion. The child is killed if the future is dropped. A failed run
    /// removes any partial output file.
    ///
    /// # Errors
    /// `DbAccessError::Io` if the process cannot be started or its files opened, and
    /// `DbAccessError::ToolFailed` with truncated output on a non-zero exit.
    pub(crate) async fn run(mut self) -> Result<(), DbAccessError> {
        let output = self.output.take();
        let result = self.execute().await;
        if result.is_err() {
            if let Some(path) = output {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => tracing::debug!("removed partial tool output"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => tracing::warn!(error = %e, "could not remove partial tool output"),
                }
            }
        }
        result
    }

    async fn execute(self) -> Result<(), DbAccessError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(path) = &self.stdin {
            let file = tokio::fs::File::open(path).await?.into_std().await;
            cmd.stdin(Stdio::from(file));
        }
        if let Some(path) = &self.stdout {
            let file = tokio::fs::File::create(path).await?.into_std().await;
            cmd.stdout(Stdio::from(file));
        }

        tracing::debug!(tool = %self.label, "running external tool");
        let mut child = cmd.spawn()?;

        let mut out = Vec::new();
        let mut err = Vec::new();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let read_out = async {
            if let Some(mut pipe) = stdout {
                pipe.read_to_end(&mut out).await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let read_err = async {
            if let Some(mut pipe) = stderr {
                pipe.read_to_end(&mut err).await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let (status, read_out, read_err) = tokio::join!(child.wait(), read_out, read_err);
        let status = status?;
        read_out?;
        read_err?;

        if status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&out).into_owned();
        combined.push_str(&String::from_utf8_lossy(&err));
        tracing::warn!(tool = %self.label, %status, "external tool failed");
        Err(DbAccessError::ToolFailed {
            tool: self.label,
            status: status.to_string(),
            output: truncate_output(combined.trim(), MAX_TOOL_OUTPUT),
        })
    }
}
