//! External process execution.
//!
//! Everything that shells out (exiftool, ffmpeg) goes through [`CommandRunner`],
//! so tests can script the tools instead of spawning them.

use std::{
    ffi::OsString,
    io::ErrorKind,
    path::Path,
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ChaptermarkError, Result};

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last `max_chars` characters of stderr, for short console messages.
    pub fn stderr_tail(&self, max_chars: usize) -> String {
        let trimmed = self.stderr.trim();
        let count = trimmed.chars().count();
        if count <= max_chars {
            return trimmed.to_string();
        }
        trimmed.chars().skip(count - max_chars).collect()
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion. A program that cannot be found maps to
    /// [`ChaptermarkError::MissingTool`].
    async fn run(
        &self,
        program: &Path,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<CommandOutput>;
}

/// Runs real child processes with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[OsString],
        timeout: Duration,
    ) -> Result<CommandOutput> {
        debug!(program = %program.display(), ?args, "spawning");

        // Dropping the child (timeout, Ctrl-C) kills it.
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ChaptermarkError::MissingTool {
                    tool: program.display().to_string(),
                },
                _ => ChaptermarkError::Io(e),
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(ChaptermarkError::Timeout {
                    program: program.display().to_string(),
                    secs: timeout.as_secs(),
                });
            }
        };

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        };
        debug!(program = %program.display(), code = ?result.code, "finished");
        Ok(result)
    }
}

/// Convenience for building argument lists from mixed strings and paths.
pub(crate) fn args<I, S>(items: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    items.into_iter().map(Into::into).collect()
}
