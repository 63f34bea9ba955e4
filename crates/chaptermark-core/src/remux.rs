//! Chapter injection with ffmpeg stream copy.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{debug, warn};

use crate::{
    error::{ChaptermarkError, Result},
    runner::{CommandRunner, args},
    tools::Tools,
};

pub const OUTPUT_SUFFIX: &str = "_chapters";

/// What to do when `<stem>_chapters.mp4` is already there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingOutputPolicy {
    #[default]
    Fail,
    Skip,
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPlan {
    Write,
    SkipExisting,
}

/// `clip.mp4` -> `clip_chapters.mp4` in the same directory.
pub fn output_path_for(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    source.with_file_name(format!("{}{}.mp4", stem, OUTPUT_SUFFIX))
}

fn partial_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    output.with_file_name(format!(".{}.partial.mp4", stem))
}

pub fn plan_output(output: &Path, policy: ExistingOutputPolicy) -> Result<OutputPlan> {
    if !output.exists() {
        return Ok(OutputPlan::Write);
    }
    match policy {
        ExistingOutputPolicy::Fail => Err(ChaptermarkError::ExistingOutput {
            path: output.to_path_buf(),
        }),
        ExistingOutputPolicy::Skip => Ok(OutputPlan::SkipExisting),
        ExistingOutputPolicy::Overwrite => Ok(OutputPlan::Write),
    }
}

/// Write the ffmetadata text to a hidden temp file next to the source.
/// The file is deleted when the handle is dropped.
pub fn write_chapter_file(dir: &Path, stem: &str, contents: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!(".{}_chapters.", stem))
        .suffix(".ffmeta")
        .tempfile_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Removes a half-written output unless disarmed.
struct PartialGuard {
    path: PathBuf,
    armed: bool,
}

impl PartialGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialGuard {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "could not remove partial output");
            }
        }
    }
}

/// Copy the streams of `source` into `output`, attaching the chapters from
/// `chapter_file`. Nothing is re-encoded and the source is only read.
pub async fn remux_with_chapters(
    runner: &dyn CommandRunner,
    tools: &Tools,
    source: &Path,
    chapter_file: &Path,
    output: &Path,
    policy: ExistingOutputPolicy,
) -> Result<()> {
    let partial = partial_path_for(output);
    let mut guard = PartialGuard::new(partial.clone());

    let mut argv = args(["-nostdin", "-hide_banner", "-loglevel", "error", "-y", "-i"]);
    argv.push(source.into());
    argv.push("-i".into());
    argv.push(chapter_file.into());
    argv.extend(args([
        "-map",
        "0:v",
        "-map",
        "0:a?",
        "-map_metadata",
        "0",
        "-map_chapters",
        "1",
        "-c",
        "copy",
        "-f",
        "mp4",
    ]));
    argv.push(partial.clone().into());

    let result = runner.run(&tools.ffmpeg, &argv, tools.remux_timeout).await?;

    if !result.success() {
        return Err(ChaptermarkError::Remux {
            file: source.to_path_buf(),
            reason: match result.stderr.trim() {
                "" => format!("ffmpeg exited with {:?}", result.code),
                stderr => stderr.to_string(),
            },
        });
    }
    if !partial.exists() {
        return Err(ChaptermarkError::Remux {
            file: source.to_path_buf(),
            reason: "ffmpeg reported success but wrote no output".to_string(),
        });
    }

    // Another process may have created the output while ffmpeg was running.
    if plan_output(output, policy)? == OutputPlan::SkipExisting {
        return Err(ChaptermarkError::ExistingOutput {
            path: output.to_path_buf(),
        });
    }

    fs::rename(&partial, output).await?;
    guard.disarm();
    debug!(output = %output.display(), "chapters injected");
    Ok(())
}

/// Per-stream packet hashes of the audio and video streams.
async fn stream_hashes(runner: &dyn CommandRunner, tools: &Tools, file: &Path) -> Result<String> {
    let mut argv = args(["-nostdin", "-hide_banner", "-loglevel", "error", "-i"]);
    argv.push(file.into());
    argv.extend(args([
        "-map", "0:v", "-map", "0:a?", "-c", "copy", "-f", "streamhash", "-hash", "md5", "-",
    ]));

    let result = runner.run(&tools.ffmpeg, &argv, tools.remux_timeout).await?;
    if !result.success() {
        return Err(ChaptermarkError::Remux {
            file: file.to_path_buf(),
            reason: format!("stream hashing failed: {}", result.stderr_tail(200)),
        });
    }
    Ok(result.stdout.trim().to_string())
}

/// Check that `output` carries exactly the same audio/video packets as `source`.
pub async fn verify_streams(
    runner: &dyn CommandRunner,
    tools: &Tools,
    source: &Path,
    output: &Path,
) -> Result<()> {
    let expected = stream_hashes(runner, tools, source).await?;
    let actual = stream_hashes(runner, tools, output).await?;
    if expected != actual {
        warn!(source = %source.display(), %expected, %actual, "stream hash mismatch");
        return Err(ChaptermarkError::StreamMismatch {
            file: source.to_path_buf(),
        });
    }
    Ok(())
}
