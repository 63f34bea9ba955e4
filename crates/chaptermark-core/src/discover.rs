use std::path::{Path, PathBuf};

use tokio::fs;

use crate::{error::Result, remux::OUTPUT_SUFFIX};

pub const VIDEO_EXTENSION: &str = "mp4";

/// MP4 files found in the target directory.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Files to run through the pipeline, sorted by name.
    pub candidates: Vec<PathBuf>,
    /// Files that are themselves outputs of an earlier run.
    pub already_processed: Vec<PathBuf>,
}

/// List the MP4 files directly inside `dir`. No recursion; hidden files
/// (including our own partial outputs) are ignored.
pub async fn discover_videos(dir: &Path) -> Result<Discovery> {
    let mut entries = fs::read_dir(dir).await?;
    let mut discovery = Discovery::default();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() || !is_video(&path) || is_hidden(&path) {
            continue;
        }
        if is_chapters_output(&path) {
            discovery.already_processed.push(path);
        } else {
            discovery.candidates.push(path);
        }
    }

    discovery.candidates.sort();
    discovery.already_processed.sort();
    Ok(discovery)
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(VIDEO_EXTENSION))
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// True for names like `clip_chapters.mp4`.
pub fn is_chapters_output(path: &Path) -> bool {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().ends_with(OUTPUT_SUFFIX))
        .unwrap_or(false)
}
