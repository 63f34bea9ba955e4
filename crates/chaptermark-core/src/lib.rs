//! Chaptermark Core Library
//!
//! Reads the highlight markers a DJI camera stores in its MP4 metadata and
//! writes them back as a standard chapter table in a stream-copied sibling
//! file, using exiftool and ffmpeg.

pub mod chapters;
pub mod config;
pub mod discover;
pub mod error;
pub mod format;
pub mod metadata;
pub mod pipeline;
pub mod remux;
pub mod runlog;
pub mod runner;
pub mod tools;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used items at crate root
pub use chapters::{TitleStyle, build_chapters};
pub use config::BatchSettings;
pub use discover::{Discovery, discover_videos, is_chapters_output};
pub use error::{ChaptermarkError, Result};
pub use format::{format_marker_label, format_timestamp, parse_ffmetadata, render_ffmetadata};
pub use metadata::{ProbedMetadata, parse_metadata, read_metadata};
pub use pipeline::{NoProgress, Progress, load_summary, process_file, run_batch, save_summary};
pub use remux::{ExistingOutputPolicy, output_path_for, remux_with_chapters, verify_streams};
pub use runlog::{DEFAULT_LOG_FILE, FileRunLog, MemoryRunLog, RunLog};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use tools::{Tools, check_tools};
pub use types::{
    BatchSummary, Chapter, FileOutcome, MarkerLabel, RunLogEntry, SkipReason, Stage,
};
