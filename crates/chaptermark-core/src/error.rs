use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChaptermarkError {
    #[error("Missing required tool: {tool} (install it and make sure it is on PATH)")]
    MissingTool { tool: String },

    #[error("Metadata extraction failed for {file}: {reason}")]
    Extract { file: PathBuf, reason: String },

    #[error("Malformed time value '{token}': {reason}")]
    Parse { token: String, reason: String },

    #[error("Output already exists: {path}")]
    ExistingOutput { path: PathBuf },

    #[error("Remux failed for {file}: {reason}")]
    Remux { file: PathBuf, reason: String },

    #[error("{program} did not finish within {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("Stream hashes differ between {file} and its chaptered copy")]
    StreamMismatch { file: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChaptermarkError {
    /// One-line reason for the console; the full message goes to the run log.
    pub fn short_reason(&self) -> String {
        match self {
            ChaptermarkError::MissingTool { tool } => format!("{} not found", tool),
            ChaptermarkError::Extract { reason, .. } => format!("metadata: {}", reason),
            ChaptermarkError::Parse { token, .. } => format!("bad marker value '{}'", token),
            ChaptermarkError::ExistingOutput { .. } => "output already exists".to_string(),
            ChaptermarkError::Remux { .. } => "ffmpeg error".to_string(),
            ChaptermarkError::Timeout { program, .. } => format!("{} timed out", program),
            ChaptermarkError::StreamMismatch { .. } => "stream verification failed".to_string(),
            ChaptermarkError::Io(e) => e.to_string(),
            ChaptermarkError::Json(e) => e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChaptermarkError>;
