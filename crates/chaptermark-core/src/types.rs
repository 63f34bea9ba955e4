use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One entry of the chapter table written into the output container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub start: f64,
    pub end: f64,
    pub title: String,
}

impl Chapter {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A highlight marker as shown to the user and written to the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerLabel {
    pub seconds: f64,
    pub label: String,
}

/// Where a single file is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Discovered,
    Extracting,
    Parsing,
    BuildingChapters,
    Formatting,
    Remuxing,
    Verifying,
}

impl Stage {
    pub fn describe(&self) -> &'static str {
        match self {
            Stage::Discovered => "Queued",
            Stage::Extracting => "Reading metadata",
            Stage::Parsing => "Parsing highlight markers",
            Stage::BuildingChapters => "Building chapters",
            Stage::Formatting => "Writing chapter file",
            Stage::Remuxing => "Injecting chapters",
            Stage::Verifying => "Verifying streams",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyProcessed,
    NoMarkers,
    OutputExists { output: PathBuf },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AlreadyProcessed => write!(f, "already processed"),
            SkipReason::NoMarkers => write!(f, "no highlights found"),
            SkipReason::OutputExists { output } => {
                write!(f, "{} already exists", output.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Succeeded { output: PathBuf, chapters: usize },
    Skipped(SkipReason),
    Failed { reason: String, detail: String },
}

/// One block of the run log; exactly one is written per file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub timestamp: DateTime<Local>,
    pub file_name: String,
    pub markers: Vec<MarkerLabel>,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub found: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub interrupted: bool,
    pub entries: Vec<RunLogEntry>,
}

impl BatchSummary {
    pub fn push(&mut self, entry: RunLogEntry) {
        match entry.outcome {
            FileOutcome::Succeeded { .. } => self.succeeded += 1,
            FileOutcome::Skipped(_) => self.skipped += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
        }
        self.entries.push(entry);
    }
}
