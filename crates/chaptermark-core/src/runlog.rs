//! Human-readable run log.
//!
//! The orchestrator writes through a [`RunLog`] it is handed; there is no
//! global logger for this. Every call only appends.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Local;

use crate::{
    error::Result,
    types::{BatchSummary, FileOutcome, RunLogEntry},
};

pub const DEFAULT_LOG_FILE: &str = "chapter_injection_log.txt";

pub trait RunLog {
    fn record(&mut self, entry: &RunLogEntry) -> Result<()>;
    fn finish(&mut self, summary: &BatchSummary) -> Result<()>;
}

/// Run log written to a text file, truncated at the start of each run.
pub struct FileRunLog {
    path: PathBuf,
    file: File,
}

impl FileRunLog {
    pub fn create(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        writeln!(
            file,
            "DJI Marker to Chapter Injection - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(file, "{}\n", "=".repeat(50))?;
        file.flush()?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, text: &str) -> Result<()> {
        self.file.write_all(text.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

impl RunLog for FileRunLog {
    fn record(&mut self, entry: &RunLogEntry) -> Result<()> {
        self.append(&render_entry(entry))
    }

    fn finish(&mut self, summary: &BatchSummary) -> Result<()> {
        self.append(&render_summary(summary))
    }
}

/// Keeps everything in memory; handy when the caller wants the entries back.
#[derive(Debug, Default)]
pub struct MemoryRunLog {
    pub entries: Vec<RunLogEntry>,
    pub summary: Option<BatchSummary>,
}

impl RunLog for MemoryRunLog {
    fn record(&mut self, entry: &RunLogEntry) -> Result<()> {
        self.entries.push(entry.clone());
        Ok(())
    }

    fn finish(&mut self, summary: &BatchSummary) -> Result<()> {
        self.summary = Some(summary.clone());
        Ok(())
    }
}

pub fn render_entry(entry: &RunLogEntry) -> String {
    let mut output = format!(
        "[{}] File: {}\n",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.file_name
    );

    if !entry.markers.is_empty() {
        output.push_str(&format!("  Found {} markers\n", entry.markers.len()));
        for marker in &entry.markers {
            output.push_str(&format!("    {} ({} seconds)\n", marker.label, marker.seconds));
        }
    }

    match &entry.outcome {
        FileOutcome::Succeeded { output: path, chapters } => output.push_str(&format!(
            "  Success: {} created ({} chapters)\n",
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            chapters
        )),
        FileOutcome::Skipped(reason) => {
            output.push_str(&format!("  Skipped: {}\n", reason));
        }
        FileOutcome::Failed { detail, .. } => {
            output.push_str(&format!("  Failed: {}\n", detail.trim()));
        }
    }

    output.push('\n');
    output
}

pub fn render_summary(summary: &BatchSummary) -> String {
    let mut output = String::from("\nSUMMARY\n");
    if summary.interrupted {
        output.push_str("Run interrupted before all files were processed\n");
    }
    output.push_str(&format!("Total files: {}\n", summary.found));
    output.push_str(&format!("Success: {}\n", summary.succeeded));
    output.push_str(&format!("Skipped: {}\n", summary.skipped));
    output.push_str(&format!("Failed: {}\n", summary.failed));
    output
}
