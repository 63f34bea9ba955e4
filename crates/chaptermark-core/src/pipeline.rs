//! Batch orchestration.
//!
//! Files are handled one at a time: extract → parse → build chapters →
//! format → remux (→ verify). A failure in any stage ends that file only.

use std::{future::Future, path::Path};

use chrono::Local;
use tokio::fs;
use tracing::{info, warn};

use crate::{
    chapters::build_chapters,
    config::BatchSettings,
    discover::discover_videos,
    error::{ChaptermarkError, Result},
    format::{format_marker_label, render_ffmetadata},
    metadata::{parse_metadata, read_metadata},
    remux::{
        OutputPlan, output_path_for, plan_output, remux_with_chapters, verify_streams,
        write_chapter_file,
    },
    runlog::RunLog,
    runner::CommandRunner,
    types::{BatchSummary, FileOutcome, MarkerLabel, RunLogEntry, SkipReason, Stage},
};

/// Receives progress callbacks so a front end can render them.
pub trait Progress {
    fn batch_started(&mut self, _dir: &Path, _candidates: usize) {}
    fn file_started(&mut self, _file: &Path) {}
    fn stage(&mut self, _file: &Path, _stage: Stage) {}
    fn markers_found(&mut self, _file: &Path, _markers: &[MarkerLabel]) {}
    fn file_finished(&mut self, _entry: &RunLogEntry) {}
}

/// Progress sink that ignores everything.
pub struct NoProgress;

impl Progress for NoProgress {}

/// Process every candidate video in `settings.dir`.
///
/// Completes once `shutdown` resolves, abandoning the file in flight. Its
/// child process is killed and its temporary files are removed. Only errors
/// that prevent the batch from starting are returned.
pub async fn run_batch<S>(
    runner: &dyn CommandRunner,
    settings: &BatchSettings,
    log: &mut dyn RunLog,
    progress: &mut dyn Progress,
    shutdown: S,
) -> Result<BatchSummary>
where
    S: Future<Output = ()>,
{
    let discovery = discover_videos(&settings.dir).await?;
    let mut summary = BatchSummary {
        found: discovery.candidates.len() + discovery.already_processed.len(),
        ..Default::default()
    };
    progress.batch_started(&settings.dir, discovery.candidates.len());

    for path in &discovery.already_processed {
        let entry = RunLogEntry {
            timestamp: Local::now(),
            file_name: file_name(path),
            markers: Vec::new(),
            outcome: FileOutcome::Skipped(SkipReason::AlreadyProcessed),
        };
        finish_entry(log, progress, &mut summary, entry);
    }

    tokio::pin!(shutdown);

    for video in &discovery.candidates {
        progress.file_started(video);
        let started = Local::now();

        let entry = tokio::select! {
            entry = process_file(runner, settings, video, progress) => Some(entry),
            _ = &mut shutdown => None,
        };

        let Some(entry) = entry else {
            warn!(file = %video.display(), "interrupted, stopping batch");
            summary.interrupted = true;
            let entry = RunLogEntry {
                timestamp: started,
                file_name: file_name(video),
                markers: Vec::new(),
                outcome: FileOutcome::Failed {
                    reason: "interrupted".to_string(),
                    detail: "run interrupted while this file was in progress".to_string(),
                },
            };
            finish_entry(log, progress, &mut summary, entry);
            break;
        };

        finish_entry(log, progress, &mut summary, entry);
    }

    if let Err(e) = log.finish(&summary) {
        warn!(error = %e, "could not write run log summary");
    }
    Ok(summary)
}

fn finish_entry(
    log: &mut dyn RunLog,
    progress: &mut dyn Progress,
    summary: &mut BatchSummary,
    entry: RunLogEntry,
) {
    match &entry.outcome {
        FileOutcome::Succeeded { output, chapters } => {
            info!(file = %entry.file_name, output = %output.display(), chapters, "chapters injected")
        }
        FileOutcome::Skipped(reason) => info!(file = %entry.file_name, %reason, "skipped"),
        FileOutcome::Failed { detail, .. } => warn!(file = %entry.file_name, %detail, "failed"),
    }

    if let Err(e) = log.record(&entry) {
        warn!(error = %e, "could not write run log entry");
    }
    progress.file_finished(&entry);
    summary.push(entry);
}

/// Run one file through the pipeline. Never fails: errors become
/// [`FileOutcome::Failed`].
pub async fn process_file(
    runner: &dyn CommandRunner,
    settings: &BatchSettings,
    video: &Path,
    progress: &mut dyn Progress,
) -> RunLogEntry {
    let timestamp = Local::now();
    let mut markers = Vec::new();

    let outcome = match run_stages(runner, settings, video, progress, &mut markers).await {
        Ok(outcome) => outcome,
        Err(e) => FileOutcome::Failed {
            reason: e.short_reason(),
            detail: e.to_string(),
        },
    };

    RunLogEntry {
        timestamp,
        file_name: file_name(video),
        markers,
        outcome,
    }
}

async fn run_stages(
    runner: &dyn CommandRunner,
    settings: &BatchSettings,
    video: &Path,
    progress: &mut dyn Progress,
    labels: &mut Vec<MarkerLabel>,
) -> Result<FileOutcome> {
    let tools = &settings.tools;
    let output = output_path_for(video);

    if plan_output(&output, settings.on_existing)? == OutputPlan::SkipExisting {
        return Ok(FileOutcome::Skipped(SkipReason::OutputExists { output }));
    }

    progress.stage(video, Stage::Extracting);
    let raw = read_metadata(runner, tools, video).await?;

    progress.stage(video, Stage::Parsing);
    let metadata = parse_metadata(&raw)?;
    *labels = metadata
        .markers
        .iter()
        .map(|&seconds| MarkerLabel {
            seconds,
            label: format_marker_label(seconds),
        })
        .collect();

    if metadata.markers.is_empty() {
        return Ok(FileOutcome::Skipped(SkipReason::NoMarkers));
    }
    progress.markers_found(video, labels);

    let duration = metadata.duration.ok_or_else(|| ChaptermarkError::Extract {
        file: video.to_path_buf(),
        reason: "no duration reported".to_string(),
    })?;

    progress.stage(video, Stage::BuildingChapters);
    let chapters = build_chapters(&metadata.markers, duration, settings.titles)?;

    progress.stage(video, Stage::Formatting);
    let dir = video.parent().unwrap_or(Path::new("."));
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    // Deleted when it goes out of scope, whatever happens below.
    let chapter_file = write_chapter_file(dir, &stem, &render_ffmetadata(&chapters))?;

    progress.stage(video, Stage::Remuxing);
    remux_with_chapters(
        runner,
        tools,
        video,
        chapter_file.path(),
        &output,
        settings.on_existing,
    )
    .await?;

    if settings.verify {
        progress.stage(video, Stage::Verifying);
        if let Err(e) = verify_streams(runner, tools, video, &output).await {
            fs::remove_file(&output).await?;
            return Err(e);
        }
    }

    Ok(FileOutcome::Succeeded {
        output,
        chapters: chapters.len(),
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Save a batch summary as pretty JSON.
pub async fn save_summary(summary: &BatchSummary, path: &Path) -> Result<()> {
    let pretty_json = serde_json::to_string_pretty(summary)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}

/// Load a summary written by [`save_summary`].
pub async fn load_summary(path: &Path) -> Result<BatchSummary> {
    let json_content = fs::read_to_string(path).await?;
    let summary: BatchSummary = serde_json::from_str(&json_content)?;
    Ok(summary)
}
