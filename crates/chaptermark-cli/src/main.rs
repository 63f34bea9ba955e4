use std::{
    future::Future,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{Level, warn};
use tracing_subscriber::EnvFilter;

use chaptermark_core::{
    BatchSettings, BatchSummary, ExistingOutputPolicy, FileOutcome, FileRunLog, MarkerLabel,
    Progress, ProcessRunner, RunLogEntry, Stage, TitleStyle, Tools, check_tools, run_batch,
    save_summary,
};

/// CLI wrapper for ExistingOutputPolicy (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliOnExisting {
    #[default]
    Fail,
    Skip,
    Overwrite,
}

impl From<CliOnExisting> for ExistingOutputPolicy {
    fn from(cli: CliOnExisting) -> Self {
        match cli {
            CliOnExisting::Fail => ExistingOutputPolicy::Fail,
            CliOnExisting::Skip => ExistingOutputPolicy::Skip,
            CliOnExisting::Overwrite => ExistingOutputPolicy::Overwrite,
        }
    }
}

/// CLI wrapper for TitleStyle
#[derive(Clone, Default, ValueEnum)]
enum CliTitles {
    #[default]
    Numbered,
    Timestamped,
}

impl From<CliTitles> for TitleStyle {
    fn from(cli: CliTitles) -> Self {
        match cli {
            CliTitles::Numbered => TitleStyle::Numbered,
            CliTitles::Timestamped => TitleStyle::Timestamped,
        }
    }
}

#[derive(Parser)]
#[command(name = "chaptermark")]
#[command(about = "Copy DJI highlight markers into MP4 chapter tables without re-encoding")]
struct Cli {
    /// Folder with the recordings (not searched recursively)
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// What to do when <name>_chapters.mp4 already exists
    #[arg(long, value_enum, default_value = "fail")]
    on_existing: CliOnExisting,

    /// Chapter title style
    #[arg(long, value_enum, default_value = "numbered")]
    titles: CliTitles,

    /// Compare audio/video stream hashes of every output with its source
    #[arg(long)]
    verify: bool,

    /// Run log file name, relative to the folder
    #[arg(long, default_value = chaptermark_core::DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Also write the batch summary as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// exiftool executable
    #[arg(long, env = "CHAPTERMARK_EXIFTOOL", default_value = "exiftool")]
    exiftool: PathBuf,

    /// ffmpeg executable
    #[arg(long, env = "CHAPTERMARK_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Seconds a single ffmpeg run may take
    #[arg(long, default_value_t = 600)]
    timeout: u64,

    /// Show debug diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn settings(&self) -> BatchSettings {
        BatchSettings {
            dir: self.dir.clone(),
            log_file: self.log_file.clone(),
            on_existing: self.on_existing.clone().into(),
            titles: self.titles.clone().into(),
            verify: self.verify,
            tools: Tools {
                exiftool: self.exiftool.clone(),
                ffmpeg: self.ffmpeg.clone(),
                remux_timeout: Duration::from_secs(self.timeout),
                ..Tools::default()
            },
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Renders batch progress on the terminal.
#[derive(Default)]
struct ConsoleProgress {
    spinner: Option<ProgressBar>,
    current: String,
}

impl ConsoleProgress {
    fn println(&self, line: String) {
        match &self.spinner {
            Some(pb) => pb.println(line),
            None => println!("{}", line),
        }
    }
}

impl Progress for ConsoleProgress {
    fn batch_started(&mut self, dir: &Path, candidates: usize) {
        if candidates == 0 {
            println!(
                "{} No MP4 files to process in {}",
                style("⚠").yellow().bold(),
                style(dir.display()).cyan()
            );
        }
    }

    fn file_started(&mut self, file: &Path) {
        self.current = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        println!("{}", style("━".repeat(50)).cyan());
        self.spinner = Some(create_spinner(&format!("Processing {}", self.current)));
    }

    fn stage(&mut self, _file: &Path, stage: Stage) {
        if let Some(pb) = &self.spinner {
            pb.set_message(format!("{}: {}...", self.current, stage.describe()));
        }
    }

    fn markers_found(&mut self, _file: &Path, markers: &[MarkerLabel]) {
        self.println(format!(
            "  {} Found {} markers",
            style("✓").green().bold(),
            markers.len()
        ));
        for marker in markers {
            self.println(format!(
                "    {}",
                style(format!("• {} ({} seconds)", marker.label, marker.seconds)).dim()
            ));
        }
    }

    fn file_finished(&mut self, entry: &RunLogEntry) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
        let line = match &entry.outcome {
            FileOutcome::Succeeded { output, chapters } => format!(
                "{} {} {}",
                style("✓").green().bold(),
                entry.file_name,
                style(format!(
                    "→ {} ({} chapters)",
                    output
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    chapters
                ))
                .dim()
            ),
            FileOutcome::Skipped(reason) => format!(
                "{} {} {}",
                style("⊘").yellow().bold(),
                entry.file_name,
                style(format!("({})", reason)).dim()
            ),
            FileOutcome::Failed { reason, detail } => format!(
                "{} {} {}\n  {}",
                style("✗").red().bold(),
                entry.file_name,
                style(format!("({})", reason)).red(),
                style(detail_tail(detail, 200)).dim()
            ),
        };
        println!("{}", line);
    }
}

/// Last `max_chars` characters of a failure detail.
fn detail_tail(detail: &str, max_chars: usize) -> String {
    let detail = detail.trim();
    let count = detail.chars().count();
    if count <= max_chars {
        return detail.to_string();
    }
    let tail: String = detail.chars().skip(count - max_chars).collect();
    format!("…{}", tail.trim_start())
}

/// Resolves when the user interrupts the run. If the signal handler cannot
/// be installed the batch runs to completion instead.
async fn interrupted<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(error = %e, "cannot listen for Ctrl-C, running without interrupt support");
        std::future::pending::<()>().await;
    }
}

/// Writes the JSON summary. A failure is reported but does not change the
/// exit code of a finished batch.
async fn write_summary_json(summary: &BatchSummary, path: &Path) -> bool {
    match save_summary(summary, path).await {
        Ok(()) => {
            println!(
                "{} {}",
                style("Summary saved to:").dim(),
                style(path.display()).cyan()
            );
            true
        }
        Err(e) => {
            eprintln!(
                "{} cannot write summary {}: {}",
                style("Warning:").yellow().bold(),
                path.display(),
                e
            );
            false
        }
    }
}

fn print_summary(summary: &BatchSummary, log_path: &Path) {
    println!("{}", style("━".repeat(50)).cyan());
    println!("{}", style("SUMMARY").white().bold());
    println!("  Total files found:      {}", summary.found);
    println!(
        "  {}",
        style(format!("Successfully processed: {}", summary.succeeded)).green()
    );
    println!(
        "  {}",
        style(format!("Skipped:                {}", summary.skipped)).yellow()
    );
    println!(
        "  {}",
        style(format!("Failed:                 {}", summary.failed)).red()
    );
    if summary.interrupted {
        println!("  {}", style("Interrupted before all files were processed").yellow());
    }
    println!(
        "\n{} {}",
        style("Log saved to:").dim(),
        style(log_path.display()).cyan()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let settings = cli.settings();
    let runner = ProcessRunner;

    // Validate tools early
    if let Err(e) = check_tools(&runner, &settings.tools).await {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    let log_path = settings.log_path();
    let mut run_log = match FileRunLog::create(&log_path) {
        Ok(log) => log,
        Err(e) => {
            eprintln!(
                "{} cannot write run log {}: {}",
                style("Error:").red().bold(),
                log_path.display(),
                e
            );
            std::process::exit(1);
        }
    };

    println!(
        "\n{}  {}\n",
        style("chaptermark").cyan().bold(),
        style("DJI highlights → MP4 chapters").dim()
    );

    let mut progress = ConsoleProgress::default();
    let shutdown = interrupted(tokio::signal::ctrl_c());

    let summary = match run_batch(&runner, &settings, &mut run_log, &mut progress, shutdown).await
    {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    print_summary(&summary, run_log.path());
    if let Some(path) = &cli.summary_json {
        write_summary_json(&summary, path).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_detail_is_kept_whole() {
        assert_eq!(detail_tail("  ffmpeg exited with 1 \n", 200), "ffmpeg exited with 1");
    }

    #[test]
    fn long_detail_keeps_its_end() {
        let detail = format!(
            "Remux failed for /media/{}/DJI_0001.MP4: moov atom not found",
            "very-long-folder/".repeat(20)
        );
        let shown = detail_tail(&detail, 60);
        assert!(shown.starts_with('…'));
        assert!(shown.ends_with("moov atom not found"));
        assert!(shown.chars().count() <= 61);
    }

    #[tokio::test]
    async fn broken_signal_handler_does_not_interrupt() {
        let signal = async { Err(io::Error::other("no signal support")) };
        let waited = tokio::time::timeout(Duration::from_millis(50), interrupted(signal)).await;
        assert!(waited.is_err(), "shutdown resolved without a signal");
    }

    #[tokio::test]
    async fn signal_resolves_shutdown() {
        let waited =
            tokio::time::timeout(Duration::from_millis(50), interrupted(async { Ok(()) })).await;
        assert!(waited.is_ok());
    }

    #[tokio::test]
    async fn unwritable_summary_json_is_only_a_warning() {
        let summary = BatchSummary {
            found: 2,
            succeeded: 2,
            ..Default::default()
        };
        let path = Path::new("/nonexistent-chaptermark-dir/summary.json");
        assert!(!write_summary_json(&summary, path).await);
    }
}
