//! Scripted stand-in for exiftool and ffmpeg used by the unit tests.

use std::{
    collections::HashMap,
    ffi::OsString,
    hash::{DefaultHasher, Hash, Hasher},
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    error::{ChaptermarkError, Result},
    runner::{CommandOutput, CommandRunner},
};

/// How the fake ffmpeg behaves when asked to remux.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FakeRemux {
    /// Copy the first input to the output path and exit 0.
    #[default]
    Copy,
    /// Exit 1 without writing anything.
    Fail,
    /// Write half a file, then exit 1.
    FailAfterPartialWrite,
    /// Exit 0 but write different bytes than the source.
    Corrupt,
    /// Write half a file and never finish.
    Hang,
}

#[derive(Default)]
pub struct FakeRunner {
    /// exiftool output keyed by video file name.
    pub metadata: HashMap<String, String>,
    /// When set, every exiftool metadata read fails with this stderr.
    pub exiftool_failure: Option<String>,
    pub remux: FakeRemux,
    /// Program names that behave as if not installed.
    pub missing: Vec<&'static str>,
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeRunner {
    pub fn with_metadata(mut self, file_name: &str, exiftool_output: &str) -> Self {
        self.metadata
            .insert(file_name.to_string(), exiftool_output.to_string());
        self
    }

    /// Argument lists of every call made to `program`.
    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == program)
            .map(|(_, args)| args.clone())
            .collect()
    }

    fn exiftool(&self, args: &[String]) -> CommandOutput {
        if args.iter().any(|a| a == "-ver") {
            return ok("12.76\n");
        }
        if let Some(stderr) = &self.exiftool_failure {
            return CommandOutput {
                stdout: String::new(),
                stderr: stderr.clone(),
                code: Some(1),
            };
        }
        let file_name = args
            .last()
            .and_then(|a| Path::new(a).file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        ok(self.metadata.get(&file_name).map(String::as_str).unwrap_or(""))
    }

    async fn ffmpeg(&self, args: &[String]) -> Result<CommandOutput> {
        if args.iter().any(|a| a == "-version") {
            return Ok(ok("ffmpeg version 7.1\n"));
        }
        let input = input_after_flag(args);

        if args.iter().any(|a| a == "streamhash") {
            let bytes = std::fs::read(&input)?;
            let mut hasher = DefaultHasher::new();
            bytes.hash(&mut hasher);
            return Ok(ok(&format!("0,v,MD5={:016x}\n", hasher.finish())));
        }

        let output = PathBuf::from(args.last().cloned().unwrap_or_default());
        let source = std::fs::read(&input)?;
        match self.remux {
            FakeRemux::Copy => {
                std::fs::write(&output, &source)?;
                Ok(ok(""))
            }
            FakeRemux::Fail => Ok(failed("Invalid data found when processing input")),
            FakeRemux::FailAfterPartialWrite => {
                std::fs::write(&output, &source[..source.len() / 2])?;
                Ok(failed("Error writing trailer: No space left on device"))
            }
            FakeRemux::Corrupt => {
                let mut bytes = source;
                bytes.push(b'!');
                std::fs::write(&output, bytes)?;
                Ok(ok(""))
            }
            FakeRemux::Hang => {
                std::fs::write(&output, &source[..source.len() / 2])?;
                std::future::pending::<()>().await;
                Ok(ok(""))
            }
        }
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[OsString],
        _timeout: Duration,
    ) -> Result<CommandOutput> {
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().to_string()).collect();
        self.calls.lock().unwrap().push((name.clone(), args.clone()));

        if self.missing.iter().any(|m| *m == name) {
            return Err(ChaptermarkError::MissingTool {
                tool: program.display().to_string(),
            });
        }

        match name.as_str() {
            "exiftool" => Ok(self.exiftool(&args)),
            "ffmpeg" => self.ffmpeg(&args).await,
            other => Err(ChaptermarkError::MissingTool {
                tool: other.to_string(),
            }),
        }
    }
}

fn input_after_flag(args: &[String]) -> PathBuf {
    args.iter()
        .position(|a| a == "-i")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_default()
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        code: Some(0),
    }
}

fn failed(stderr: &str) -> CommandOutput {
    CommandOutput {
        stdout: String::new(),
        stderr: stderr.to_string(),
        code: Some(1),
    }
}
