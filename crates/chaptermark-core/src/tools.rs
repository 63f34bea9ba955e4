use std::{path::PathBuf, time::Duration};

use tracing::debug;

use crate::{
    error::{ChaptermarkError, Result},
    runner::{CommandRunner, args},
};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_REMUX_TIMEOUT: Duration = Duration::from_secs(600);

/// Locations and time limits of the external tools.
#[derive(Debug, Clone)]
pub struct Tools {
    pub exiftool: PathBuf,
    pub ffmpeg: PathBuf,
    pub probe_timeout: Duration,
    pub remux_timeout: Duration,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            exiftool: PathBuf::from("exiftool"),
            ffmpeg: PathBuf::from("ffmpeg"),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            remux_timeout: DEFAULT_REMUX_TIMEOUT,
        }
    }
}

/// Make sure both tools can be started. Every missing tool is named in the error.
pub async fn check_tools(runner: &dyn CommandRunner, tools: &Tools) -> Result<()> {
    let checks = [(&tools.exiftool, "-ver"), (&tools.ffmpeg, "-version")];
    let mut missing = Vec::new();

    for (program, version_flag) in checks {
        match runner
            .run(program, &args([version_flag]), tools.probe_timeout)
            .await
        {
            // A non-zero exit still proves the binary is there.
            Ok(output) => debug!(
                program = %program.display(),
                code = ?output.code,
                "found dependency"
            ),
            Err(ChaptermarkError::MissingTool { tool }) => missing.push(tool),
            Err(e) => return Err(e),
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ChaptermarkError::MissingTool {
            tool: missing.join(", "),
        })
    }
}
