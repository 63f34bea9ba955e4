//! Highlight marker extraction.
//!
//! exiftool is asked for the DJI `HighlightMarkers` tag and the container
//! duration. Its `-G1 -s` output looks like:
//!
//! ```text
//! [QuickTime]     Duration                        : 200.2
//! [DJI]           HighlightMarkers                : 30, 90, 150
//! ```
//!
//! All knowledge of that layout lives in this module.

use std::path::Path;

use tracing::debug;

use crate::{
    error::{ChaptermarkError, Result},
    runner::{CommandRunner, args},
    tools::Tools,
};

pub const MARKER_TAG: &str = "HighlightMarkers";
pub const DURATION_TAG: &str = "Duration";
const PREFERRED_DURATION_GROUP: &str = "QuickTime";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbedMetadata {
    /// Marker offsets in seconds, in the order the camera wrote them.
    pub markers: Vec<f64>,
    /// Total duration in seconds, if exiftool reported one.
    pub duration: Option<f64>,
}

/// Run exiftool on `video` and return its raw text output.
pub async fn read_metadata(
    runner: &dyn CommandRunner,
    tools: &Tools,
    video: &Path,
) -> Result<String> {
    let mut argv = args([
        "-G1",
        "-s",
        "-n",
        "-ee",
        "-HighlightMarkers",
        "-Duration",
    ]);
    argv.push(video.into());

    let output = runner
        .run(&tools.exiftool, &argv, tools.probe_timeout)
        .await?;

    // exiftool exits non-zero for minor warnings while still printing tags.
    if !output.success() && output.stdout.trim().is_empty() {
        let reason = match output.stderr_tail(200) {
            tail if tail.is_empty() => format!("exiftool exited with {:?}", output.code),
            tail => tail,
        };
        return Err(ChaptermarkError::Extract {
            file: video.to_path_buf(),
            reason,
        });
    }

    Ok(output.stdout)
}

/// Parse exiftool output into marker offsets and duration.
pub fn parse_metadata(raw: &str) -> Result<ProbedMetadata> {
    let mut markers = Vec::new();
    let mut duration: Option<(bool, f64)> = None;

    for line in raw.lines() {
        let Some((group, tag, value)) = split_tag_line(line) else {
            continue;
        };

        if tag == MARKER_TAG {
            markers.extend(parse_marker_list(value)?);
        } else if tag == DURATION_TAG {
            let preferred = group == Some(PREFERRED_DURATION_GROUP);
            match duration {
                Some((true, _)) => {}
                Some((false, _)) if !preferred => {}
                _ => duration = Some((preferred, parse_time_value(value)?)),
            }
        }
    }

    debug!(count = markers.len(), ?duration, "parsed metadata");
    Ok(ProbedMetadata {
        markers,
        duration: duration.map(|(_, secs)| secs),
    })
}

/// Split `[Group] Tag : value` into its parts. The group is optional.
fn split_tag_line(line: &str) -> Option<(Option<&str>, &str, &str)> {
    let line = line.trim();
    let (group, rest) = match line.strip_prefix('[') {
        Some(stripped) => {
            let (group, rest) = stripped.split_once(']')?;
            (Some(group.trim()), rest)
        }
        None => (None, line),
    };
    let (tag, value) = rest.split_once(':')?;
    let tag = tag.trim();
    if tag.is_empty() || tag.contains(char::is_whitespace) {
        return None;
    }
    Some((group, tag, value.trim()))
}

/// Parse a marker list such as `30, 90, 150` or `0:30;1:30`.
pub fn parse_marker_list(value: &str) -> Result<Vec<f64>> {
    value
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(parse_time_value)
        .collect()
}

/// Parse one time value: plain seconds (`30`, `30.5`, `30s`) or clock form
/// (`M:SS`, `H:MM:SS`, fractions allowed in the last field). Minute and
/// second fields after the leading one must be below 60.
pub fn parse_time_value(token: &str) -> Result<f64> {
    let trimmed = token.trim();
    let body = trimmed.strip_suffix('s').unwrap_or(trimmed).trim_end();

    let fields: Vec<&str> = body.split(':').collect();
    if fields.len() > 3 {
        return Err(parse_error(token, "too many ':' separated fields"));
    }

    let mut seconds = 0.0;
    for (i, field) in fields.iter().enumerate() {
        let value: f64 = field
            .parse()
            .map_err(|_| parse_error(token, "not a number"))?;
        if !value.is_finite() {
            return Err(parse_error(token, "not a finite number"));
        }
        if value < 0.0 {
            return Err(parse_error(token, "negative time"));
        }
        if i > 0 && value >= 60.0 {
            return Err(parse_error(token, "clock field out of range"));
        }
        seconds = seconds * 60.0 + value;
    }
    Ok(seconds)
}

fn parse_error(token: &str, reason: &str) -> ChaptermarkError {
    ChaptermarkError::Parse {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;
    use std::path::PathBuf;

    const DJI_OUTPUT: &str = "\
[ExifTool]      ExifToolVersion                 : 12.76
[QuickTime]     Duration                        : 200.2
[Track1]        Duration                        : 200.166
[DJI]           HighlightMarkers                : 30, 90, 150
";

    #[test]
    fn parses_dji_markers_and_container_duration() {
        let meta = parse_metadata(DJI_OUTPUT).unwrap();
        assert_eq!(meta.markers, vec![30.0, 90.0, 150.0]);
        assert_eq!(meta.duration, Some(200.2));
    }

    #[test]
    fn quicktime_duration_wins_even_when_seen_late() {
        let raw = "[Track1] Duration : 10\n[QuickTime] Duration : 12.5\n[Track2] Duration : 11\n";
        assert_eq!(parse_metadata(raw).unwrap().duration, Some(12.5));
    }

    #[test]
    fn falls_back_to_first_duration() {
        let raw = "[Track1] Duration : 10\n[Track2] Duration : 11\n";
        assert_eq!(parse_metadata(raw).unwrap().duration, Some(10.0));
    }

    #[test]
    fn missing_marker_tag_means_no_markers() {
        let meta = parse_metadata("[QuickTime]     Duration : 61\n").unwrap();
        assert!(meta.markers.is_empty());
        assert_eq!(meta.duration, Some(61.0));
    }

    #[test]
    fn repeated_tags_are_concatenated_in_order() {
        let raw = "HighlightMarkers : 5\nHighlightMarkers : 2;8\n";
        assert_eq!(parse_metadata(raw).unwrap().markers, vec![5.0, 2.0, 8.0]);
    }

    #[test]
    fn unrelated_lines_are_ignored() {
        let raw = "======== clip.mp4\n    1 image files read\n[DJI] Model : FC3582\nHighlightMarkers: 12.5\n";
        let meta = parse_metadata(raw).unwrap();
        assert_eq!(meta.markers, vec![12.5]);
        assert_eq!(meta.duration, None);
    }

    #[test]
    fn clock_and_suffixed_values() {
        assert_eq!(parse_time_value("1:30").unwrap(), 90.0);
        assert_eq!(parse_time_value("1:02:03.5").unwrap(), 3723.5);
        assert_eq!(parse_time_value("42s").unwrap(), 42.0);
        assert_eq!(parse_time_value("0").unwrap(), 0.0);
    }

    #[test]
    fn malformed_marker_is_a_parse_error() {
        let err = parse_metadata("[DJI] HighlightMarkers : 30, abc, 90\n").unwrap_err();
        match err {
            ChaptermarkError::Parse { token, .. } => assert_eq!(token, "abc"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(parse_time_value("-5").is_err());
        assert!(parse_time_value("1:2:3:4").is_err());
        assert!(parse_time_value("inf").is_err());
    }

    #[test]
    fn clock_fields_past_59_are_rejected() {
        for token in ["1:75", "1:60:00", "0:00:60", "0:60.5"] {
            match parse_time_value(token) {
                Err(ChaptermarkError::Parse { reason, .. }) => {
                    assert_eq!(reason, "clock field out of range", "{token}")
                }
                other => panic!("{token} parsed as {other:?}"),
            }
        }
        assert_eq!(parse_time_value("75").unwrap(), 75.0);
        assert_eq!(parse_time_value("75:30").unwrap(), 4530.0);
        assert_eq!(parse_time_value("0:59.5").unwrap(), 59.5);
    }

    #[tokio::test]
    async fn read_metadata_reports_exiftool_failure() {
        let runner = FakeRunner {
            exiftool_failure: Some("Error: File not found - gone.mp4".to_string()),
            ..Default::default()
        };
        let err = read_metadata(&runner, &Tools::default(), &PathBuf::from("gone.mp4"))
            .await
            .unwrap_err();
        match err {
            ChaptermarkError::Extract { reason, .. } => assert!(reason.contains("File not found")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn read_metadata_passes_file_to_exiftool() {
        let runner = FakeRunner::default().with_metadata("clip.mp4", DJI_OUTPUT);
        let raw = read_metadata(&runner, &Tools::default(), Path::new("clip.mp4"))
            .await
            .unwrap();
        assert_eq!(raw, DJI_OUTPUT);
        let calls = runner.calls_to("exiftool");
        assert_eq!(calls[0].last().map(String::as_str), Some("clip.mp4"));
        assert!(calls[0].contains(&"-HighlightMarkers".to_string()));
    }
}
