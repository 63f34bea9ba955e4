use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{ChaptermarkError, Result},
    format::{format_timestamp, to_millis},
    types::Chapter,
};

/// How chapter titles are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleStyle {
    /// `Chapter 3`
    #[default]
    Numbered,
    /// `Chapter 3 (01:30)`
    Timestamped,
}

impl TitleStyle {
    pub fn title(&self, number: usize, start: f64) -> String {
        match self {
            TitleStyle::Numbered => format!("Chapter {}", number),
            TitleStyle::Timestamped => {
                format!("Chapter {} ({})", number, format_timestamp(start))
            }
        }
    }
}

/// Turn highlight markers into chapters covering `[0, duration)`.
///
/// The first chapter always starts at 0 and every marker opens a new chapter.
/// Markers are taken in camera order. A marker is dropped when it does not
/// move strictly forward, or when it is at or past the end of the file.
/// Both checks are made on the millisecond ticks the chapter file is written
/// in, so no chapter can be empty there either. A marker at 0 merges into the
/// first chapter.
///
/// An empty marker list yields no chapters; callers skip such files.
pub fn build_chapters(markers: &[f64], duration: f64, style: TitleStyle) -> Result<Vec<Chapter>> {
    if !duration.is_finite() || to_millis(duration) == 0 {
        return Err(ChaptermarkError::Parse {
            token: duration.to_string(),
            reason: "invalid duration".to_string(),
        });
    }
    if markers.is_empty() {
        return Ok(Vec::new());
    }

    let end_ms = to_millis(duration);
    let mut starts = vec![0.0];
    for &marker in markers {
        let previous = starts[starts.len() - 1];
        let marker_ms = to_millis(marker);
        if marker_ms > to_millis(previous) && marker_ms < end_ms {
            starts.push(marker);
        } else {
            debug!(marker, previous, duration, "dropping marker");
        }
    }

    let chapters = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(duration);
            Chapter {
                start,
                end,
                title: style.title(i + 1, start),
            }
        })
        .collect();

    Ok(chapters)
}
