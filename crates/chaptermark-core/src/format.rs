use crate::{
    error::{ChaptermarkError, Result},
    types::Chapter,
};

pub const FFMETADATA_HEADER: &str = ";FFMETADATA1";

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Format a marker offset the way it is shown in the console and run log:
/// `M:SS`, or `H:MM:SS` from one hour on.
pub fn format_marker_label(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, mins, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Render chapters in ffmpeg's metadata format, one `[CHAPTER]` block each,
/// with millisecond timestamps.
pub fn render_ffmetadata(chapters: &[Chapter]) -> String {
    let mut output = String::new();
    output.push_str(FFMETADATA_HEADER);
    output.push('\n');

    for (i, chapter) in chapters.iter().enumerate() {
        output.push_str("[CHAPTER]\n");
        output.push_str("TIMEBASE=1/1000\n");
        output.push_str(&format!("START={}\n", to_millis(chapter.start)));
        output.push_str(&format!("END={}\n", to_millis(chapter.end)));
        output.push_str(&format!(
            "title={}\n\n",
            escape_value(&safe_title(&chapter.title, i + 1))
        ));
    }

    output
}

/// Seconds to the whole-millisecond ticks written in the chapter file.
pub(crate) fn to_millis(seconds: f64) -> u64 {
    (seconds * 1000.0).round() as u64
}

/// Titles that cannot be written on one line fall back to `Chapter N`.
fn safe_title(title: &str, number: usize) -> String {
    if title.trim().is_empty() || title.chars().any(char::is_control) {
        format!("Chapter {}", number)
    } else {
        title.to_string()
    }
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '=' | ';' | '#' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Read back a file produced by [`render_ffmetadata`].
pub fn parse_ffmetadata(text: &str) -> Result<Vec<Chapter>> {
    let mut lines = text.lines();
    if lines.next().map(str::trim_end) != Some(FFMETADATA_HEADER) {
        return Err(malformed(text.lines().next().unwrap_or(""), "missing header"));
    }

    let mut chapters = Vec::new();
    let mut current: Option<PendingChapter> = None;

    for line in lines {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            if let Some(pending) = current.take() {
                chapters.push(pending.finish()?);
            }
            if line == "[CHAPTER]" {
                current = Some(PendingChapter::default());
            }
            continue;
        }

        let Some(chapter) = current.as_mut() else {
            continue;
        };
        let (key, value) = split_key_value(line).ok_or_else(|| malformed(line, "expected key=value"))?;
        match key.as_str() {
            "TIMEBASE" => chapter.timebase = Some(parse_timebase(&value)?),
            "START" => chapter.start = Some(parse_ticks(&value)?),
            "END" => chapter.end = Some(parse_ticks(&value)?),
            "title" => chapter.title = Some(value),
            _ => {}
        }
    }

    if let Some(pending) = current.take() {
        chapters.push(pending.finish()?);
    }
    Ok(chapters)
}

#[derive(Default)]
struct PendingChapter {
    timebase: Option<(u64, u64)>,
    start: Option<u64>,
    end: Option<u64>,
    title: Option<String>,
}

impl PendingChapter {
    fn finish(self) -> Result<Chapter> {
        let (num, den) = self.timebase.unwrap_or((1, 1_000_000_000));
        let scale = |ticks: u64| ticks as f64 * num as f64 / den as f64;
        let start = self.start.ok_or_else(|| malformed("[CHAPTER]", "missing START"))?;
        let end = self.end.ok_or_else(|| malformed("[CHAPTER]", "missing END"))?;
        Ok(Chapter {
            start: scale(start),
            end: scale(end),
            title: self.title.unwrap_or_default(),
        })
    }
}

/// Split on the first unescaped `=` and unescape both halves.
fn split_key_value(line: &str) -> Option<(String, String)> {
    let mut key = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        let target = if in_value { &mut value } else { &mut key };
        match c {
            '\\' => target.push(chars.next()?),
            '=' if !in_value => in_value = true,
            _ => target.push(c),
        }
    }

    in_value.then_some((key, value))
}

fn parse_timebase(value: &str) -> Result<(u64, u64)> {
    let (num, den) = value
        .split_once('/')
        .ok_or_else(|| malformed(value, "timebase must be num/den"))?;
    let num = num.trim().parse().map_err(|_| malformed(value, "bad timebase"))?;
    let den: u64 = den.trim().parse().map_err(|_| malformed(value, "bad timebase"))?;
    if den == 0 {
        return Err(malformed(value, "zero timebase denominator"));
    }
    Ok((num, den))
}

fn parse_ticks(value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| malformed(value, "not an integer tick count"))
}

fn malformed(token: &str, reason: &str) -> ChaptermarkError {
    ChaptermarkError::Parse {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}
