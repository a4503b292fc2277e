//! Parsing of yt-dlp console output

use super::traits::{EnginePhase, EngineProgress};
use std::path::Path;

/// Prefix of lines produced by our `--progress-template`
const PROGRESS_PREFIX: &str = "playlist-dl|";

/// Printed by yt-dlp when the FFmpeg audio extraction step starts
const EXTRACT_AUDIO_PREFIX: &str = "[ExtractAudio] Destination:";

/// Lines of stderr kept when no `ERROR:` line exists
const STDERR_FALLBACK_LINES: usize = 1;

/// Parse one stdout line into a progress report
///
/// Recognizes our progress template (`playlist-dl|  42.0%|1.20MiB/s|/dir/file.webm`) and
/// the `[ExtractAudio] Destination:` line, which marks the end of the transfer.
pub(crate) fn parse_progress_line(line: &str) -> Option<EngineProgress> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(EXTRACT_AUDIO_PREFIX) {
        return Some(EngineProgress {
            phase: EnginePhase::Finished,
            percent: Some(100.0),
            speed_text: None,
            file_name: file_name_of(rest.trim()),
        });
    }

    let rest = line.strip_prefix(PROGRESS_PREFIX)?;
    let mut parts = rest.splitn(3, '|');
    let percent = parts.next().and_then(parse_percent);
    let speed_text = parts.next().and_then(known_value);
    let file_name = parts.next().and_then(known_value).and_then(|f| file_name_of(&f));

    Some(EngineProgress {
        phase: EnginePhase::Downloading,
        percent,
        speed_text,
        file_name,
    })
}

/// Pick the most useful error message out of yt-dlp's stderr
pub(crate) fn summarize_stderr(lines: &[String]) -> Option<String> {
    let errors: Vec<&str> = lines
        .iter()
        .filter_map(|l| l.trim().strip_prefix("ERROR:"))
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if !errors.is_empty() {
        return Some(errors.join("; "));
    }

    let tail: Vec<&str> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    let start = tail.len().saturating_sub(STDERR_FALLBACK_LINES);
    let summary = tail[start..].join("; ");
    (!summary.is_empty()).then_some(summary)
}

fn parse_percent(raw: &str) -> Option<f32> {
    raw.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f32>()
        .ok()
        .map(|p| p.clamp(0.0, 100.0))
}

fn known_value(raw: &str) -> Option<String> {
    let value = raw.trim();
    match value {
        "" | "N/A" | "NA" | "Unknown" => None,
        _ => Some(value.to_string()),
    }
}

fn file_name_of(path: &str) -> Option<String> {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
