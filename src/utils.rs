//! Utility functions for output naming and URL handling
//!
//! Output naming goes through [`sanitize_title`] in exactly one place ([`output_path`]),
//! so the existence check before a run and the file the engine writes never diverge.

use std::path::{Path, PathBuf};
use url::Url;

/// Characters that are invalid in filenames on at least one supported platform
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Name used when a title sanitizes to nothing
const EMPTY_TITLE_FALLBACK: &str = "untitled";

/// Make a title safe to use as a file stem
///
/// Replaces `<>:"/\|?*` and control characters with `_`, then strips trailing
/// dots and spaces (rejected by Windows).
///
/// # Examples
///
/// ```
/// use playlist_dl::utils::sanitize_title;
///
/// assert_eq!(sanitize_title("AC/DC: Live?"), "AC_DC_ Live_");
/// assert_eq!(sanitize_title("Ending. "), "Ending");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        EMPTY_TITLE_FALLBACK.to_string()
    } else {
        trimmed.to_string()
    }
}

/// File extension yt-dlp gives an extracted audio file of `format`
///
/// `None` for formats whose extension depends on the source stream (`best`) or that
/// yt-dlp cannot extract to.
///
/// ```
/// use playlist_dl::utils::audio_extension;
///
/// assert_eq!(audio_extension("mp3"), Some("mp3"));
/// assert_eq!(audio_extension("aac"), Some("m4a"));
/// assert_eq!(audio_extension("best"), None);
/// ```
pub fn audio_extension(format: &str) -> Option<&'static str> {
    match format {
        "mp3" => Some("mp3"),
        "aac" | "alac" | "m4a" => Some("m4a"),
        "flac" => Some("flac"),
        "opus" => Some("opus"),
        "vorbis" => Some("ogg"),
        "wav" => Some("wav"),
        _ => None,
    }
}

/// Final output path for an item: `{output_dir}/{sanitized_title}.{ext}`
pub fn output_path(output_dir: &Path, title: &str, ext: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", sanitize_title(title), ext))
}

/// Whether the output file for `title` already exists
pub fn output_exists(output_dir: &Path, title: &str, ext: &str) -> bool {
    output_path(output_dir, title, ext).is_file()
}

/// Output template handed to yt-dlp for an item
///
/// The stem is the sanitized title with `%` doubled so yt-dlp does not treat it as a
/// field reference; the extension is left to yt-dlp (`%(ext)s`), which resolves to the
/// converted audio format.
pub fn engine_output_template(output_dir: &Path, title: &str) -> String {
    let stem = sanitize_title(title).replace('%', "%%");
    output_dir
        .join(format!("{}.%(ext)s", stem))
        .to_string_lossy()
        .into_owned()
}

/// Parse a URL and require an `http` or `https` scheme
pub fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// Extract an item id from a single-item URL
///
/// Uses the `v` query parameter when present (`watch?v=ID`), otherwise the last
/// non-empty path segment (`youtu.be/ID`, `/shorts/ID`).
///
/// # Examples
///
/// ```
/// use playlist_dl::utils::extract_item_id;
///
/// assert_eq!(
///     extract_item_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10").as_deref(),
///     Some("dQw4w9WgXcQ")
/// );
/// assert_eq!(extract_item_id("https://youtu.be/abc123").as_deref(), Some("abc123"));
/// ```
pub fn extract_item_id(raw: &str) -> Option<String> {
    let url = parse_http_url(raw)?;

    if let Some((_, value)) = url.query_pairs().find(|(key, _)| key == "v") {
        if !value.is_empty() {
            return Some(value.into_owned());
        }
    }

    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()
        .filter(|segment| *segment != "watch")
        .map(str::to_string)
}
