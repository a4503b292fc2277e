//! Discovery of the external binaries (yt-dlp, FFmpeg)

use crate::config::ToolsConfig;
use std::path::{Path, PathBuf};

/// Locate the yt-dlp binary
///
/// An explicitly configured path always wins; otherwise PATH is searched when
/// `search_path` is enabled.
pub fn find_ytdlp(tools_config: &ToolsConfig) -> Option<PathBuf> {
    if let Some(ref path) = tools_config.ytdlp_path {
        return Some(path.clone());
    }
    if tools_config.search_path {
        return which::which("yt-dlp").ok();
    }
    None
}

/// Locate FFmpeg for yt-dlp's `--ffmpeg-location`
///
/// Returns `None` when FFmpeg is reachable through PATH (yt-dlp finds it itself) or
/// cannot be found at all. On Windows the usual winget and manual install folders are
/// probed, since those installs often do not update PATH for running sessions.
pub fn ffmpeg_location(tools_config: &ToolsConfig) -> Option<PathBuf> {
    if let Some(ref path) = tools_config.ffmpeg_path {
        return Some(path.clone());
    }
    if !tools_config.search_path {
        return None;
    }
    if which::which("ffmpeg").is_ok() {
        tracing::debug!("ffmpeg found in PATH");
        return None;
    }

    let found = platform_ffmpeg_dirs()
        .into_iter()
        .find(|dir| contains_ffmpeg(dir));
    match &found {
        Some(dir) => tracing::info!(location = %dir.display(), "found ffmpeg outside PATH"),
        None => tracing::warn!("ffmpeg not found; audio conversion will fail"),
    }
    found
}

fn contains_ffmpeg(dir: &Path) -> bool {
    dir.join("ffmpeg.exe").is_file() || dir.join("ffmpeg").is_file()
}

#[cfg(windows)]
fn platform_ffmpeg_dirs() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(local) = dirs::data_local_dir() {
        let packages = local.join("Microsoft").join("WinGet").join("Packages");
        if let Ok(entries) = std::fs::read_dir(&packages) {
            for entry in entries.flatten() {
                if !entry.file_name().to_string_lossy().starts_with("Gyan.FFmpeg") {
                    continue;
                }
                // Package layout: Gyan.FFmpeg_*/ffmpeg-<version>-full_build/bin
                if let Ok(builds) = std::fs::read_dir(entry.path()) {
                    candidates.extend(builds.flatten().map(|build| build.path().join("bin")));
                }
            }
        }
        candidates.push(local.join("Programs").join("ffmpeg").join("bin"));
    }

    candidates.push(PathBuf::from(r"C:\Program Files\FFmpeg\bin"));
    candidates
}

#[cfg(not(windows))]
fn platform_ffmpeg_dirs() -> Vec<PathBuf> {
    Vec::new()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn tools(search_path: bool) -> ToolsConfig {
        ToolsConfig {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path,
        }
    }

    #[test]
    fn explicit_paths_win() {
        let config = ToolsConfig {
            ytdlp_path: Some(PathBuf::from("/opt/yt-dlp")),
            ffmpeg_path: Some(PathBuf::from("/opt/ffmpeg/bin")),
            search_path: false,
        };
        assert_eq!(find_ytdlp(&config), Some(PathBuf::from("/opt/yt-dlp")));
        assert_eq!(ffmpeg_location(&config), Some(PathBuf::from("/opt/ffmpeg/bin")));
    }

    #[test]
    fn disabled_search_finds_nothing() {
        assert_eq!(find_ytdlp(&tools(false)), None);
        assert_eq!(ffmpeg_location(&tools(false)), None);
    }

    #[test]
    fn path_search_matches_which() {
        assert_eq!(find_ytdlp(&tools(true)), which::which("yt-dlp").ok());
    }

    #[test]
    fn ffmpeg_directory_probe() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!contains_ffmpeg(dir.path()));
        std::fs::write(dir.path().join("ffmpeg"), b"").unwrap();
        assert!(contains_ffmpeg(dir.path()));
    }
}
