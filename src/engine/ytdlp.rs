//! yt-dlp + FFmpeg fetch engine

use super::progress::{parse_progress_line, summarize_stderr};
use super::traits::{EnginePhase, EngineProgress, FetchEngine, FetchOptions, ProgressCallback};
use crate::config::ToolsConfig;
use crate::error::EngineError;
use crate::tools;
use crate::utils::engine_output_template;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Progress line layout requested from yt-dlp: `playlist-dl|percent|speed|filename`
pub(crate) const PROGRESS_TEMPLATE: &str = "download:playlist-dl|%(progress._percent_str)s|%(progress._speed_str)s|%(progress.filename)s";

/// Fetch engine that shells out to `yt-dlp`, which uses FFmpeg for audio extraction
///
/// # Examples
///
/// ```no_run
/// use playlist_dl::engine::YtDlpEngine;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let engine = YtDlpEngine::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let engine = YtDlpEngine::from_path().expect("yt-dlp not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    binary_path: PathBuf,
    ffmpeg_location: Option<PathBuf>,
}

impl YtDlpEngine {
    /// Create an engine with an explicit yt-dlp path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            ffmpeg_location: None,
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build from tool configuration: explicit paths first, then PATH lookup
    ///
    /// # Errors
    ///
    /// Returns `Error::NotSupported` when no yt-dlp binary can be located.
    pub fn from_tools(tools_config: &ToolsConfig) -> crate::Result<Self> {
        let binary_path = tools::find_ytdlp(tools_config).ok_or_else(|| {
            crate::Error::NotSupported(
                "fetching requires the yt-dlp binary. \
                 Configure ytdlp_path in config or ensure yt-dlp is in PATH."
                    .into(),
            )
        })?;
        let engine = Self::new(binary_path);
        Ok(match tools::ffmpeg_location(tools_config) {
            Some(location) => engine.with_ffmpeg_location(location),
            None => engine,
        })
    }

    /// Pass an explicit FFmpeg location to yt-dlp
    #[must_use]
    pub fn with_ffmpeg_location(mut self, location: PathBuf) -> Self {
        self.ffmpeg_location = Some(location);
        self
    }

    /// Command-line arguments for one item
    pub(crate) fn build_args(&self, url: &str, options: &FetchOptions) -> Vec<String> {
        let mut args = vec![
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            options.audio_format.clone(),
            "--audio-quality".to_string(),
            format!("{}K", options.quality.kbps()),
            "--output".to_string(),
            engine_output_template(&options.output_dir, &options.file_stem),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "--socket-timeout".to_string(),
            options.socket_timeout.as_secs().max(1).to_string(),
            "--retries".to_string(),
            options.retries.to_string(),
            "--fragment-retries".to_string(),
            options.fragment_retries.to_string(),
            "--concurrent-fragments".to_string(),
            options.concurrent_fragments.max(1).to_string(),
            "--http-chunk-size".to_string(),
            options.http_chunk_size.to_string(),
            "--skip-unavailable-fragments".to_string(),
        ];

        if let Some(location) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(location.to_string_lossy().into_owned());
        }
        if let Some(user_agent) = &options.user_agent {
            args.push("--user-agent".to_string());
            args.push(user_agent.clone());
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl FetchEngine for YtDlpEngine {
    async fn fetch_and_transcode(
        &self,
        url: &str,
        options: &FetchOptions,
        on_progress: ProgressCallback<'_>,
    ) -> Result<(), EngineError> {
        let mut child = Command::new(&self.binary_path)
            .args(self.build_args(url, options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::new(format!("Failed to execute yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::new("yt-dlp stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::new("yt-dlp stderr was not captured"))?;

        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                collected.push(line);
            }
            collected
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(progress) = parse_progress_line(&line) {
                on_progress(progress);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| EngineError::new(format!("yt-dlp process failed: {}", e)))?;
        let stderr_lines = stderr_task.await.unwrap_or_default();

        if status.success() {
            return Ok(());
        }

        on_progress(EngineProgress::phase(EnginePhase::Error));
        let message = summarize_stderr(&stderr_lines).unwrap_or_else(|| match status.code() {
            Some(code) => format!("yt-dlp exited with code {}", code),
            None => "yt-dlp terminated by signal".to_string(),
        });
        tracing::debug!(url, error = %message, "yt-dlp failed");
        Err(EngineError::new(message))
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::AudioQuality;
    use std::path::Path;

    fn options(stem: &str) -> FetchOptions {
        FetchOptions::from_config(
            &Config::default(),
            AudioQuality::Kbps256,
            PathBuf::from("/music"),
            stem.to_string(),
        )
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> &'a str {
        let pos = args.iter().position(|a| a == flag).expect("flag missing");
        &args[pos + 1]
    }

    #[test]
    fn args_request_audio_extraction_at_selected_bitrate() {
        let engine = YtDlpEngine::new(PathBuf::from("yt-dlp"));
        let args = engine.build_args("https://www.youtube.com/watch?v=abc", &options("Song"));

        assert_eq!(value_after(&args, "--format"), "bestaudio/best");
        assert!(args.contains(&"--extract-audio".to_string()));
        assert_eq!(value_after(&args, "--audio-format"), "mp3");
        assert_eq!(value_after(&args, "--audio-quality"), "256K");
        assert_eq!(
            Path::new(value_after(&args, "--output")),
            Path::new("/music/Song.%(ext)s")
        );
    }

    #[test]
    fn args_carry_network_tolerances() {
        let engine = YtDlpEngine::new(PathBuf::from("yt-dlp"));
        let args = engine.build_args("https://x.test/v", &options("Song"));

        assert_eq!(value_after(&args, "--socket-timeout"), "30");
        assert_eq!(value_after(&args, "--retries"), "5");
        assert_eq!(value_after(&args, "--fragment-retries"), "5");
        assert_eq!(value_after(&args, "--concurrent-fragments"), "3");
        assert_eq!(value_after(&args, "--http-chunk-size"), "10485760");
    }

    #[test]
    fn url_comes_last_after_option_terminator() {
        let engine = YtDlpEngine::new(PathBuf::from("yt-dlp"))
            .with_ffmpeg_location(PathBuf::from("/opt/ffmpeg/bin"));
        let args = engine.build_args("https://x.test/-weird", &options("Song"));

        assert_eq!(args[args.len() - 2], "--");
        assert_eq!(args[args.len() - 1], "https://x.test/-weird");
        assert_eq!(value_after(&args, "--ffmpeg-location"), "/opt/ffmpeg/bin");
        assert!(!args.contains(&"--user-agent".to_string()));
    }

    #[test]
    fn percent_in_stem_is_escaped_in_template() {
        let engine = YtDlpEngine::new(PathBuf::from("yt-dlp"));
        let args = engine.build_args("https://x.test/v", &options("100% Hits"));
        assert_eq!(
            Path::new(value_after(&args, "--output")),
            Path::new("/music/100%% Hits.%(ext)s")
        );
    }

    #[tokio::test]
    async fn test_invalid_binary_path_yields_engine_error() {
        let engine = YtDlpEngine::new(PathBuf::from("/nonexistent/path/to/yt-dlp"));
        let result = engine
            .fetch_and_transcode("https://x.test/v", &options("Song"), &|_| {})
            .await;

        let err = result.expect_err("spawn should fail");
        assert!(err.message.contains("Failed to execute yt-dlp"));
    }

    #[test]
    fn from_path_consistent_with_which() {
        assert_eq!(
            which::which("yt-dlp").is_ok(),
            YtDlpEngine::from_path().is_some()
        );
    }

    #[test]
    fn from_tools_honours_explicit_path() {
        let tools_config = ToolsConfig {
            ytdlp_path: Some(PathBuf::from("/custom/yt-dlp")),
            ffmpeg_path: None,
            search_path: false,
        };
        let engine = YtDlpEngine::from_tools(&tools_config).unwrap();
        assert_eq!(engine.binary_path, PathBuf::from("/custom/yt-dlp"));
    }

    #[test]
    fn from_tools_without_path_search_is_not_supported() {
        let tools_config = ToolsConfig {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: false,
        };
        assert!(matches!(
            YtDlpEngine::from_tools(&tools_config),
            Err(crate::Error::NotSupported(_))
        ));
    }

    #[cfg(feature = "live-tests")]
    #[tokio::test]
    async fn live_fetch_writes_single_output_file() {
        let Some(engine) = YtDlpEngine::from_path() else {
            println!("Skipping test: yt-dlp binary not found in PATH");
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options("live-test");
        opts.output_dir = dir.path().to_path_buf();

        engine
            .fetch_and_transcode("https://www.youtube.com/watch?v=jNQXAC9IVRw", &opts, &|_| {})
            .await
            .unwrap();

        assert!(dir.path().join("live-test.mp3").is_file());
    }
}
