//! yt-dlp backed metadata source

use super::traits::{MetadataSource, ResolvedMedia};
use crate::config::{EngineConfig, ToolsConfig};
use crate::error::{Error, Result};
use crate::tools;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Upper bound on a single metadata extraction; large collections take a while
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(120);

/// Metadata source that runs `yt-dlp -J`
#[derive(Debug, Clone)]
pub struct YtDlpMetadataSource {
    binary_path: PathBuf,
    socket_timeout: Duration,
}

impl YtDlpMetadataSource {
    /// Create a metadata source with an explicit yt-dlp path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            socket_timeout: EngineConfig::default().socket_timeout,
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build from tool configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::NotSupported` when no yt-dlp binary can be located.
    pub fn from_tools(tools_config: &ToolsConfig) -> Result<Self> {
        tools::find_ytdlp(tools_config).map(Self::new).ok_or_else(|| {
            Error::NotSupported(
                "resolving URLs requires the yt-dlp binary. \
                 Configure ytdlp_path in config or ensure yt-dlp is in PATH."
                    .into(),
            )
        })
    }

    /// Override the socket timeout passed to yt-dlp
    #[must_use]
    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    pub(crate) fn build_args(&self, url: &str, flat: bool) -> Vec<String> {
        let mut args = vec!["--dump-single-json".to_string()];
        if flat {
            args.push("--flat-playlist".to_string());
        }
        args.extend([
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout.as_secs().max(1).to_string(),
            "--".to_string(),
            url.to_string(),
        ]);
        args
    }
}

/// Parse yt-dlp's JSON dump
pub(crate) fn parse_metadata(json: &[u8]) -> Result<ResolvedMedia> {
    serde_json::from_slice(json)
        .map_err(|e| Error::Resolution(format!("unexpected yt-dlp output: {}", e)))
}

#[async_trait]
impl MetadataSource for YtDlpMetadataSource {
    async fn extract(&self, url: &str, flat: bool) -> Result<ResolvedMedia> {
        let mut command = Command::new(&self.binary_path);
        command
            .args(self.build_args(url, flat))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(EXTRACT_TIMEOUT, command.output())
            .await
            .map_err(|_| {
                Error::ExternalTool(format!(
                    "yt-dlp metadata extraction timed out after {}s",
                    EXTRACT_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map(|l| l.trim().trim_start_matches("ERROR:").trim().to_string())
                .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status));
            return Err(Error::Resolution(message));
        }

        parse_metadata(&output.stdout)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
