//! Configuration types for playlist-dl

use crate::error::{Error, Result};
use crate::utils::audio_extension;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Batch scheduling behavior (pool size, throttling, output format)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Number of items fetched concurrently (default: 2)
    ///
    /// The platform rate-limits clients with many parallel fetches.
    #[serde(default = "default_max_concurrent_workers")]
    pub max_concurrent_workers: usize,

    /// Base pause after each submission to the worker pool (default: 1500 ms)
    #[serde(default = "default_submission_delay", with = "duration_ms_serde")]
    pub submission_delay: Duration,

    /// Upper bound of the random jitter added to `submission_delay` (default: 500 ms)
    #[serde(default = "default_submission_jitter", with = "duration_ms_serde")]
    pub submission_jitter: Duration,

    /// Audio codec produced by the engine (default: "mp3")
    ///
    /// One of mp3, aac, alac, m4a, flac, opus, vorbis, wav. The written file's
    /// extension is [`DownloadConfig::file_extension`].
    #[serde(default = "default_audio_format")]
    pub audio_format: String,

    /// Prefix used to build an item URL from its id (default: YouTube watch URL)
    #[serde(default = "default_item_url_base")]
    pub item_url_base: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_workers: default_max_concurrent_workers(),
            submission_delay: default_submission_delay(),
            submission_jitter: default_submission_jitter(),
            audio_format: default_audio_format(),
            item_url_base: default_item_url_base(),
        }
    }
}

impl DownloadConfig {
    /// Extension of the files the engine writes for `audio_format`
    ///
    /// Falls back to the codec name for formats [`Config::validate`] would reject.
    pub fn file_extension(&self) -> &str {
        audio_extension(&self.audio_format).unwrap_or(&self.audio_format)
    }
}

/// Retry configuration for per-item fetch failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per item, first try included (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,

    /// Upper bound of the jitter added to each delay (default: 1 second)
    #[serde(default = "default_max_jitter", with = "duration_ms_serde")]
    pub max_jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
            max_jitter: default_max_jitter(),
        }
    }
}

/// Network tolerances handed to the fetch engine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Socket timeout (default: 30 seconds)
    #[serde(default = "default_socket_timeout", with = "duration_serde")]
    pub socket_timeout: Duration,

    /// Engine-internal retries for a whole request (default: 5)
    #[serde(default = "default_engine_retries")]
    pub retries: u32,

    /// Engine-internal retries per media fragment (default: 5)
    #[serde(default = "default_engine_retries")]
    pub fragment_retries: u32,

    /// Fragments fetched in parallel within one item (default: 3)
    #[serde(default = "default_concurrent_fragments")]
    pub concurrent_fragments: u32,

    /// HTTP chunk size in bytes (default: 10 MiB)
    #[serde(default = "default_http_chunk_size")]
    pub http_chunk_size: u64,

    /// User agent presented to the platform (None = engine default)
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            socket_timeout: default_socket_timeout(),
            retries: default_engine_retries(),
            fragment_retries: default_engine_retries(),
            concurrent_fragments: default_concurrent_fragments(),
            http_chunk_size: default_http_chunk_size(),
            user_agent: None,
        }
    }
}

/// External tool paths (yt-dlp, ffmpeg)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to ffmpeg executable or its directory (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// Main configuration for the [`Orchestrator`](crate::Orchestrator)
///
/// Fields are grouped into sub-configs:
/// - [`download`](DownloadConfig) - pool size, throttling, output format
/// - [`retry`](RetryConfig) - per-item retry policy
/// - [`engine`](EngineConfig) - network tolerances for the fetch engine
/// - [`tools`](ToolsConfig) - external binary paths
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Batch scheduling behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Per-item retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Network tolerances
    #[serde(default)]
    pub engine: EngineConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Check values that would make a run impossible
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_workers == 0 {
            return Err(Error::Config {
                message: "max_concurrent_workers must be at least 1".to_string(),
                key: Some("max_concurrent_workers".to_string()),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config {
                message: "max_attempts must be at least 1".to_string(),
                key: Some("max_attempts".to_string()),
            });
        }
        if audio_extension(&self.download.audio_format).is_none() {
            return Err(Error::Config {
                message: format!(
                    "unsupported audio_format '{}' (expected mp3, aac, alac, m4a, flac, opus, vorbis or wav)",
                    self.download.audio_format
                ),
                key: Some("audio_format".to_string()),
            });
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config {
                message: "backoff_multiplier must be a finite number >= 1.0".to_string(),
                key: Some("backoff_multiplier".to_string()),
            });
        }
        Ok(())
    }
}

fn default_max_concurrent_workers() -> usize {
    2
}

fn default_submission_delay() -> Duration {
    Duration::from_millis(1500)
}

fn default_submission_jitter() -> Duration {
    Duration::from_millis(500)
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_item_url_base() -> String {
    "https://www.youtube.com/watch?v=".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_jitter() -> Duration {
    Duration::from_secs(1)
}

fn default_socket_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_engine_retries() -> u32 {
    5
}

fn default_concurrent_fragments() -> u32 {
    3
}

fn default_http_chunk_size() -> u64 {
    10 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds, for sub-second throttling values)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
