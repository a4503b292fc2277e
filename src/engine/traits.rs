//! Traits and types for the fetch-and-transcode engine

use crate::config::{Config, EngineConfig};
use crate::error::EngineError;
use crate::types::AudioQuality;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// Everything the engine needs to fetch and convert one item
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Output audio codec (e.g. "mp3", "aac")
    pub audio_format: String,
    /// Extension of the converted file (e.g. "mp3", "m4a")
    pub file_extension: String,
    /// Target bitrate
    pub quality: AudioQuality,
    /// Directory receiving the converted file
    pub output_dir: PathBuf,
    /// Sanitized file stem; the engine writes `{output_dir}/{file_stem}.{file_extension}`
    pub file_stem: String,
    /// Socket timeout
    pub socket_timeout: Duration,
    /// Engine-internal request retries
    pub retries: u32,
    /// Engine-internal fragment retries
    pub fragment_retries: u32,
    /// Fragments fetched in parallel
    pub concurrent_fragments: u32,
    /// HTTP chunk size in bytes
    pub http_chunk_size: u64,
    /// User agent override
    pub user_agent: Option<String>,
}

impl FetchOptions {
    /// Build options from the crate configuration for one output target
    pub fn from_config(
        config: &Config,
        quality: AudioQuality,
        output_dir: PathBuf,
        file_stem: String,
    ) -> Self {
        let EngineConfig {
            socket_timeout,
            retries,
            fragment_retries,
            concurrent_fragments,
            http_chunk_size,
            user_agent,
        } = config.engine.clone();

        Self {
            audio_format: config.download.audio_format.clone(),
            file_extension: config.download.file_extension().to_string(),
            quality,
            output_dir,
            file_stem,
            socket_timeout,
            retries,
            fragment_retries,
            concurrent_fragments,
            http_chunk_size,
            user_agent,
        }
    }
}

/// Stage reported by the engine's progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    /// Transfer in progress
    Downloading,
    /// Transfer finished; conversion follows
    Finished,
    /// The engine hit an error
    Error,
}

/// One progress report from the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineProgress {
    /// Current stage
    pub phase: EnginePhase,
    /// Transfer percentage (0.0 to 100.0), when known
    pub percent: Option<f32>,
    /// Human-readable speed (e.g. "1.20MiB/s"), when known
    pub speed_text: Option<String>,
    /// File being written, without directories
    pub file_name: Option<String>,
}

impl EngineProgress {
    /// Progress report for a phase with no details
    pub fn phase(phase: EnginePhase) -> Self {
        Self {
            phase,
            percent: None,
            speed_text: None,
            file_name: None,
        }
    }
}

/// Progress sink handed to [`FetchEngine::fetch_and_transcode`]
pub type ProgressCallback<'a> = &'a (dyn Fn(EngineProgress) + Send + Sync);

/// Trait for the external fetch-and-transcode collaborator
///
/// One call downloads one item's best audio stream and converts it according to
/// [`FetchOptions`]. On success exactly one file exists at
/// `{output_dir}/{file_stem}.{file_extension}`; on failure the engine is responsible for
/// not leaving a file under that name.
///
/// Calls are never interrupted by the caller once started.
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// Download and convert one item
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] carrying the engine's error text; the caller
    /// classifies it (access restricted, network, other).
    async fn fetch_and_transcode(
        &self,
        url: &str,
        options: &FetchOptions,
        on_progress: ProgressCallback<'_>,
    ) -> Result<(), EngineError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
