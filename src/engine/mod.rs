//! Fetch-and-transcode engine
//!
//! The orchestrator hands each item to a [`FetchEngine`], which downloads the best
//! audio stream and converts it to the configured format. [`YtDlpEngine`] drives the
//! `yt-dlp` CLI (with FFmpeg for extraction); tests substitute scripted engines.

mod progress;
mod traits;
mod ytdlp;

pub use traits::{EnginePhase, EngineProgress, FetchEngine, FetchOptions, ProgressCallback};
pub use ytdlp::YtDlpEngine;
