//! # playlist-dl
//!
//! Library for batch downloading of online video playlists as audio files.
//!
//! ## Design Philosophy
//!
//! playlist-dl is designed to be:
//! - **Polite to the platform** - Small worker pool and throttled submissions by default
//! - **Sensible defaults** - Works out of the box with yt-dlp and FFmpeg installed
//! - **Library-first** - No CLI or UI, front ends plug in through observers and events
//! - **Restartable** - Files already present are skipped, so re-running a playlist is cheap
//!
//! ## Quick Start
//!
//! ```no_run
//! use playlist_dl::{AudioQuality, BatchRequest, Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::from_config(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = orchestrator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let request = BatchRequest::new(
//!         "https://www.youtube.com/playlist?list=PL0123456789",
//!         "/home/me/Music/playlist-dl",
//!     )
//!     .with_quality(AudioQuality::Kbps256);
//!
//!     let report = orchestrator.run(request).await;
//!     println!("{:?}", report.status);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Fetch-and-transcode engine
pub mod engine;
/// Error types
pub mod error;
/// Batch orchestration
pub mod orchestrator;
/// URL resolution into items
pub mod resolver;
/// Retry logic with exponential backoff
pub mod retry;
/// Last-used settings persistence
pub mod settings;
/// External binary discovery
pub mod tools;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, EngineConfig, RetryConfig, ToolsConfig};
pub use engine::{FetchEngine, FetchOptions, YtDlpEngine};
pub use error::{EngineError, Error, Result};
pub use orchestrator::{Orchestrator, RunState};
pub use resolver::{ItemResolver, MetadataSource, YtDlpMetadataSource};
pub use settings::Settings;
pub use types::{
    AudioQuality, BatchRequest, Event, FailureReason, ItemDescriptor, ItemOutcome, LogLevel,
    RunObserver, RunReport, RunStatus,
};

/// Run a batch, cancelling it when a termination signal arrives.
///
/// The run still drains its in-flight items after the signal; the returned report
/// then has [`RunStatus::Cancelled`].
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use playlist_dl::{BatchRequest, Config, Orchestrator, run_until_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let orchestrator = Orchestrator::from_config(Config::default())?;
///     let request = BatchRequest::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "./out");
///
///     let report = run_until_signal(&orchestrator, request).await;
///     println!("{:?}", report.status);
///     Ok(())
/// }
/// ```
pub async fn run_until_signal(orchestrator: &Orchestrator, request: BatchRequest) -> RunReport {
    run_until(orchestrator, request, wait_for_signal()).await
}

/// Run a batch, cancelling it when `shutdown` completes first.
///
/// [`run_until_signal`] is this with a termination signal as the shutdown future.
/// After cancellation the run still drains its in-flight items before returning.
pub async fn run_until<F>(orchestrator: &Orchestrator, request: BatchRequest, shutdown: F) -> RunReport
where
    F: std::future::Future<Output = ()>,
{
    let run = orchestrator.run(request);
    tokio::pin!(run);

    tokio::select! {
        report = &mut run => return report,
        () = shutdown => {
            orchestrator.cancel();
        }
    }
    run.await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    async fn next(signal: Option<&mut Signal>) {
        match signal {
            Some(signal) => {
                signal.recv().await;
            }
            None => std::future::pending().await,
        }
    }

    // Registration may fail in restricted environments (containers, tests)
    let mut sigterm = signal(SignalKind::terminate())
        .inspect_err(|e| tracing::warn!(error = %e, "could not listen for SIGTERM"))
        .ok();
    let mut sigint = signal(SignalKind::interrupt())
        .inspect_err(|e| tracing::warn!(error = %e, "could not listen for SIGINT"))
        .ok();

    if sigterm.is_none() && sigint.is_none() {
        tracing::error!("no signal handlers registered, using ctrl_c fallback");
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        return;
    }

    tokio::select! {
        () = next(sigterm.as_mut()) => tracing::info!("received SIGTERM, cancelling run"),
        () = next(sigint.as_mut()) => tracing::info!("received SIGINT (Ctrl+C), cancelling run"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal, cancelling run");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            // Never resolve, so a broken listener does not cancel the run
            std::future::pending::<()>().await;
        }
    }
}
