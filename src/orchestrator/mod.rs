//! Batch download orchestration
//!
//! The [`Orchestrator`] drives a run end to end:
//! - [`run`] - resolve, pre-filter, throttled dispatch and summary
//! - [`worker`] - per-item fetch with retry and failure classification
//! - [`state`] - the shared [`RunState`] and event fan-out
//!
//! Only one run is active per orchestrator at a time. [`Orchestrator::cancel`] may be
//! called from any task (or an observer callback) while a run is in progress.

mod run;
pub mod state;
mod worker;


pub use state::RunState;

use crate::config::Config;
use crate::engine::{FetchEngine, YtDlpEngine};
use crate::error::Result;
use crate::resolver::{ItemResolver, MetadataSource, YtDlpMetadataSource};
use crate::settings::Settings;
use crate::types::{BatchRequest, Event, RunObserver, RunReport};
use state::{EventSink, RunTracker};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Handles of the run currently in progress
struct ActiveRun {
    tracker: Arc<RunTracker>,
}

/// Clears the active-run slot when a run ends, even if the run future is dropped
struct ActiveRunGuard<'a> {
    slot: &'a Mutex<Option<ActiveRun>>,
}

impl Drop for ActiveRunGuard<'_> {
    fn drop(&mut self) {
        *lock_slot(self.slot) = None;
    }
}

fn lock_slot(slot: &Mutex<Option<ActiveRun>>) -> MutexGuard<'_, Option<ActiveRun>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Orchestrates batch downloads of a playlist or single item
///
/// Cheap to clone; clones share the event channel and the active run.
///
/// # Example
///
/// ```no_run
/// use playlist_dl::{BatchRequest, Config, Orchestrator};
///
/// # async fn example() -> playlist_dl::Result<()> {
/// let orchestrator = Orchestrator::from_config(Config::default())?;
///
/// let mut events = orchestrator.subscribe();
/// tokio::spawn(async move {
///     while let Ok(event) = events.recv().await {
///         println!("{:?}", event);
///     }
/// });
///
/// let request = BatchRequest::new(
///     "https://www.youtube.com/playlist?list=PL0123456789",
///     "/home/me/Music",
/// );
/// let report = orchestrator.run(request).await;
/// println!("{} of {} items done", report.completed_count, report.total_items);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) config: Arc<Config>,
    pub(crate) resolver: ItemResolver,
    pub(crate) engine: Arc<dyn FetchEngine>,
    event_tx: broadcast::Sender<Event>,
    observer: Option<Arc<dyn RunObserver>>,
    active_run: Arc<Mutex<Option<ActiveRun>>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("resolver", &self.resolver)
            .field("engine", &self.engine.name())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator over explicit collaborators
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the configuration fails validation.
    pub fn new(
        config: Config,
        source: Arc<dyn MetadataSource>,
        engine: Arc<dyn FetchEngine>,
    ) -> Result<Self> {
        config.validate()?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::info!(
            workers = config.download.max_concurrent_workers,
            max_attempts = config.retry.max_attempts,
            resolver = source.name(),
            engine = engine.name(),
            "orchestrator initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            resolver: ItemResolver::new(source),
            engine,
            event_tx,
            observer: None,
            active_run: Arc::new(Mutex::new(None)),
        })
    }

    /// Create an orchestrator backed by yt-dlp, located through `config.tools`
    ///
    /// # Errors
    ///
    /// `Error::NotSupported` when yt-dlp cannot be found, `Error::Config` on invalid
    /// configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let source = YtDlpMetadataSource::from_tools(&config.tools)?
            .with_socket_timeout(config.engine.socket_timeout);
        let engine = YtDlpEngine::from_tools(&config.tools)?;
        Self::new(config, Arc::new(source), Arc::new(engine))
    }

    /// Attach an observer receiving log, status and progress callbacks
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Subscribe to run events
    ///
    /// Slow subscribers may miss events (`RecvError::Lagged`); the observer does not.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a batch to completion or cancellation
    ///
    /// Never returns an error: run-fatal problems (invalid URL, resolution failure) are
    /// reported as [`RunStatus::Failed`](crate::RunStatus::Failed) and per-item failures
    /// are listed in the report.
    pub async fn run(&self, request: BatchRequest) -> RunReport {
        let sink = EventSink::new(self.event_tx.clone(), self.observer.clone());
        let tracker = Arc::new(RunTracker::new(sink, CancellationToken::new()));

        {
            let mut slot = lock_slot(&self.active_run);
            if slot.is_some() {
                tracing::warn!(url = %request.source_url, "run rejected, another run is active");
                return RunReport::failed("run already in progress");
            }
            *slot = Some(ActiveRun {
                tracker: tracker.clone(),
            });
        }
        let _guard = ActiveRunGuard {
            slot: &self.active_run,
        };

        tracing::info!(
            url = %request.source_url,
            output_dir = %request.output_dir.display(),
            quality = %request.quality,
            skip_existing = request.skip_existing,
            "starting batch run"
        );
        let report = run::execute(self, &request, tracker).await;
        tracing::info!(
            status = ?report.status,
            completed = report.completed_count,
            total = report.total_items,
            failed = report.failed_titles.len(),
            "batch run finished"
        );
        report
    }

    /// Persist `request` to the settings file, then run it
    ///
    /// Failure to write the settings is logged and does not affect the run.
    pub async fn run_and_remember(&self, request: BatchRequest, settings_path: &Path) -> RunReport {
        if let Err(e) = Settings::from_request(&request).save(settings_path) {
            tracing::warn!(path = %settings_path.display(), error = %e, "failed to save settings");
        }
        self.run(request).await
    }

    /// Request cancellation of the active run
    ///
    /// Idempotent. No further items are submitted; running workers finish their current
    /// engine call and abandon remaining retries. Does nothing when no run is active.
    pub fn cancel(&self) {
        if let Some(active) = lock_slot(&self.active_run).as_ref() {
            if !active.tracker.is_cancel_requested() {
                tracing::info!("cancellation requested");
            }
            active.tracker.request_cancel();
        }
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        lock_slot(&self.active_run).is_some()
    }

    /// Snapshot of the active run's state, if any
    pub fn state(&self) -> Option<RunState> {
        lock_slot(&self.active_run)
            .as_ref()
            .map(|active| active.tracker.snapshot())
    }
}
