//! Shared run state and event fan-out

use crate::types::{Event, FailureReason, ItemOutcome, LogLevel, RunObserver, RunReport, RunStatus, notify};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Counters and title lists for one run
///
/// Obtained through [`Orchestrator::state`](super::Orchestrator::state) as a snapshot;
/// the live copy is only mutated by the orchestrator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Items in the batch
    pub total_items: usize,
    /// Items with a terminal outcome (skipped, completed, failed, cancelled)
    pub completed_count: usize,
    /// 1-based position of the item most recently started by a worker
    pub current_item_index: usize,
    /// Items handed to the worker pool
    pub dispatched_count: usize,
    /// Titles that failed, in completion order
    pub failed_titles: Vec<String>,
    /// Titles skipped because their output already existed
    pub skipped_titles: Vec<String>,
    /// Whether cancellation has been requested
    pub cancel_requested: bool,
}

/// Delivers events to the observer and to broadcast subscribers
#[derive(Clone)]
pub(crate) struct EventSink {
    event_tx: broadcast::Sender<Event>,
    observer: Option<Arc<dyn RunObserver>>,
}

impl EventSink {
    pub(crate) fn new(
        event_tx: broadcast::Sender<Event>,
        observer: Option<Arc<dyn RunObserver>>,
    ) -> Self {
        Self { event_tx, observer }
    }

    pub(crate) fn emit(&self, event: Event) {
        if let Some(observer) = &self.observer {
            notify(observer.as_ref(), &event);
        }
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    pub(crate) fn log(&self, message: impl Into<String>, level: LogLevel) {
        let message = message.into();
        match level {
            LogLevel::Error => tracing::error!(target: "playlist_dl::run", "{}", message),
            LogLevel::Warning => tracing::warn!(target: "playlist_dl::run", "{}", message),
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(target: "playlist_dl::run", "{}", message)
            }
        }
        self.emit(Event::Log { message, level });
    }

    pub(crate) fn info(&self, message: impl Into<String>) {
        self.log(message, LogLevel::Info);
    }

    pub(crate) fn status(&self, message: impl Into<String>) {
        self.emit(Event::Status {
            message: message.into(),
        });
    }
}

/// Owner of the [`RunState`] for one run
///
/// Every mutation happens under one lock. Progress is emitted after the lock is
/// released, so observers may read [`RunTracker::snapshot`] from their callbacks.
/// Counting mutations come from the run's single control task, which keeps
/// `current` strictly increasing.
pub(crate) struct RunTracker {
    state: Mutex<RunState>,
    sink: EventSink,
    cancel: CancellationToken,
}

impl RunTracker {
    pub(crate) fn new(sink: EventSink, cancel: CancellationToken) -> Self {
        Self {
            state: Mutex::new(RunState::default()),
            sink,
            cancel,
        }
    }

    pub(crate) fn sink(&self) -> &EventSink {
        &self.sink
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        // A panicking observer must not wedge the run
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit_progress(&self, (current, total): (usize, usize)) {
        self.sink.emit(Event::Progress { current, total });
    }

    /// Set the batch size and emit the initial `(0, total)` progress
    pub(crate) fn start(&self, total_items: usize) {
        let progress = {
            let mut state = self.lock();
            state.total_items = total_items;
            (state.completed_count, state.total_items)
        };
        self.emit_progress(progress);
    }

    pub(crate) fn record_skipped(&self, title: &str) {
        let progress = {
            let mut state = self.lock();
            state.skipped_titles.push(title.to_string());
            state.completed_count += 1;
            (state.completed_count, state.total_items)
        };
        self.emit_progress(progress);
    }

    pub(crate) fn record_dispatched(&self) {
        self.lock().dispatched_count += 1;
    }

    pub(crate) fn set_current_item(&self, position: usize) {
        self.lock().current_item_index = position;
    }

    /// Record a worker's terminal outcome
    pub(crate) fn record_outcome(&self, title: &str, outcome: ItemOutcome) {
        let progress = {
            let mut state = self.lock();
            match outcome {
                ItemOutcome::Failed(FailureReason::UserCancelled) => {}
                ItemOutcome::Failed(_) => state.failed_titles.push(title.to_string()),
                ItemOutcome::Skipped => state.skipped_titles.push(title.to_string()),
                ItemOutcome::Completed => {}
            }
            state.completed_count = (state.completed_count + 1).min(state.total_items);
            (state.completed_count, state.total_items)
        };
        self.emit_progress(progress);
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn snapshot(&self) -> RunState {
        let mut state = self.lock().clone();
        state.cancel_requested = self.is_cancel_requested();
        state
    }

    pub(crate) fn report(&self, status: RunStatus) -> RunReport {
        let state = self.snapshot();
        RunReport {
            status,
            total_items: state.total_items,
            completed_count: state.completed_count,
            dispatched_count: state.dispatched_count,
            skipped_titles: state.skipped_titles,
            failed_titles: state.failed_titles,
        }
    }
}
