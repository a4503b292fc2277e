//! Batch run lifecycle: resolve, pre-filter, throttled dispatch, drain, summary

use super::Orchestrator;
use super::state::RunTracker;
use super::worker::ItemWorker;
use crate::retry::add_jitter;
use crate::types::{
    BatchRequest, FailureReason, ItemDescriptor, ItemOutcome, LogLevel, RunReport, RunStatus,
};
use crate::utils::output_exists;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Execute one batch run
///
/// Phases:
/// 1. Resolve the source URL (fatal on failure)
/// 2. Prepare the output directory and publish the initial `(0, total)` progress
/// 3. Pre-filter items whose output already exists, in resolver order
/// 4. Submit the rest to the worker pool with a throttle between submissions
/// 5. Drain the pool, recording outcomes as they complete
/// 6. Publish the summary and final status
pub(crate) async fn execute(
    orchestrator: &Orchestrator,
    request: &BatchRequest,
    tracker: Arc<RunTracker>,
) -> RunReport {
    let sink = tracker.sink().clone();
    let url = request.source_url.trim();

    // Phase 1: resolution
    sink.info(format!("Processing URL: {}", url));
    sink.status("Resolving URL...");
    let batch = match orchestrator.resolver.resolve_batch(url).await {
        Ok(batch) => batch,
        Err(e) => {
            sink.log(format!("Error during download: {}", e), LogLevel::Error);
            sink.status("Failed");
            return RunReport::failed(e);
        }
    };

    let total = batch.items.len();
    if batch.is_collection {
        sink.info(format!("Found playlist with {} videos", total));
        sink.status(format!("Processing playlist ({} videos)", total));
    } else {
        sink.info("Found single video");
        sink.status("Processing video");
    }

    // Phase 2: output directory and initial progress
    if let Err(e) = tokio::fs::create_dir_all(&request.output_dir).await {
        tracing::error!(dir = %request.output_dir.display(), error = %e, "failed to create output directory");
        sink.log(
            format!("Error during download: cannot create output folder: {}", e),
            LogLevel::Error,
        );
        sink.status("Failed");
        return RunReport::failed(crate::Error::Io(e));
    }
    tracker.start(total);

    // Phase 3: pre-filter
    let ext = orchestrator.config.download.file_extension();
    let mut pending: Vec<(usize, ItemDescriptor)> = Vec::with_capacity(total);
    for (index, item) in batch.items.into_iter().enumerate() {
        if request.skip_existing && output_exists(&request.output_dir, &item.title, ext) {
            sink.info(format!("⊘ Skipped (already exists): {}", item.title));
            tracker.record_skipped(&item.title);
        } else {
            pending.push((index + 1, item));
        }
    }

    // Phase 4: throttled dispatch
    let worker = ItemWorker {
        config: orchestrator.config.clone(),
        engine: orchestrator.engine.clone(),
        tracker: tracker.clone(),
        output_dir: request.output_dir.clone(),
        quality: request.quality,
        total_items: total,
    };
    let download = &orchestrator.config.download;
    let pool = Arc::new(Semaphore::new(download.max_concurrent_workers.max(1)));
    let cancel = tracker.cancel_token().clone();
    let mut workers = JoinSet::new();
    let mut titles = HashMap::new();

    let submissions = pending.len();
    for (submitted, (position, item)) in pending.into_iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(submitted, "cancellation requested, stopping submissions");
            break;
        }

        let title = item.title.clone();
        let worker = worker.clone();
        let pool = pool.clone();
        let handle = workers.spawn(async move {
            let Ok(_permit) = pool.acquire_owned().await else {
                return ItemOutcome::Failed(FailureReason::Unknown);
            };
            worker.fetch(position, &item).await
        });
        titles.insert(handle.id(), title);
        tracker.record_dispatched();

        // Pause after each submission regardless of pool occupancy; none after the last
        if submitted + 1 < submissions {
            let delay = download.submission_delay + add_jitter(download.submission_jitter);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    // Phase 5: drain
    while let Some(joined) = workers.join_next_with_id().await {
        let (task_id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(e) => {
                tracing::error!(error = %e, "worker task failed");
                (e.id(), ItemOutcome::Failed(FailureReason::Unknown))
            }
        };
        let title = titles.remove(&task_id).unwrap_or_default();
        tracker.record_outcome(&title, outcome);
    }

    // Phase 6: summary
    if tracker.is_cancel_requested() {
        sink.log("Download cancelled by user", LogLevel::Warning);
        sink.status("Cancelled");
        return tracker.report(RunStatus::Cancelled);
    }

    let report = tracker.report(RunStatus::Completed);
    sink.log("All downloads completed!", LogLevel::Success);
    if !report.skipped_titles.is_empty() {
        sink.info(format!(
            "Skipped {} existing files",
            report.skipped_titles.len()
        ));
    }
    if !report.failed_titles.is_empty() {
        sink.log(
            format!(
                "Failed to download {} videos: {}",
                report.failed_titles.len(),
                report.failed_titles.join(", ")
            ),
            LogLevel::Warning,
        );
    }
    sink.status("Completed");
    report
}
