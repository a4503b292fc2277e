//! Per-item fetch with retry, progress reporting and failure classification

use super::state::RunTracker;
use crate::config::Config;
use crate::engine::{EnginePhase, EngineProgress, FetchEngine, FetchOptions};
use crate::error::EngineError;
use crate::retry::{RetryError, download_with_retry};
use crate::types::{AudioQuality, FailureReason, ItemDescriptor, ItemOutcome, LogLevel};
use crate::utils::{parse_http_url, sanitize_title};
use std::path::PathBuf;
use std::sync::Arc;

/// Characters of the title shown in the status line
const STATUS_TITLE_CHARS: usize = 50;
/// Characters of the engine file name shown in progress status lines
const PROGRESS_NAME_CHARS: usize = 40;
/// Characters of an engine error kept in the failure log line
const ERROR_SUMMARY_CHARS: usize = 100;

/// Everything a worker needs to fetch items of one run
#[derive(Clone)]
pub(crate) struct ItemWorker {
    pub(crate) config: Arc<Config>,
    pub(crate) engine: Arc<dyn FetchEngine>,
    pub(crate) tracker: Arc<RunTracker>,
    pub(crate) output_dir: PathBuf,
    pub(crate) quality: AudioQuality,
    pub(crate) total_items: usize,
}

impl ItemWorker {
    /// Fetch and convert one item; never fails, every error becomes an outcome
    pub(crate) async fn fetch(&self, position: usize, item: &ItemDescriptor) -> ItemOutcome {
        let sink = self.tracker.sink();
        let cancel = self.tracker.cancel_token();
        let title = item.title.as_str();
        let prefix = format!("[{}/{}]", position, self.total_items);

        if cancel.is_cancelled() {
            tracing::debug!(item_id = %item.id, "cancelled before start");
            return ItemOutcome::Failed(FailureReason::UserCancelled);
        }

        self.tracker.set_current_item(position);
        sink.info(format!("{} Downloading: {}", prefix, title));
        sink.status(format!(
            "{} {}...",
            prefix,
            truncate_chars(title, STATUS_TITLE_CHARS)
        ));

        let Some(url) = fetch_url(&self.config, item) else {
            sink.log(
                format!("Skipping item {}: No valid URL", position),
                LogLevel::Warning,
            );
            return ItemOutcome::Failed(FailureReason::Unknown);
        };

        let options = FetchOptions::from_config(
            &self.config,
            self.quality,
            self.output_dir.clone(),
            sanitize_title(title),
        );

        let on_progress = |progress: EngineProgress| {
            let name = progress.file_name.as_deref().unwrap_or(title);
            match progress.phase {
                EnginePhase::Downloading => sink.status(format!(
                    "{} {}... {} @ {}",
                    prefix,
                    truncate_chars(name, PROGRESS_NAME_CHARS),
                    progress
                        .percent
                        .map(|p| format!("{:.1}%", p))
                        .unwrap_or_else(|| "N/A".to_string()),
                    progress.speed_text.as_deref().unwrap_or("N/A"),
                )),
                EnginePhase::Finished => sink.info(format!("Converting: {}", name)),
                EnginePhase::Error => {
                    tracing::debug!(item_id = %item.id, "engine reported an error")
                }
            }
        };

        let retries = self.config.retry.max_attempts.saturating_sub(1);
        let result = download_with_retry(
            &self.config.retry,
            cancel,
            |attempt| {
                tracing::debug!(item_id = %item.id, attempt, engine = self.engine.name(), "fetch attempt");
                self.engine.fetch_and_transcode(&url, &options, &on_progress)
            },
            |_error: &EngineError, retry, delay| {
                sink.log(
                    format!(
                        "Retry {}/{} for {} after {:.1}s",
                        retry,
                        retries,
                        title,
                        delay.as_secs_f64()
                    ),
                    LogLevel::Warning,
                );
            },
        )
        .await;

        match result {
            Ok(()) => {
                sink.log(format!("✓ Completed: {}", title), LogLevel::Success);
                ItemOutcome::Completed
            }
            Err(RetryError::Cancelled) => {
                tracing::info!(item_id = %item.id, "item abandoned after cancellation");
                ItemOutcome::Failed(FailureReason::UserCancelled)
            }
            Err(RetryError::Failed { error, attempts }) => {
                let reason = classify(&error);
                tracing::debug!(item_id = %item.id, attempts, ?reason, "item failed");
                if reason == FailureReason::AccessRestricted {
                    sink.log(
                        format!("⚠ Skipped (age-restricted): {}", title),
                        LogLevel::Warning,
                    );
                } else {
                    sink.log(
                        format!(
                            "✗ Failed: {} - {}",
                            title,
                            truncate_chars(&error.message, ERROR_SUMMARY_CHARS)
                        ),
                        LogLevel::Error,
                    );
                }
                ItemOutcome::Failed(reason)
            }
        }
    }
}

/// URL handed to the engine: the item's own URL, else one composed from its id
pub(crate) fn fetch_url(config: &Config, item: &ItemDescriptor) -> Option<String> {
    if let Some(url) = item.direct_url.as_deref() {
        if parse_http_url(url).is_some() {
            return Some(url.to_string());
        }
    }
    let id = item.id.trim();
    if id.is_empty() {
        return None;
    }
    Some(format!("{}{}", config.download.item_url_base, id))
}

/// Map an engine error to a failure reason
pub(crate) fn classify(error: &EngineError) -> FailureReason {
    if error.is_access_restricted() {
        FailureReason::AccessRestricted
    } else if error.is_network() {
        FailureReason::NetworkError
    } else {
        FailureReason::Unknown
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, direct_url: Option<&str>) -> ItemDescriptor {
        ItemDescriptor {
            id: id.to_string(),
            title: "Song".to_string(),
            direct_url: direct_url.map(str::to_string),
        }
    }

    #[test]
    fn direct_url_wins_over_id() {
        let config = Config::default();
        assert_eq!(
            fetch_url(&config, &item("abc", Some("https://youtu.be/abc"))).as_deref(),
            Some("https://youtu.be/abc")
        );
    }

    #[test]
    fn url_composed_from_id() {
        let config = Config::default();
        assert_eq!(
            fetch_url(&config, &item("abc", None)).as_deref(),
            Some("https://www.youtube.com/watch?v=abc")
        );
        assert_eq!(
            fetch_url(&config, &item("abc", Some("abc"))).as_deref(),
            Some("https://www.youtube.com/watch?v=abc"),
            "non-http direct url falls back to id"
        );
    }

    #[test]
    fn no_id_and_no_url_yields_none() {
        assert_eq!(fetch_url(&Config::default(), &item("  ", None)), None);
    }

    #[test]
    fn classification() {
        assert_eq!(
            classify(&EngineError::new("Sign in to confirm your age")),
            FailureReason::AccessRestricted
        );
        assert_eq!(
            classify(&EngineError::new("Read timed out")),
            FailureReason::NetworkError
        );
        assert_eq!(
            classify(&EngineError::new("Postprocessing failed")),
            FailureReason::Unknown
        );
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
