//! Core types for playlist-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Target audio bitrate for transcoding
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioQuality {
    /// 128 kbps
    #[serde(rename = "128")]
    Kbps128,
    /// 192 kbps (default)
    #[default]
    #[serde(rename = "192")]
    Kbps192,
    /// 256 kbps
    #[serde(rename = "256")]
    Kbps256,
    /// 320 kbps
    #[serde(rename = "320")]
    Kbps320,
}

impl AudioQuality {
    /// All supported qualities, lowest first
    pub const ALL: [AudioQuality; 4] = [
        AudioQuality::Kbps128,
        AudioQuality::Kbps192,
        AudioQuality::Kbps256,
        AudioQuality::Kbps320,
    ];

    /// Bitrate in kilobits per second
    pub fn kbps(&self) -> u32 {
        match self {
            AudioQuality::Kbps128 => 128,
            AudioQuality::Kbps192 => 192,
            AudioQuality::Kbps256 => 256,
            AudioQuality::Kbps320 => 320,
        }
    }

    /// Convert a kbps value into a quality, if supported
    pub fn from_kbps(kbps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.kbps() == kbps)
    }
}

impl std::fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} kbps", self.kbps())
    }
}

impl std::str::FromStr for AudioQuality {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches("kbps").trim();
        trimmed
            .parse::<u32>()
            .ok()
            .and_then(Self::from_kbps)
            .ok_or_else(|| crate::error::Error::Config {
                message: format!("unsupported audio quality '{}'", s),
                key: Some("quality".to_string()),
            })
    }
}

/// Parameters of one batch run. Immutable once the run starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Playlist or single-item URL
    pub source_url: String,
    /// Directory receiving the transcoded files
    pub output_dir: PathBuf,
    /// Target bitrate
    pub quality: AudioQuality,
    /// Skip items whose output file already exists
    pub skip_existing: bool,
}

impl BatchRequest {
    /// Create a request with `skip_existing` enabled
    pub fn new(source_url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            output_dir: output_dir.into(),
            quality: AudioQuality::default(),
            skip_existing: true,
        }
    }

    /// Set the target bitrate
    #[must_use]
    pub fn with_quality(mut self, quality: AudioQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Enable or disable skipping of existing outputs
    #[must_use]
    pub fn with_skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }
}

/// One downloadable item produced by the resolver
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    /// Platform item id (may be empty when unknown)
    pub id: String,
    /// Display title; not guaranteed to be unique within a batch
    pub title: String,
    /// Direct item URL, when the resolver provides one
    pub direct_url: Option<String>,
}

/// Why an item did not complete
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Age gate, sign-in wall or similar; expected and non-fatal
    AccessRestricted,
    /// Transport failure after the retry budget was spent
    NetworkError,
    /// Run was cancelled before the item finished
    UserCancelled,
    /// Anything else, including items without a usable URL
    Unknown,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureReason::AccessRestricted => "access restricted",
            FailureReason::NetworkError => "network error",
            FailureReason::UserCancelled => "cancelled",
            FailureReason::Unknown => "unknown error",
        };
        f.write_str(s)
    }
}

/// Terminal outcome of one item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum ItemOutcome {
    /// Output file written
    Completed,
    /// Output file already existed
    Skipped,
    /// Item failed
    Failed(FailureReason),
}

/// Severity of a user-facing log line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Informational
    Info,
    /// Something was skipped or will be retried
    Warning,
    /// Something failed
    Error,
    /// Something finished successfully
    Success,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Success => "SUCCESS",
        };
        f.write_str(s)
    }
}

/// Events emitted by the orchestrator during a run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// User-facing log line
    Log {
        /// Message text
        message: String,
        /// Severity
        level: LogLevel,
    },

    /// Short status line (replaces the previous one)
    Status {
        /// Message text
        message: String,
    },

    /// Batch progress: `current` of `total` items reached a terminal outcome
    Progress {
        /// Items with a terminal outcome so far
        current: usize,
        /// Items in the batch
        total: usize,
    },
}

/// Observer for run events.
///
/// Callbacks are invoked from worker tasks and must be safe to call from any thread.
/// Marshaling onto a UI thread is the implementor's job. All methods default to no-ops.
pub trait RunObserver: Send + Sync {
    /// A log line was produced
    fn on_log(&self, _message: &str, _level: LogLevel) {}

    /// The status line changed
    fn on_status(&self, _message: &str) {}

    /// Batch progress changed
    fn on_progress(&self, _current: usize, _total: usize) {}
}

/// Dispatch an event to the matching observer callback
pub(crate) fn notify(observer: &dyn RunObserver, event: &Event) {
    match event {
        Event::Log { message, level } => observer.on_log(message, *level),
        Event::Status { message } => observer.on_status(message),
        Event::Progress { current, total } => observer.on_progress(*current, *total),
    }
}

/// How a run ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every item reached a terminal outcome
    Completed,
    /// Stopped by [`cancel`](crate::Orchestrator::cancel)
    Cancelled,
    /// Failed before any item was processed (invalid URL, resolution failure)
    Failed {
        /// Error message
        error: String,
    },
}

/// Final summary of a run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// How the run ended
    pub status: RunStatus,
    /// Items in the batch
    pub total_items: usize,
    /// Items with a terminal outcome
    pub completed_count: usize,
    /// Items handed to the worker pool
    pub dispatched_count: usize,
    /// Titles skipped because their output already existed, in resolver order
    pub skipped_titles: Vec<String>,
    /// Titles that failed, in completion order
    pub failed_titles: Vec<String>,
}

impl RunReport {
    /// Report for a run that failed before any item was processed
    pub(crate) fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            status: RunStatus::Failed {
                error: error.to_string(),
            },
            total_items: 0,
            completed_count: 0,
            dispatched_count: 0,
            skipped_titles: Vec::new(),
            failed_titles: Vec::new(),
        }
    }

    /// Whether the run reached normal completion
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Whether the run was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn audio_quality_parses_plain_and_suffixed_values() {
        assert_eq!("320".parse::<AudioQuality>().unwrap(), AudioQuality::Kbps320);
        assert_eq!(
            "128 kbps".parse::<AudioQuality>().unwrap(),
            AudioQuality::Kbps128
        );
        assert!("96".parse::<AudioQuality>().is_err());
        assert!("loud".parse::<AudioQuality>().is_err());
    }

    #[test]
    fn audio_quality_serializes_as_bitrate_string() {
        let json = serde_json::to_string(&AudioQuality::Kbps256).unwrap();
        assert_eq!(json, "\"256\"");
        let back: AudioQuality = serde_json::from_str("\"192\"").unwrap();
        assert_eq!(back, AudioQuality::Kbps192);
    }

    #[test]
    fn batch_request_builder_defaults_to_skip_existing() {
        let request = BatchRequest::new("https://example.com/list", "/tmp/out")
            .with_quality(AudioQuality::Kbps320);
        assert!(request.skip_existing);
        assert_eq!(request.quality, AudioQuality::Kbps320);
        assert!(!request.with_skip_existing(false).skip_existing);
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(Event::Progress {
            current: 2,
            total: 5,
        })
        .unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["current"], 2);

        let json = serde_json::to_value(Event::Log {
            message: "hi".to_string(),
            level: LogLevel::Success,
        })
        .unwrap();
        assert_eq!(json["level"], "SUCCESS");
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl RunObserver for Recorder {
        fn on_log(&self, message: &str, level: LogLevel) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("log:{level}:{message}"));
        }

        fn on_progress(&self, current: usize, total: usize) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("progress:{current}/{total}"));
        }
    }

    #[test]
    fn notify_routes_events_and_ignores_unimplemented_callbacks() {
        let recorder = Recorder::default();
        notify(
            &recorder,
            &Event::Log {
                message: "hello".to_string(),
                level: LogLevel::Info,
            },
        );
        notify(
            &recorder,
            &Event::Status {
                message: "ignored".to_string(),
            },
        );
        notify(
            &recorder,
            &Event::Progress {
                current: 1,
                total: 3,
            },
        );

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(*calls, vec!["log:INFO:hello", "progress:1/3"]);
    }

    #[test]
    fn failed_report_is_neither_completed_nor_cancelled() {
        let report = RunReport::failed("invalid URL: ftp://x");
        assert!(!report.is_completed());
        assert!(!report.is_cancelled());
        assert_eq!(
            report.status,
            RunStatus::Failed {
                error: "invalid URL: ftp://x".to_string()
            }
        );
    }
}
