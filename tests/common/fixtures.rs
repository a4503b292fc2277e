//! Scripted metadata sources and fetch engines

use async_trait::async_trait;
use playlist_dl::engine::{EnginePhase, EngineProgress, FetchOptions, ProgressCallback};
use playlist_dl::resolver::{RawEntry, ResolvedMedia};
use playlist_dl::{EngineError, Error, FetchEngine, MetadataSource};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Playlist URL used by the fixtures
pub const PLAYLIST_URL: &str = "https://www.youtube.com/playlist?list=PLfixture";

/// Metadata source returning a fixed playlist, or a fixed failure
pub struct FakeSource {
    titles: Vec<String>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl FakeSource {
    /// Playlist with the given titles (ids `vid0`, `vid1`, ...)
    pub fn playlist(titles: &[&str]) -> Self {
        Self {
            titles: titles.iter().map(|t| t.to_string()).collect(),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Source whose every lookup fails with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            titles: Vec::new(),
            failure: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of lookups performed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for FakeSource {
    async fn extract(&self, _url: &str, _flat: bool) -> playlist_dl::Result<ResolvedMedia> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(Error::ExternalTool(message.clone()));
        }
        Ok(ResolvedMedia {
            entries: Some(
                self.titles
                    .iter()
                    .enumerate()
                    .map(|(i, title)| {
                        Some(RawEntry {
                            id: Some(format!("vid{}", i)),
                            title: Some(title.clone()),
                            url: Some(format!("https://www.youtube.com/watch?v=vid{}", i)),
                        })
                    })
                    .collect(),
            ),
            id: Some("PLfixture".into()),
            title: Some("Fixture playlist".into()),
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// One engine call as seen by [`FakeEngine`]
#[derive(Clone, Debug)]
pub struct EngineCall {
    /// URL handed to the engine
    pub url: String,
    /// Options handed to the engine
    pub options: FetchOptions,
}

/// Fetch engine with per-item scripted failures
///
/// Items are keyed by file stem. Unscripted calls succeed. A successful call writes
/// `{output_dir}/{file_stem}.{file_extension}`.
#[derive(Default)]
pub struct FakeEngine {
    scripts: Mutex<HashMap<String, VecDeque<String>>>,
    calls: Mutex<Vec<EngineCall>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    /// Notified at the start of every call
    pub started: Notify,
}

impl FakeEngine {
    /// Engine where every call succeeds immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine where every call takes `delay`
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Fail the next calls for `stem` with these messages, in order
    pub fn fail(self, stem: &str, errors: &[&str]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(stem.to_string(), errors.iter().map(|e| e.to_string()).collect());
        self
    }

    /// All calls so far
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls made for `stem`
    pub fn calls_for(&self, stem: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.options.file_stem == stem)
            .count()
    }

    /// Highest number of simultaneous calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn output_file(options: &FetchOptions) -> PathBuf {
        options
            .output_dir
            .join(format!("{}.{}", options.file_stem, options.file_extension))
    }
}

#[async_trait]
impl FetchEngine for FakeEngine {
    async fn fetch_and_transcode(
        &self,
        url: &str,
        options: &FetchOptions,
        on_progress: ProgressCallback<'_>,
    ) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(EngineCall {
            url: url.to_string(),
            options: options.clone(),
        });
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.started.notify_one();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&options.file_stem)
            .and_then(VecDeque::pop_front);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(message) = scripted {
            on_progress(EngineProgress::phase(EnginePhase::Error));
            return Err(EngineError::new(message));
        }

        on_progress(EngineProgress::phase(EnginePhase::Finished));
        std::fs::write(Self::output_file(options), b"ID3").unwrap();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
