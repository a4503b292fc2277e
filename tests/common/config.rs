//! Test configuration helpers for building orchestrators over fakes

use super::fixtures::{FakeEngine, FakeSource};
use playlist_dl::{Config, Orchestrator};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Default configuration with every throttle and backoff delay set to zero
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.download.submission_delay = Duration::ZERO;
    config.download.submission_jitter = Duration::ZERO;
    config.retry.initial_delay = Duration::ZERO;
    config.retry.max_jitter = Duration::ZERO;
    config.retry.jitter = false;
    config
}

/// Orchestrator over the given fakes, plus a fresh output directory
pub fn create_test_orchestrator(
    config: Config,
    source: Arc<FakeSource>,
    engine: Arc<FakeEngine>,
) -> (Orchestrator, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(config, source, engine).unwrap();
    (orchestrator, temp_dir)
}

/// Pre-create output files as if a previous run had produced them
pub fn seed_existing(dir: &TempDir, stems: &[&str], ext: &str) {
    for stem in stems {
        std::fs::write(dir.path().join(format!("{}.{}", stem, ext)), b"old").unwrap();
    }
}
