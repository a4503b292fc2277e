//! Persistence of the last-used run parameters
//!
//! A small JSON file remembering the previous URL, output folder, quality and
//! skip-existing choice so a front end can pre-fill its form.

use crate::error::Result;
use crate::types::{AudioQuality, BatchRequest};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Directory under the home directory holding the settings file
const SETTINGS_DIR: &str = ".playlist-dl";
/// Settings file name
const SETTINGS_FILE: &str = "settings.json";

/// Last-used run parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Source URL of the previous run
    #[serde(default)]
    pub last_url: String,

    /// Output directory of the previous run
    #[serde(default = "default_output_dir")]
    pub last_output_dir: PathBuf,

    /// Bitrate of the previous run; unknown values fall back to 192 kbps
    #[serde(default, deserialize_with = "lenient_quality")]
    pub last_quality: AudioQuality,

    /// Skip-existing choice of the previous run (default: true)
    #[serde(default = "default_true")]
    pub last_skip_existing: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_url: String::new(),
            last_output_dir: default_output_dir(),
            last_quality: AudioQuality::default(),
            last_skip_existing: true,
        }
    }
}

impl Settings {
    /// Default settings file location (`~/.playlist-dl/settings.json`)
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SETTINGS_DIR)
            .join(SETTINGS_FILE)
    }

    /// Load settings, falling back to defaults
    ///
    /// A missing file is normal on first use. An unreadable or corrupt file is logged
    /// and replaced by defaults rather than reported.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not read settings, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt settings file, using defaults");
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` or `Error::Serialization` on failure.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Settings remembering `request`
    pub fn from_request(request: &BatchRequest) -> Self {
        Self {
            last_url: request.source_url.clone(),
            last_output_dir: request.output_dir.clone(),
            last_quality: request.quality,
            last_skip_existing: request.skip_existing,
        }
    }

    /// A request pre-filled from these settings
    pub fn to_request(&self) -> BatchRequest {
        BatchRequest::new(self.last_url.clone(), self.last_output_dir.clone())
            .with_quality(self.last_quality)
            .with_skip_existing(self.last_skip_existing)
    }
}

fn default_output_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Music")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("playlist-dl")
}

fn default_true() -> bool {
    true
}

fn lenient_quality<'de, D>(deserializer: D) -> std::result::Result<AudioQuality, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|k| u32::try_from(k).ok())
            .and_then(AudioQuality::from_kbps),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(|| {
        tracing::debug!(value = %value, "unknown quality in settings, using default");
        AudioQuality::default()
    }))
}
