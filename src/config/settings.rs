//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every section is `#[serde(default)]`, so a settings file only needs the
//! keys it changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::orientation::{EnclosurePanel, NativeOrientation};

// ---------------------------------------------------------------------------
// ImageUpload
// ---------------------------------------------------------------------------

/// How a photo is referenced in the `/predictimage` request body.
///
/// | Variant    | `image` field                                   |
/// |------------|-------------------------------------------------|
/// | Inline     | base64-encoded JPEG bytes                       |
/// | FilePath   | path of the JPEG written to `upload_dir`        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageUpload {
    #[default]
    Inline,
    /// For a service running on the same machine that reads the file itself.
    FilePath,
}

// ---------------------------------------------------------------------------
// ServiceConfig
// ---------------------------------------------------------------------------

/// Connection settings for the prediction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL; `/predictimage` and `/predictaudio` are appended.
    pub base_url: String,
    /// Per-request timeout applied by the HTTP client. Unset waits forever.
    pub timeout_secs: Option<u64>,
    pub image_upload: ImageUpload,
    /// Where photos are written when `image_upload = "file_path"`.
    pub upload_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            timeout_secs: None,
            image_upload: ImageUpload::default(),
            upload_dir: AppPaths::new().uploads_dir,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Session timing and capture file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Pause between photo captures in combined mode, in milliseconds.
    pub loop_interval_ms: u64,
    /// Directory audio recordings are written to.
    pub capture_dir: PathBuf,
    /// File name prefix for audio recordings.
    pub audio_file_prefix: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            loop_interval_ms: 500,
            capture_dir: AppPaths::new().captures_dir,
            audio_file_prefix: "SimpleAudio_".into(),
        }
    }
}

impl CaptureConfig {
    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }

    /// Recording path for a session started at `started`, e.g.
    /// `SimpleAudio_10-18-26_142501.wav`.
    pub fn audio_path(&self, started: DateTime<Utc>) -> PathBuf {
        self.capture_dir.join(format!(
            "{}{}.wav",
            self.audio_file_prefix,
            started.format("%m-%d-%y_%H%M%S")
        ))
    }
}

// ---------------------------------------------------------------------------
// DeviceConfig
// ---------------------------------------------------------------------------

/// Settings for the file-replay capture device used by the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// JPEG returned for every photo capture.
    pub photo_file: PathBuf,
    /// WAV copied into place when a recording stops.
    pub audio_file: PathBuf,
    /// Panel the simulated camera is mounted on; `unknown` means external.
    pub enclosure_panel: EnclosurePanel,
    pub native_orientation: NativeOrientation,
    /// Whether photos may be taken while audio is recording.
    pub concurrent_record_and_photo: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            photo_file: PathBuf::from("face.jpg"),
            audio_file: PathBuf::from("voice.wav"),
            enclosure_panel: EnclosurePanel::Front,
            native_orientation: NativeOrientation::Landscape,
            concurrent_record_and_photo: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use emotion_capture::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Prediction service settings.
    pub service: ServiceConfig,
    /// Session timing and file layout.
    pub capture: CaptureConfig,
    /// Replay device settings (binary only).
    pub device: DeviceConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
