//! Device capture collaborator contract.
//!
//! # Overview
//!
//! [`DeviceCapture`] is the narrow interface the orchestrator uses to reach
//! the camera and microphone. It is object-safe and `Send + Sync` so it can be
//! held behind an `Arc<dyn DeviceCapture>` and shared with the combined-capture
//! loop.
//!
//! [`MockDevice`] (available under `#[cfg(test)]`) is an in-memory stub with
//! scripted photo results, useful for unit-testing the orchestrator without
//! hardware.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::orientation::CameraMountInfo;

// ---------------------------------------------------------------------------
// DeviceError
// ---------------------------------------------------------------------------

/// Errors reported by the device collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// No camera / microphone could be found.
    #[error("no capture device found")]
    Unavailable,

    /// The platform refused access to the capture device.
    #[error("access to the capture device was denied")]
    PermissionDenied,

    /// The device is present but the capture itself failed.
    #[error("capture failed: {0}")]
    Failed(String),
}

// ---------------------------------------------------------------------------
// AudioHandle / DeviceEvent
// ---------------------------------------------------------------------------

/// Token for a running audio recording, returned by
/// [`DeviceCapture::start_audio_recording`] and consumed by
/// [`DeviceCapture::stop_audio_recording`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioHandle {
    pub id: u64,
    /// File the recording is written to.
    pub path: PathBuf,
}

/// Unsolicited notifications from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The device hit its maximum recording length; the active recording must
    /// be finalized.
    RecordLimitationExceeded,
    /// The device failed and has to be released.
    Failed { code: u32, message: String },
}

// ---------------------------------------------------------------------------
// DeviceCapture trait
// ---------------------------------------------------------------------------

/// Camera and microphone access.
///
/// Implementations must be `Send + Sync` so that they can be shared between
/// the orchestrator and its capture loop.
#[async_trait]
pub trait DeviceCapture: Send + Sync {
    /// Bind the camera and report how it is mounted.
    ///
    /// Called once per session setup. Fails with
    /// [`DeviceError::Unavailable`] or [`DeviceError::PermissionDenied`] when
    /// the session cannot start.
    async fn camera_mount_info(&self) -> Result<CameraMountInfo, DeviceError>;

    /// Capture one JPEG-encoded photo.
    async fn capture_photo(&self) -> Result<Vec<u8>, DeviceError>;

    /// Begin recording WAV audio to `path`.
    async fn start_audio_recording(&self, path: &Path) -> Result<AudioHandle, DeviceError>;

    /// Stop the recording behind `handle` and return the encoded audio.
    async fn stop_audio_recording(&self, handle: AudioHandle) -> Result<Vec<u8>, DeviceError>;

    /// Whether a photo can be captured while audio is recording.
    fn supports_concurrent_record_and_photo(&self) -> bool;

    /// Attach rotation metadata to the live preview stream.
    async fn apply_preview_rotation(&self, _degrees: u16) -> Result<(), DeviceError> {
        Ok(())
    }

    /// Release the camera. Called on teardown.
    async fn release(&self) {}
}

// Compile-time assertion: Box<dyn DeviceCapture> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn DeviceCapture>) {}
};

// ---------------------------------------------------------------------------
// MockDevice  (test-only)
// ---------------------------------------------------------------------------

/// In-memory device with scripted results.
///
/// Photo captures pop from a queue and fall back to a fixed JPEG stub once it
/// is empty.
#[cfg(test)]
pub struct MockDevice {
    mount: Result<CameraMountInfo, DeviceError>,
    concurrent: bool,
    photos: std::sync::Mutex<std::collections::VecDeque<Result<Vec<u8>, DeviceError>>>,
    audio: std::sync::Mutex<Result<Vec<u8>, DeviceError>>,
    next_id: std::sync::atomic::AtomicU64,
    photo_calls: std::sync::atomic::AtomicUsize,
    recording: std::sync::Mutex<Option<AudioHandle>>,
    started_paths: std::sync::Mutex<Vec<PathBuf>>,
    preview_rotations: std::sync::Mutex<Vec<u16>>,
    released: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MockDevice {
    /// Integrated back camera on a landscape panel, concurrent capture
    /// supported.
    pub fn new() -> Self {
        use crate::orientation::{EnclosurePanel, NativeOrientation};

        Self {
            mount: Ok(CameraMountInfo::from_enclosure(
                Some(EnclosurePanel::Back),
                NativeOrientation::Landscape,
            )),
            concurrent: true,
            photos: Default::default(),
            audio: std::sync::Mutex::new(Ok(b"RIFF....WAVE".to_vec())),
            next_id: Default::default(),
            photo_calls: Default::default(),
            recording: Default::default(),
            started_paths: Default::default(),
            preview_rotations: Default::default(),
            released: Default::default(),
        }
    }

    pub fn with_mount(mut self, mount: Result<CameraMountInfo, DeviceError>) -> Self {
        self.mount = mount;
        self
    }

    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn with_photo_results(
        self,
        results: impl IntoIterator<Item = Result<Vec<u8>, DeviceError>>,
    ) -> Self {
        self.photos.lock().unwrap().extend(results);
        self
    }

    pub fn with_audio_result(self, result: Result<Vec<u8>, DeviceError>) -> Self {
        *self.audio.lock().unwrap() = result;
        self
    }

    pub fn photo_calls(&self) -> usize {
        self.photo_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn is_recording(&self) -> bool {
        self.recording.lock().unwrap().is_some()
    }

    pub fn started_paths(&self) -> Vec<PathBuf> {
        self.started_paths.lock().unwrap().clone()
    }

    pub fn preview_rotations(&self) -> Vec<u16> {
        self.preview_rotations.lock().unwrap().clone()
    }

    pub fn was_released(&self) -> bool {
        self.released.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl DeviceCapture for MockDevice {
    async fn camera_mount_info(&self) -> Result<CameraMountInfo, DeviceError> {
        self.mount.clone()
    }

    async fn capture_photo(&self) -> Result<Vec<u8>, DeviceError> {
        self.photo_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.photos
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![0xFF, 0xD8, 0xFF, 0xD9]))
    }

    async fn start_audio_recording(&self, path: &Path) -> Result<AudioHandle, DeviceError> {
        let handle = AudioHandle {
            id: self
                .next_id
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst),
            path: path.to_path_buf(),
        };
        self.started_paths.lock().unwrap().push(path.to_path_buf());
        *self.recording.lock().unwrap() = Some(handle.clone());
        Ok(handle)
    }

    async fn stop_audio_recording(&self, handle: AudioHandle) -> Result<Vec<u8>, DeviceError> {
        let mut recording = self.recording.lock().unwrap();
        if recording.as_ref() != Some(&handle) {
            return Err(DeviceError::Failed("unknown recording handle".into()));
        }
        *recording = None;
        self.audio.lock().unwrap().clone()
    }

    fn supports_concurrent_record_and_photo(&self) -> bool {
        self.concurrent
    }

    async fn apply_preview_rotation(&self, degrees: u16) -> Result<(), DeviceError> {
        self.preview_rotations.lock().unwrap().push(degrees);
        Ok(())
    }

    async fn release(&self) {
        self.released
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}
