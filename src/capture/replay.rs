//! File-backed capture device.
//!
//! [`FileReplayDevice`] stands in for a camera and microphone by replaying
//! files from disk: every photo capture returns the configured JPEG, and every
//! recording produces a copy of the configured WAV at the path the
//! orchestrator asked for. The binary uses it so the whole capture flow can
//! be driven from a terminal against a real prediction service.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::config::DeviceConfig;
use crate::orientation::{CameraMountInfo, EnclosurePanel, NativeOrientation};

use super::device::{AudioHandle, DeviceCapture, DeviceError};

pub struct FileReplayDevice {
    photo_file: PathBuf,
    audio_file: PathBuf,
    panel: EnclosurePanel,
    native_orientation: NativeOrientation,
    concurrent: bool,
    next_id: AtomicU64,
    recording: Mutex<Option<AudioHandle>>,
}

impl FileReplayDevice {
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            photo_file: config.photo_file.clone(),
            audio_file: config.audio_file.clone(),
            panel: config.enclosure_panel,
            native_orientation: config.native_orientation,
            concurrent: config.concurrent_record_and_photo,
            next_id: AtomicU64::new(1),
            recording: Mutex::new(None),
        }
    }

    fn recording(&self) -> MutexGuard<'_, Option<AudioHandle>> {
        self.recording.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Map an I/O error on `path` to the device taxonomy.
fn io_error(err: io::Error, path: &Path) -> DeviceError {
    match err.kind() {
        io::ErrorKind::NotFound => DeviceError::Unavailable,
        io::ErrorKind::PermissionDenied => DeviceError::PermissionDenied,
        _ => DeviceError::Failed(format!("{}: {err}", path.display())),
    }
}

#[async_trait]
impl DeviceCapture for FileReplayDevice {
    async fn camera_mount_info(&self) -> Result<CameraMountInfo, DeviceError> {
        let meta = tokio::fs::metadata(&self.photo_file)
            .await
            .map_err(|e| io_error(e, &self.photo_file))?;
        if !meta.is_file() {
            return Err(DeviceError::Unavailable);
        }

        log::info!(
            "replay: serving photos from {}, audio from {}",
            self.photo_file.display(),
            self.audio_file.display()
        );
        Ok(CameraMountInfo::from_enclosure(
            Some(self.panel),
            self.native_orientation,
        ))
    }

    async fn capture_photo(&self) -> Result<Vec<u8>, DeviceError> {
        let jpeg = tokio::fs::read(&self.photo_file)
            .await
            .map_err(|e| io_error(e, &self.photo_file))?;
        if jpeg.is_empty() {
            return Err(DeviceError::Failed(format!(
                "{} is empty",
                self.photo_file.display()
            )));
        }
        Ok(jpeg)
    }

    async fn start_audio_recording(&self, path: &Path) -> Result<AudioHandle, DeviceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(e, parent))?;
        }

        let mut recording = self.recording();
        if recording.is_some() {
            return Err(DeviceError::Failed("a recording is already running".into()));
        }
        let handle = AudioHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            path: path.to_path_buf(),
        };
        *recording = Some(handle.clone());
        log::debug!("replay: recording #{} started", handle.id);
        Ok(handle)
    }

    async fn stop_audio_recording(&self, handle: AudioHandle) -> Result<Vec<u8>, DeviceError> {
        {
            let mut recording = self.recording();
            if recording.as_ref() != Some(&handle) {
                return Err(DeviceError::Failed(format!(
                    "recording #{} is not running",
                    handle.id
                )));
            }
            *recording = None;
        }

        let wav = tokio::fs::read(&self.audio_file)
            .await
            .map_err(|e| io_error(e, &self.audio_file))?;
        tokio::fs::write(&handle.path, &wav)
            .await
            .map_err(|e| io_error(e, &handle.path))?;

        log::debug!(
            "replay: recording #{} saved to {} ({} bytes)",
            handle.id,
            handle.path.display(),
            wav.len()
        );
        Ok(wav)
    }

    fn supports_concurrent_record_and_photo(&self) -> bool {
        self.concurrent
    }

    async fn release(&self) {
        if let Some(handle) = self.recording().take() {
            log::warn!("replay: released with recording #{} still running", handle.id);
        }
    }
}
