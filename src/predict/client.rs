//! Core `PredictionClient` trait and the HTTP implementation.
//!
//! `HttpPredictionClient` talks to the emotion-prediction service:
//!
//! ```text
//! POST {base_url}/predictimage  { "image": <base64 JPEG | file path> }
//! POST {base_url}/predictaudio  { "audio": <base64 WAV> }
//! ```
//!
//! The response body is the label. No schema is assumed: whatever the service
//! sends back is handed on untouched.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

use crate::capture::{Modality, Sample};
use crate::config::{ImageUpload, ServiceConfig};

use super::types::Prediction;

// ---------------------------------------------------------------------------
// PredictionError
// ---------------------------------------------------------------------------

/// Errors that can occur while submitting a sample.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the adapter's timeout.
    #[error("prediction request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("prediction service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered with an empty body.
    #[error("prediction service returned an empty label")]
    EmptyResponse,

    /// The photo could not be written where the service expects to read it.
    #[error("failed to stage photo for upload: {0}")]
    Upload(String),
}

impl From<reqwest::Error> for PredictionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PredictionError::Timeout
        } else {
            PredictionError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// PredictionClient trait
// ---------------------------------------------------------------------------

/// Async trait for the remote emotion classifier.
///
/// Implementors must be `Send + Sync` so they can be shared between the
/// orchestrator and its capture loop as `Arc<dyn PredictionClient>`.
#[async_trait]
pub trait PredictionClient: Send + Sync {
    /// Classify an encoded photo.
    async fn submit_image(&self, jpeg: &[u8]) -> Result<String, PredictionError>;

    /// Classify an encoded audio recording.
    async fn submit_audio(&self, wav: &[u8]) -> Result<String, PredictionError>;

    /// Submit `sample` and wrap the returned label in a [`Prediction`].
    ///
    /// Consumes the sample: each sample is submitted exactly once.
    async fn predict(&self, sample: Sample) -> Result<Prediction, PredictionError> {
        let label = match sample.modality {
            Modality::Photo => self.submit_image(&sample.payload).await?,
            Modality::Audio => self.submit_audio(&sample.payload).await?,
        };
        Ok(Prediction {
            modality: sample.modality,
            label,
            source_sample_timestamp: sample.timestamp,
        })
    }
}

// Compile-time assertion: Box<dyn PredictionClient> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn PredictionClient>) {}
};

// ---------------------------------------------------------------------------
// HttpPredictionClient
// ---------------------------------------------------------------------------

/// Calls the prediction service over HTTP with JSON bodies.
///
/// All connection details come from the [`ServiceConfig`] passed to
/// [`HttpPredictionClient::from_config`].
pub struct HttpPredictionClient {
    client: reqwest::Client,
    config: ServiceConfig,
    upload_seq: AtomicU64,
}

impl HttpPredictionClient {
    /// Build a client from application config.
    ///
    /// `timeout_secs = None` leaves requests unbounded. Fails when the HTTP
    /// client cannot be built with the configured settings.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, PredictionError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            config: config.clone(),
            upload_seq: AtomicU64::new(0),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Write `jpeg` into the upload directory and return its path.
    async fn stage_photo(&self, jpeg: &[u8]) -> Result<PathBuf, PredictionError> {
        let dir = &self.config.upload_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| PredictionError::Upload(format!("{}: {e}", dir.display())))?;

        let seq = self.upload_seq.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "photo_{}_{seq}.jpg",
            chrono::Utc::now().format("%m-%d-%y_%H%M%S")
        );
        let path = dir.join(name);
        tokio::fs::write(&path, jpeg)
            .await
            .map_err(|e| PredictionError::Upload(format!("{}: {e}", path.display())))?;
        Ok(path)
    }

    async fn post_for_label(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<String, PredictionError> {
        let url = self.endpoint(path);
        log::debug!("predict: POST {url}");

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(PredictionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.is_empty() {
            return Err(PredictionError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    async fn submit_image(&self, jpeg: &[u8]) -> Result<String, PredictionError> {
        let image = match self.config.image_upload {
            ImageUpload::Inline => BASE64.encode(jpeg),
            ImageUpload::FilePath => self.stage_photo(jpeg).await?.display().to_string(),
        };
        self.post_for_label("predictimage", serde_json::json!({ "image": image }))
            .await
    }

    async fn submit_audio(&self, wav: &[u8]) -> Result<String, PredictionError> {
        let audio = BASE64.encode(wav);
        self.post_for_label("predictaudio", serde_json::json!({ "audio": audio }))
            .await
    }
}

// ---------------------------------------------------------------------------
// MockPredictionClient  (test-only)
// ---------------------------------------------------------------------------

/// A scripted test double.
///
/// Each modality pops its next response from a queue; once the queue is
/// empty every further call returns the fallback label.
#[cfg(test)]
pub struct MockPredictionClient {
    photo: std::sync::Mutex<std::collections::VecDeque<Result<String, PredictionError>>>,
    audio: std::sync::Mutex<std::collections::VecDeque<Result<String, PredictionError>>>,
    fallback: String,
    photo_delay: Option<Duration>,
    photo_calls: std::sync::atomic::AtomicUsize,
    audio_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockPredictionClient {
    /// Every call succeeds with `label`.
    pub fn always(label: impl Into<String>) -> Self {
        Self {
            photo: Default::default(),
            audio: Default::default(),
            fallback: label.into(),
            photo_delay: None,
            photo_calls: Default::default(),
            audio_calls: Default::default(),
        }
    }

    pub fn with_photo_results(
        self,
        results: impl IntoIterator<Item = Result<String, PredictionError>>,
    ) -> Self {
        self.photo.lock().unwrap().extend(results);
        self
    }

    pub fn with_audio_results(
        self,
        results: impl IntoIterator<Item = Result<String, PredictionError>>,
    ) -> Self {
        self.audio.lock().unwrap().extend(results);
        self
    }

    /// Delay every photo submission, to simulate a slow network.
    pub fn with_photo_delay(mut self, delay: Duration) -> Self {
        self.photo_delay = Some(delay);
        self
    }

    pub fn photo_calls(&self) -> usize {
        self.photo_calls.load(Ordering::SeqCst)
    }

    pub fn audio_calls(&self) -> usize {
        self.audio_calls.load(Ordering::SeqCst)
    }

    fn next(
        &self,
        queue: &std::sync::Mutex<std::collections::VecDeque<Result<String, PredictionError>>>,
    ) -> Result<String, PredictionError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

#[cfg(test)]
#[async_trait]
impl PredictionClient for MockPredictionClient {
    async fn submit_image(&self, _jpeg: &[u8]) -> Result<String, PredictionError> {
        self.photo_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.photo_delay {
            tokio::time::sleep(delay).await;
        }
        self.next(&self.photo)
    }

    async fn submit_audio(&self, _wav: &[u8]) -> Result<String, PredictionError> {
        self.audio_calls.fetch_add(1, Ordering::SeqCst);
        self.next(&self.audio)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
