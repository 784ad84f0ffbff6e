//! Captured samples.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::orientation::PhotoOrientation;

/// Capture type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Photo,
    Audio,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Photo => f.write_str("photo"),
            Modality::Audio => f.write_str("audio"),
        }
    }
}

/// One encoded capture, ready for submission.
///
/// Owned by the orchestrator until it is handed to the prediction client,
/// which consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub modality: Modality,
    /// JPEG bytes for photos, WAV bytes for audio.
    pub payload: Vec<u8>,
    /// Rotation metadata resolved from the orientation snapshot taken at
    /// capture time.
    pub captured_at_orientation_degrees: u16,
    /// Orientation tag for photos; `None` for audio.
    pub photo_orientation: Option<PhotoOrientation>,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn photo(payload: Vec<u8>, degrees: u16, orientation: PhotoOrientation) -> Self {
        Self {
            modality: Modality::Photo,
            payload,
            captured_at_orientation_degrees: degrees,
            photo_orientation: Some(orientation),
            timestamp: Utc::now(),
        }
    }

    pub fn audio(payload: Vec<u8>, degrees: u16) -> Self {
        Self {
            modality: Modality::Audio,
            payload,
            captured_at_orientation_degrees: degrees,
            photo_orientation: None,
            timestamp: Utc::now(),
        }
    }
}
