//! Errors surfaced by the capture orchestrator.
//!
//! Every variant records the session state at the time of failure, and the
//! modality when one applies, so callers can pick a user-facing message.

use std::fmt;

use thiserror::Error;

use crate::predict::PredictionError;

use super::device::DeviceError;
use super::sample::Modality;
use super::state::SessionState;

/// Coarse classification of a [`CaptureError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No capture device.
    DeviceUnavailable,
    /// Capture access refused.
    PermissionDenied,
    /// A bound device failed to produce a sample.
    CaptureFailure,
    /// Illegal state transition.
    InvalidState,
    /// Network or service error on a single sample.
    SubmissionFailure,
    /// A session was finalized with zero predictions.
    EmptySession,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::DeviceUnavailable => "device unavailable",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::CaptureFailure => "capture failure",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::SubmissionFailure => "submission failure",
            ErrorKind::EmptySession => "empty session",
        };
        f.write_str(s)
    }
}

/// Errors returned by [`CaptureOrchestrator`](super::CaptureOrchestrator)
/// operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("no capture device available (state: {state})")]
    DeviceUnavailable { state: SessionState },

    #[error("access to the capture device was denied (state: {state})")]
    PermissionDenied { state: SessionState },

    #[error("{modality} capture failed in {state}: {message}")]
    Capture {
        modality: Modality,
        state: SessionState,
        message: String,
    },

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("{modality} submission failed in {state}: {source}")]
    Submission {
        modality: Modality,
        state: SessionState,
        #[source]
        source: PredictionError,
    },

    #[error("session finished without any prediction (state: {state})")]
    EmptySession { state: SessionState },
}

impl CaptureError {
    /// Map a device error raised while capturing `modality`.
    pub fn from_device(err: DeviceError, modality: Modality, state: SessionState) -> Self {
        match err {
            DeviceError::Unavailable => CaptureError::DeviceUnavailable { state },
            DeviceError::PermissionDenied => CaptureError::PermissionDenied { state },
            DeviceError::Failed(message) => CaptureError::Capture {
                modality,
                state,
                message,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptureError::DeviceUnavailable { .. } => ErrorKind::DeviceUnavailable,
            CaptureError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            CaptureError::Capture { .. } => ErrorKind::CaptureFailure,
            CaptureError::InvalidState { .. } => ErrorKind::InvalidState,
            CaptureError::Submission { .. } => ErrorKind::SubmissionFailure,
            CaptureError::EmptySession { .. } => ErrorKind::EmptySession,
        }
    }

    pub fn modality(&self) -> Option<Modality> {
        match self {
            CaptureError::Capture { modality, .. } | CaptureError::Submission { modality, .. } => {
                Some(*modality)
            }
            _ => None,
        }
    }

    /// Session state when the error occurred.
    pub fn state(&self) -> SessionState {
        match self {
            CaptureError::DeviceUnavailable { state }
            | CaptureError::PermissionDenied { state }
            | CaptureError::Capture { state, .. }
            | CaptureError::InvalidState { state, .. }
            | CaptureError::Submission { state, .. }
            | CaptureError::EmptySession { state } => *state,
        }
    }
}
