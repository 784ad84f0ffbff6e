//! Events delivered from the orchestrator to the presentation layer.
//!
//! The orchestrator never renders anything; it pushes [`SessionEvent`]s into
//! an [`EventSink`] and the UI drains the receiving end at its own pace.

use tokio::sync::mpsc;

use crate::predict::FinalResult;

use super::error::{CaptureError, ErrorKind};
use super::state::{CaptureControls, SessionState};

/// Progress and result notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session moved to a new state.
    SessionStateChanged(SessionState),
    /// The set of usable capture affordances changed.
    ControlsChanged(CaptureControls),
    /// Rotation now applied to the live preview.
    PreviewRotationChanged(u16),
    /// A result is ready to display.
    PredictionReady(FinalResult),
    /// An operation failed, or a loop iteration was skipped.
    Error { kind: ErrorKind, message: String },
}

/// Sending half of the event stream.
///
/// Unbounded so the capture loop never waits on a slow UI. Sends after the
/// receiver is dropped are discarded.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl EventSink {
    /// A connected sink and its receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops every event.
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                log::trace!("events: receiver dropped");
            }
        }
    }

    pub fn error(&self, err: &CaptureError) {
        self.emit(SessionEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        });
    }
}
