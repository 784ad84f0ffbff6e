//! Capture sessions: the state machine that ties the device, the prediction
//! client and the aggregator together.
//!
//! This module provides:
//! * [`CaptureOrchestrator`]: owns the session state and drives single
//!   photos, audio recordings and combined photo-loop + audio sessions.
//! * [`DeviceCapture`]: async trait for camera and microphone access.
//! * [`FileReplayDevice`]: a [`DeviceCapture`] that replays files from disk.
//! * [`SessionEvent`] / [`EventSink`]: notifications for the presentation
//!   layer.
//! * [`CaptureError`] / [`ErrorKind`]: error variants.

pub mod device;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod replay;
pub mod sample;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use device::{AudioHandle, DeviceCapture, DeviceError, DeviceEvent};
pub use error::{CaptureError, ErrorKind};
pub use events::{EventSink, SessionEvent};
pub use orchestrator::CaptureOrchestrator;
pub use replay::FileReplayDevice;
pub use sample::{Modality, Sample};
pub use state::{CaptureControls, SessionState};

// test-only re-export so the command tests can build an orchestrator.
#[cfg(test)]
pub use device::MockDevice;
