//! Session state machine and the capture controls derived from it.
//!
//! [`SessionState`] is owned by the orchestrator and only changed through its
//! transition methods. [`CaptureControls`] is what the presentation layer
//! needs to enable or disable its photo / record / combined affordances.

use std::fmt;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// States of a capture session.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──setup──▶ PreviewActive ──start_recording──▶ Recording ──stop──▶ PreviewActive
///                               ──start_combined───▶ CapturingInLoop ──stop──▶ PreviewActive
/// any state ──teardown──▶ Idle
/// ```
///
/// `Recording` and `CapturingInLoop` exclude each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No camera bound.
    #[default]
    Idle,

    /// Camera bound and previewing; nothing is being recorded.
    PreviewActive,

    /// Audio is being recorded.
    Recording,

    /// Audio is being recorded while photos are captured on an interval.
    CapturingInLoop,
}

impl SessionState {
    /// Returns `true` while a recording or combined capture is running.
    ///
    /// ```
    /// use emotion_capture::capture::SessionState;
    ///
    /// assert!(!SessionState::Idle.is_active());
    /// assert!(!SessionState::PreviewActive.is_active());
    /// assert!(SessionState::Recording.is_active());
    /// assert!(SessionState::CapturingInLoop.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Recording | SessionState::CapturingInLoop)
    }

    /// A short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::PreviewActive => "Preview",
            SessionState::Recording => "Recording",
            SessionState::CapturingInLoop => "Capturing",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// CaptureControls
// ---------------------------------------------------------------------------

/// Which capture affordances are currently usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureControls {
    /// Single photo capture.
    pub photo_enabled: bool,
    /// Start or stop an audio recording.
    pub record_enabled: bool,
    /// Start or stop a combined capture.
    pub combined_enabled: bool,
}

impl CaptureControls {
    /// Derive the controls for `state`.
    ///
    /// While a photo is in flight, or while recording, the other capture kind
    /// stays available only if the device can record and photograph at the
    /// same time.
    pub fn derive(state: SessionState, photo_in_flight: bool, concurrent_supported: bool) -> Self {
        match state {
            SessionState::Idle => Self {
                photo_enabled: false,
                record_enabled: false,
                combined_enabled: false,
            },
            SessionState::PreviewActive => Self {
                photo_enabled: !photo_in_flight,
                record_enabled: !photo_in_flight || concurrent_supported,
                combined_enabled: !photo_in_flight,
            },
            SessionState::Recording => Self {
                photo_enabled: concurrent_supported && !photo_in_flight,
                record_enabled: true,
                combined_enabled: false,
            },
            SessionState::CapturingInLoop => Self {
                photo_enabled: false,
                record_enabled: false,
                combined_enabled: true,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- SessionState ---

    #[test]
    fn default_state_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    #[test]
    fn only_recording_states_are_active() {
        assert!(!SessionState::Idle.is_active());
        assert!(!SessionState::PreviewActive.is_active());
        assert!(SessionState::Recording.is_active());
        assert!(SessionState::CapturingInLoop.is_active());
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(SessionState::CapturingInLoop.to_string(), "Capturing");
        assert_eq!(SessionState::PreviewActive.label(), "Preview");
    }

    // ---- CaptureControls ---

    #[test]
    fn idle_disables_everything() {
        let c = CaptureControls::derive(SessionState::Idle, false, true);
        assert!(!c.photo_enabled && !c.record_enabled && !c.combined_enabled);
    }

    #[test]
    fn photo_in_flight_blocks_recording_without_concurrency() {
        let c = CaptureControls::derive(SessionState::PreviewActive, true, false);
        assert!(!c.photo_enabled);
        assert!(!c.record_enabled);

        let c = CaptureControls::derive(SessionState::PreviewActive, true, true);
        assert!(c.record_enabled);
    }

    #[test]
    fn recording_allows_photo_only_with_concurrency() {
        assert!(!CaptureControls::derive(SessionState::Recording, false, false).photo_enabled);
        assert!(CaptureControls::derive(SessionState::Recording, false, true).photo_enabled);
        assert!(!CaptureControls::derive(SessionState::Recording, false, true).combined_enabled);
    }

    #[test]
    fn combined_loop_only_offers_stop() {
        let c = CaptureControls::derive(SessionState::CapturingInLoop, false, true);
        assert_eq!(
            c,
            CaptureControls {
                photo_enabled: false,
                record_enabled: false,
                combined_enabled: true
            }
        );
    }
}
