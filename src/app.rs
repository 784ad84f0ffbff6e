//! Text command surface for the capture orchestrator.
//!
//! # Architecture
//!
//! The binary reads one [`Command`] per stdin line and hands it to
//! [`dispatch`], which drives the [`CaptureOrchestrator`]. Progress and
//! results arrive separately as [`SessionEvent`]s and are rendered with
//! [`describe_event`].
//!
//! # Commands
//!
//! | Input | Effect |
//! |-------|--------|
//! | `photo` | Take one photo and print its emotion |
//! | `record` | Start / stop an audio recording |
//! | `both` | Start / stop combined photo-loop + audio capture |
//! | `device <deg>` | Set the device rotation (0, 90, 180, 270) |
//! | `display <name>` | Set the display orientation (`landscape`, `portrait`, …) |
//! | `state` | Print the session state and available controls |
//! | `quit` | Tear the session down and exit |

use std::fmt;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::capture::{CaptureControls, CaptureError, CaptureOrchestrator, SessionEvent, SessionState};
use crate::orientation::{DeviceOrientation, DisplayOrientation};
use crate::predict::FinalResult;

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Photo,
    /// Toggle an audio recording.
    Record,
    /// Toggle a combined capture.
    Both,
    Device(DeviceOrientation),
    Display(DisplayOrientation),
    State,
    Help,
    Quit,
}

/// Input that could not be turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error("rotation must be a multiple of 90 degrees, got `{0}`")]
    InvalidRotation(String),

    #[error("unknown display orientation `{0}`")]
    InvalidDisplay(String),
}

impl Command {
    /// Parse a command line. Returns `Ok(None)` for blank input.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let cmd = match verb.to_ascii_lowercase().as_str() {
            "photo" | "p" => Command::Photo,
            "record" | "r" => Command::Record,
            "both" | "b" => Command::Both,
            "device" => {
                let raw = arg.ok_or(CommandError::MissingArgument("device"))?;
                let orientation = raw
                    .parse::<i32>()
                    .ok()
                    .and_then(DeviceOrientation::from_degrees)
                    .ok_or_else(|| CommandError::InvalidRotation(raw.to_string()))?;
                Command::Device(orientation)
            }
            "display" => {
                let raw = arg.ok_or(CommandError::MissingArgument("display"))?;
                let display = DisplayOrientation::parse(raw)
                    .ok_or_else(|| CommandError::InvalidDisplay(raw.to_string()))?;
                Command::Display(display)
            }
            "state" | "s" => Command::State,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(cmd))
    }
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// Synchronous answer to a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A recording or combined capture is now running.
    Started(SessionState),
    /// A session finished.
    Finished(FinalResult),
    /// An orientation input was applied.
    Orientation { controls_rotation: u16 },
    Status {
        state: SessionState,
        controls: CaptureControls,
    },
    Help,
    /// The session was torn down; carries the result of any session that was
    /// still running.
    Quit(Option<FinalResult>),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Started(SessionState::CapturingInLoop) => {
                f.write_str("capturing photos and audio, `both` again to stop")
            }
            Reply::Started(_) => f.write_str("recording, `record` again to stop"),
            Reply::Finished(result) => f.write_str(&result.message()),
            Reply::Orientation { controls_rotation } => {
                write!(f, "orientation updated (controls at {controls_rotation}°)")
            }
            Reply::Status { state, controls } => write!(
                f,
                "state: {state} | photo: {} | record: {} | both: {}",
                on_off(controls.photo_enabled),
                on_off(controls.record_enabled),
                on_off(controls.combined_enabled)
            ),
            Reply::Help => f.write_str(
                "commands: photo, record, both, device <0|90|180|270>, \
                 display <landscape|portrait|landscape-flipped|portrait-flipped>, state, quit",
            ),
            Reply::Quit(Some(result)) => write!(f, "{} (bye)", result.message()),
            Reply::Quit(None) => f.write_str("bye"),
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run `cmd` against the orchestrator.
pub async fn dispatch(orc: &CaptureOrchestrator, cmd: Command) -> Result<Reply, CaptureError> {
    match cmd {
        Command::Photo => orc.take_photo().await.map(Reply::Finished),
        Command::Record => Ok(match orc.toggle_recording().await? {
            Some(result) => Reply::Finished(result),
            None => Reply::Started(SessionState::Recording),
        }),
        Command::Both => Ok(match orc.toggle_combined().await? {
            Some(result) => Reply::Finished(result),
            None => Reply::Started(SessionState::CapturingInLoop),
        }),
        Command::Device(orientation) => {
            orc.orientation().set_device_orientation(orientation);
            Ok(Reply::Orientation {
                controls_rotation: orc.controls_rotation(),
            })
        }
        Command::Display(display) => {
            orc.on_display_orientation_changed(display).await;
            Ok(Reply::Orientation {
                controls_rotation: orc.controls_rotation(),
            })
        }
        Command::State => Ok(Reply::Status {
            state: orc.state(),
            controls: orc.controls(),
        }),
        Command::Help => Ok(Reply::Help),
        Command::Quit => orc.teardown().await.map(Reply::Quit),
    }
}

/// One-line rendering of an event, or `None` for events that only matter to
/// a graphical front end.
pub fn describe_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::SessionStateChanged(state) => Some(format!("[{state}]")),
        SessionEvent::PredictionReady(result) => Some(format!("=> {}", result.message())),
        SessionEvent::Error { kind, message } => Some(format!("! {kind}: {message}")),
        SessionEvent::ControlsChanged(_) | SessionEvent::PreviewRotationChanged(_) => None,
    }
}

/// Wait for a background task, logging it if it panicked or was cancelled.
/// Returns `true` when the task ran to completion.
pub async fn join_task(name: &str, task: JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            log::error!("{name} task failed: {e}");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
