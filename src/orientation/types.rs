//! Orientation vocabulary shared by the resolver, the sensor feed and the
//! device collaborator.
//!
//! Three coordinate frames meet here:
//!
//! * [`DeviceOrientation`]: which way the physical device is turned in space,
//!   as reported by the simple orientation sensor.
//! * [`DisplayOrientation`]: which way the UI is drawn on the panel.
//! * [`NativeOrientation`]: the panel's natural orientation, which decides
//!   whether the camera sensor sits at a 90° offset.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sensor frame
// ---------------------------------------------------------------------------

/// A raw reading from the simple orientation sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorReading {
    NotRotated,
    Rotated90CounterClockwise,
    Rotated180CounterClockwise,
    Rotated270CounterClockwise,
    /// Device lies flat, screen up.
    FaceUp,
    /// Device lies flat, screen down.
    FaceDown,
}

/// Rotation of the device in space, restricted to the four upright values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceOrientation {
    #[default]
    NotRotated,
    Rotated90CounterClockwise,
    Rotated180CounterClockwise,
    Rotated270CounterClockwise,
}

impl DeviceOrientation {
    /// All four values, in counter-clockwise order.
    pub const ALL: [DeviceOrientation; 4] = [
        DeviceOrientation::NotRotated,
        DeviceOrientation::Rotated90CounterClockwise,
        DeviceOrientation::Rotated180CounterClockwise,
        DeviceOrientation::Rotated270CounterClockwise,
    ];

    /// Convert a sensor reading into a device orientation.
    ///
    /// Returns `None` for `FaceUp` / `FaceDown`: a device held parallel to the
    /// ground keeps whatever upright orientation it had before, so the user
    /// can photograph a document or the ceiling in the orientation they chose.
    pub fn from_reading(reading: SensorReading) -> Option<Self> {
        match reading {
            SensorReading::NotRotated => Some(Self::NotRotated),
            SensorReading::Rotated90CounterClockwise => Some(Self::Rotated90CounterClockwise),
            SensorReading::Rotated180CounterClockwise => Some(Self::Rotated180CounterClockwise),
            SensorReading::Rotated270CounterClockwise => Some(Self::Rotated270CounterClockwise),
            SensorReading::FaceUp | SensorReading::FaceDown => None,
        }
    }

    /// Counter-clockwise rotation in degrees.
    pub fn degrees(self) -> u16 {
        match self {
            Self::NotRotated => 0,
            Self::Rotated90CounterClockwise => 90,
            Self::Rotated180CounterClockwise => 180,
            Self::Rotated270CounterClockwise => 270,
        }
    }

    /// Inverse of [`degrees`](Self::degrees); any value is reduced modulo 360
    /// and must land on a quarter turn.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::NotRotated),
            90 => Some(Self::Rotated90CounterClockwise),
            180 => Some(Self::Rotated180CounterClockwise),
            270 => Some(Self::Rotated270CounterClockwise),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Display frame
// ---------------------------------------------------------------------------

/// Orientation of the UI on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayOrientation {
    #[default]
    Landscape,
    Portrait,
    LandscapeFlipped,
    PortraitFlipped,
}

impl DisplayOrientation {
    pub const ALL: [DisplayOrientation; 4] = [
        DisplayOrientation::Landscape,
        DisplayOrientation::Portrait,
        DisplayOrientation::LandscapeFlipped,
        DisplayOrientation::PortraitFlipped,
    ];

    /// Parse the lowercase names used by the command surface
    /// (`landscape`, `portrait`, `landscape-flipped`, `portrait-flipped`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "landscape" => Some(Self::Landscape),
            "portrait" => Some(Self::Portrait),
            "landscape-flipped" => Some(Self::LandscapeFlipped),
            "portrait-flipped" => Some(Self::PortraitFlipped),
            _ => None,
        }
    }
}

/// The panel's natural orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeOrientation {
    Portrait,
    #[default]
    Landscape,
}

// ---------------------------------------------------------------------------
// Camera mount
// ---------------------------------------------------------------------------

/// Panel on which a camera is mounted, when the device reports one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnclosurePanel {
    Front,
    Back,
    Unknown,
}

/// Facts about how the active camera is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraMountInfo {
    /// The camera does not rotate with the device.
    pub is_external: bool,
    /// The preview is mirrored (front-facing camera).
    pub is_mirrored: bool,
    pub native_orientation: NativeOrientation,
}

impl CameraMountInfo {
    /// Derive mount facts from the camera's enclosure location.
    ///
    /// No location, or an `Unknown` panel, means the camera is external and
    /// is never mirrored. Only a front-panel camera is mirrored.
    pub fn from_enclosure(panel: Option<EnclosurePanel>, native: NativeOrientation) -> Self {
        match panel {
            None | Some(EnclosurePanel::Unknown) => Self {
                is_external: true,
                is_mirrored: false,
                native_orientation: native,
            },
            Some(panel) => Self {
                is_external: false,
                is_mirrored: panel == EnclosurePanel::Front,
                native_orientation: native,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// OrientationContext
// ---------------------------------------------------------------------------

/// Snapshot of every input the resolver needs.
///
/// `Copy` on purpose: callers take one snapshot per capture and resolve
/// against it, never against a live reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientationContext {
    pub device_orientation: DeviceOrientation,
    pub display_orientation: DisplayOrientation,
    pub native_orientation: NativeOrientation,
    pub is_mirrored: bool,
    pub is_external_camera: bool,
}

impl OrientationContext {
    /// Overwrite the camera-mount fields with `mount`.
    pub fn with_mount(mut self, mount: CameraMountInfo) -> Self {
        self.is_external_camera = mount.is_external;
        self.is_mirrored = mount.is_mirrored;
        self.native_orientation = mount.native_orientation;
        self
    }
}

impl Default for OrientationContext {
    /// Until a camera reports its mount, treat it as external.
    fn default() -> Self {
        Self {
            device_orientation: DeviceOrientation::NotRotated,
            display_orientation: DisplayOrientation::Landscape,
            native_orientation: NativeOrientation::Landscape,
            is_mirrored: false,
            is_external_camera: true,
        }
    }
}

// ---------------------------------------------------------------------------
// PhotoOrientation
// ---------------------------------------------------------------------------

/// Orientation metadata written into a captured photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhotoOrientation {
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl PhotoOrientation {
    /// EXIF `Orientation` tag value.
    pub fn exif_value(self) -> u16 {
        match self {
            Self::Normal => 1,
            Self::Rotate180 => 3,
            Self::Rotate270 => 6,
            Self::Rotate90 => 8,
        }
    }
}
