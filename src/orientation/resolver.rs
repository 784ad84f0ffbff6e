//! Pure rotation resolvers.
//!
//! Every function takes an [`OrientationContext`] snapshot by value and has no
//! side effects, so the same snapshot always resolves to the same answer.
//!
//! ```text
//! device ──portrait remap──▶ camera orientation ──mirror swap──▶ rotation°
//!                                                └──────────────▶ PhotoOrientation
//! display ──table──▶ preview° ──mirror invert──▶ preview rotation
//! ```

use super::types::{
    DeviceOrientation, DisplayOrientation, NativeOrientation, OrientationContext, PhotoOrientation,
};

/// Orientation of the camera in space for a capture taken under `ctx`.
///
/// External cameras do not rotate with the device and always report
/// `NotRotated`. On portrait-native panels the sensor is mounted a quarter
/// turn off, so the reading is shifted back by 90°. A mirrored preview flips
/// the direction of rotation, which only changes the 90° and 270° cases.
pub fn resolve_camera_orientation(ctx: OrientationContext) -> DeviceOrientation {
    if ctx.is_external_camera {
        return DeviceOrientation::NotRotated;
    }

    let mut result = ctx.device_orientation;

    if ctx.native_orientation == NativeOrientation::Portrait {
        result = match result {
            DeviceOrientation::Rotated90CounterClockwise => DeviceOrientation::NotRotated,
            DeviceOrientation::Rotated180CounterClockwise => {
                DeviceOrientation::Rotated90CounterClockwise
            }
            DeviceOrientation::Rotated270CounterClockwise => {
                DeviceOrientation::Rotated180CounterClockwise
            }
            DeviceOrientation::NotRotated => DeviceOrientation::Rotated270CounterClockwise,
        };
    }

    if ctx.is_mirrored {
        result = match result {
            DeviceOrientation::Rotated90CounterClockwise => {
                DeviceOrientation::Rotated270CounterClockwise
            }
            DeviceOrientation::Rotated270CounterClockwise => {
                DeviceOrientation::Rotated90CounterClockwise
            }
            other => other,
        };
    }

    result
}

/// Rotation metadata, in degrees, to attach to a frame captured under `ctx`.
///
/// Always one of 0, 90, 180 or 270.
pub fn resolve_rotation_degrees(ctx: OrientationContext) -> u16 {
    resolve_camera_orientation(ctx).degrees()
}

/// Photo orientation tag for a capture taken while the device was turned to
/// `device`, with the remaining inputs taken from `ctx`.
pub fn resolve_photo_orientation(
    device: DeviceOrientation,
    ctx: OrientationContext,
) -> PhotoOrientation {
    let ctx = OrientationContext {
        device_orientation: device,
        ..ctx
    };
    match resolve_camera_orientation(ctx) {
        DeviceOrientation::NotRotated => PhotoOrientation::Normal,
        DeviceOrientation::Rotated90CounterClockwise => PhotoOrientation::Rotate90,
        DeviceOrientation::Rotated180CounterClockwise => PhotoOrientation::Rotate180,
        DeviceOrientation::Rotated270CounterClockwise => PhotoOrientation::Rotate270,
    }
}

/// Degrees the UI is turned on the panel, independent of the device's
/// physical rotation.
pub fn display_degrees(display: DisplayOrientation) -> u16 {
    match display {
        DisplayOrientation::Portrait => 90,
        DisplayOrientation::LandscapeFlipped => 180,
        DisplayOrientation::PortraitFlipped => 270,
        DisplayOrientation::Landscape => 0,
    }
}

/// Rotation to apply to the live preview stream.
///
/// Derived from the display orientation, inverted when the preview is
/// mirrored. External cameras are never rotated.
pub fn resolve_preview_rotation(ctx: OrientationContext) -> u16 {
    if ctx.is_external_camera {
        return 0;
    }
    let degrees = display_degrees(ctx.display_orientation);
    if ctx.is_mirrored {
        (360 - degrees) % 360
    } else {
        degrees
    }
}

/// Angle that keeps on-screen capture controls upright given both the
/// device and display orientation.
pub fn resolve_controls_rotation(ctx: OrientationContext) -> u16 {
    let mut device = i32::from(ctx.device_orientation.degrees());
    let display = i32::from(display_degrees(ctx.display_orientation));

    if ctx.native_orientation == NativeOrientation::Portrait {
        device -= 90;
    }

    // device >= -90 and display >= 0, so the sum is always positive.
    ((360 + display + device) % 360) as u16
}
