//! Device-orientation to rotation-metadata resolution.
//!
//! # Architecture
//!
//! ```text
//! sensor / display events ──▶ OrientationFeed (latest value)
//!                                   │ snapshot() per capture
//!                                   ▼
//!                          resolver::resolve_* (pure)
//!                                   │
//!                                   ▼
//!                  rotation° / PhotoOrientation / preview°
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use emotion_capture::orientation::{
//!     resolve_rotation_degrees, CameraMountInfo, DeviceOrientation, EnclosurePanel,
//!     NativeOrientation, OrientationFeed,
//! };
//!
//! let feed = OrientationFeed::default();
//! feed.set_mount(CameraMountInfo::from_enclosure(
//!     Some(EnclosurePanel::Back),
//!     NativeOrientation::Landscape,
//! ));
//! feed.set_device_orientation(DeviceOrientation::Rotated90CounterClockwise);
//!
//! assert_eq!(resolve_rotation_degrees(feed.snapshot()), 90);
//! ```

pub mod feed;
pub mod resolver;
pub mod types;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use feed::OrientationFeed;
pub use resolver::{
    display_degrees, resolve_camera_orientation, resolve_controls_rotation,
    resolve_photo_orientation, resolve_preview_rotation, resolve_rotation_degrees,
};
pub use types::{
    CameraMountInfo, DeviceOrientation, DisplayOrientation, EnclosurePanel, NativeOrientation,
    OrientationContext, PhotoOrientation, SensorReading,
};
