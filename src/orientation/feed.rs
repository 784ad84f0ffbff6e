//! Latest-value holder for orientation sensor and display events.
//!
//! Sensor callbacks write into an [`OrientationFeed`]; the orchestrator only
//! ever reads a `Copy` snapshot, taken once per capture.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::types::{
    CameraMountInfo, DeviceOrientation, DisplayOrientation, OrientationContext, SensorReading,
};

/// Thread-safe handle to the most recent [`OrientationContext`].
///
/// Cheap to clone; all clones observe the same value.
#[derive(Debug, Clone, Default)]
pub struct OrientationFeed {
    inner: Arc<Mutex<OrientationContext>>,
}

impl OrientationFeed {
    pub fn new(initial: OrientationContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    /// Copy of the current context.
    pub fn snapshot(&self) -> OrientationContext {
        *self.lock()
    }

    /// Apply a raw sensor reading.
    ///
    /// `FaceUp` / `FaceDown` readings are ignored. Returns `true` when the
    /// stored device orientation changed.
    pub fn apply_sensor_reading(&self, reading: SensorReading) -> bool {
        match DeviceOrientation::from_reading(reading) {
            Some(device) => self.set_device_orientation(device),
            None => {
                log::trace!("orientation: ignoring flat reading {reading:?}");
                false
            }
        }
    }

    /// Returns `true` when the value changed.
    pub fn set_device_orientation(&self, device: DeviceOrientation) -> bool {
        let mut ctx = self.lock();
        let changed = ctx.device_orientation != device;
        ctx.device_orientation = device;
        changed
    }

    /// Returns `true` when the value changed.
    pub fn set_display_orientation(&self, display: DisplayOrientation) -> bool {
        let mut ctx = self.lock();
        let changed = ctx.display_orientation != display;
        ctx.display_orientation = display;
        changed
    }

    /// Record the mount facts of the camera that was just opened.
    pub fn set_mount(&self, mount: CameraMountInfo) {
        let mut ctx = self.lock();
        *ctx = ctx.with_mount(mount);
    }

    /// Replace the whole context, e.g. from a collaborator that emits full
    /// snapshots.
    pub fn replace(&self, ctx: OrientationContext) {
        *self.lock() = ctx;
    }

    fn lock(&self) -> MutexGuard<'_, OrientationContext> {
        // The guarded value is plain data; a panic mid-write cannot leave it
        // half-updated in a way that matters.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
