//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the prediction
//! service, capture session and replay device, `AppPaths` for cross-platform
//! data directories, and TOML persistence via `AppConfig::load` /
//! `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, CaptureConfig, DeviceConfig, ImageUpload, ServiceConfig};
