//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\emotion-capture\
//!   macOS:   ~/Library/Application Support/emotion-capture/
//!   Linux:   ~/.config/emotion-capture/
//!
//! Data dir (captured photos, audio recordings, uploads):
//!   Windows: %LOCALAPPDATA%\emotion-capture\
//!   macOS:   ~/Library/Application Support/emotion-capture/
//!   Linux:   ~/.local/share/emotion-capture/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory where audio recordings are written.
    pub captures_dir: PathBuf,
    /// Directory where photos are written when the service expects a file
    /// path instead of inline bytes.
    pub uploads_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "emotion-capture";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            captures_dir: data_dir.join("captures"),
            uploads_dir: data_dir.join("uploads"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
