//! Cross-platform application paths using the `dirs` crate.
//!
//! Config dir:
//!   Linux:   ~/.config/urban-sounds/
//!   macOS:   ~/Library/Application Support/urban-sounds/
//!   Windows: %APPDATA%\urban-sounds\

use std::path::PathBuf;

/// Resolved location of the settings file.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "urban-sounds";

    /// Falls back to the current directory if the platform cannot provide a
    /// standard config path (a service account without `$HOME`, for example).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);
        let settings_file = config_dir.join("settings.toml");

        Self {
            config_dir,
            settings_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
