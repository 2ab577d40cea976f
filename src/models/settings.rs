use std::path::PathBuf;

use super::achievements::DEFAULT_LANGUAGE;

pub const DEFAULT_APP_NAME: &str = "Achievement Unlocked";
const LOCAL_SAVES_DIR_NAME: &str = "GSE saves";
const LOG_DIR_NAME: &str = "achievement-watchdog";

/// Sound theme name on freedesktop, system default sound elsewhere.
#[cfg(any(target_os = "windows", target_os = "macos"))]
pub const DEFAULT_SOUND: &str = "Default";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DEFAULT_SOUND: &str = "message-new-instant";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of the per-game save folders that get watched.
    pub local_root: PathBuf,
    /// Roots searched recursively for marker files.
    pub library_roots: Vec<PathBuf>,
    pub language: String,
    pub log_dir: PathBuf,
    pub app_name: String,
    /// Sound played with each notification. `None` keeps them silent.
    pub sound: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            local_root: dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(LOCAL_SAVES_DIR_NAME),
            library_roots: vec![default_library_root()],
            language: DEFAULT_LANGUAGE.to_string(),
            log_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(LOG_DIR_NAME),
            app_name: DEFAULT_APP_NAME.to_string(),
            sound: Some(DEFAULT_SOUND.to_string()),
        }
    }
}

#[cfg(target_os = "windows")]
fn default_library_root() -> PathBuf {
    PathBuf::from(r"C:\games")
}

#[cfg(not(target_os = "windows"))]
fn default_library_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("games")
}
